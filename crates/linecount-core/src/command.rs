// ── Device commands ──
//
// One-way start/stop instructions published on a device's `cmd` topic.
// "Sent" means handed to the transport queue; nothing waits for the
// device. A full or closed queue is reported as `TransportUnavailable`
// and the caller decides whether that matters.

use linecount_transport::{Namespace, OutboundMessage};
use serde::Serialize;
use strum::{AsRefStr, Display};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::CoreError;
use crate::model::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CommandAction {
    Start,
    Stop,
}

/// What gets published to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    /// `{"action": "<action>"}`
    Bare(CommandAction),
    /// `{"action": "<action>", "sessao_id": <id>}`
    ForSession {
        action: CommandAction,
        session_id: SessionId,
    },
}

impl DeviceCommand {
    pub fn start(session_id: SessionId) -> Self {
        Self::ForSession {
            action: CommandAction::Start,
            session_id,
        }
    }

    pub fn stop(session_id: SessionId) -> Self {
        Self::ForSession {
            action: CommandAction::Stop,
            session_id,
        }
    }

    pub fn action(&self) -> CommandAction {
        match self {
            Self::Bare(action) | Self::ForSession { action, .. } => *action,
        }
    }

    /// JSON body published on the wire.
    pub fn to_payload(&self) -> Result<Vec<u8>, CoreError> {
        #[derive(Serialize)]
        struct Payload {
            action: CommandAction,
            // Device firmware reads the Portuguese key.
            #[serde(rename = "sessao_id", skip_serializing_if = "Option::is_none")]
            session_id: Option<SessionId>,
        }

        let payload = match *self {
            Self::Bare(action) => Payload {
                action,
                session_id: None,
            },
            Self::ForSession { action, session_id } => Payload {
                action,
                session_id: Some(session_id),
            },
        };
        serde_json::to_vec(&payload)
            .map_err(|e| CoreError::Internal(format!("command serialization: {e}")))
    }
}

/// Hands device commands to the transport's outbound queue.
#[derive(Clone)]
pub struct CommandPublisher {
    namespace: Namespace,
    outbound: mpsc::Sender<OutboundMessage>,
}

impl CommandPublisher {
    pub fn new(namespace: Namespace, outbound: mpsc::Sender<OutboundMessage>) -> Self {
        Self {
            namespace,
            outbound,
        }
    }

    pub fn send(&self, device_code: &str, command: &DeviceCommand) -> Result<(), CoreError> {
        let topic = self.namespace.command_topic(device_code);
        let payload = command.to_payload()?;

        self.outbound
            .try_send(OutboundMessage::new(topic.clone(), payload))
            .map_err(|e| {
                let err = match e {
                    TrySendError::Full(_) => linecount_transport::Error::QueueFull,
                    TrySendError::Closed(_) => linecount_transport::Error::ChannelClosed,
                };
                CoreError::from(err)
            })?;

        tracing::info!(
            device = device_code,
            topic = %topic,
            action = %command.action(),
            "command handed to transport"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn structured_command_embeds_session_id() {
        let payload = DeviceCommand::start(SessionId(12)).to_payload().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value, serde_json::json!({"action": "start", "sessao_id": 12}));
    }

    #[test]
    fn bare_command_is_action_only() {
        let payload = DeviceCommand::Bare(CommandAction::Stop).to_payload().unwrap();
        assert_eq!(payload, br#"{"action":"stop"}"#);
    }

    #[test]
    fn send_publishes_on_device_command_topic() {
        let (tx, mut rx) = mpsc::channel(4);
        let publisher = CommandPublisher::new(Namespace::default(), tx);

        publisher
            .send("DEV1", &DeviceCommand::stop(SessionId(3)))
            .unwrap();

        let message = rx.try_recv().unwrap();
        assert_eq!(message.topic, "factory/default/line/1/device/DEV1/cmd");
        let value: serde_json::Value = serde_json::from_slice(&message.payload).unwrap();
        assert_eq!(value["action"], "stop");
        assert_eq!(value["sessao_id"], 3);
    }

    #[test]
    fn closed_transport_is_reported() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let publisher = CommandPublisher::new(Namespace::default(), tx);

        let err = publisher
            .send("DEV1", &DeviceCommand::Bare(CommandAction::Start))
            .unwrap_err();
        assert!(matches!(err, CoreError::TransportUnavailable { .. }));
    }

    #[test]
    fn full_queue_is_reported() {
        let (tx, _rx) = mpsc::channel(1);
        let publisher = CommandPublisher::new(Namespace::default(), tx);
        let command = DeviceCommand::Bare(CommandAction::Start);

        tokio_test::assert_ok!(publisher.send("DEV1", &command));
        let err = tokio_test::assert_err!(publisher.send("DEV1", &command));
        assert!(matches!(err, CoreError::TransportUnavailable { .. }));
    }
}
