//! MQTT connection with auto-reconnect.
//!
//! Drives a `rumqttc` event loop on a background task, re-subscribing to
//! the line's device filters on every `ConnAck`, and exposes the traffic
//! as two bounded channels: inbound publishes for the ingestion loop and
//! outbound publishes from the command side. Connection failures back off
//! exponentially with jitter and retry until cancelled.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::message::{InboundMessage, OutboundMessage};
use crate::topic::Namespace;

// ── Channel capacities ───────────────────────────────────────────────

const CLIENT_REQUEST_CAPACITY: usize = 64;
const INBOUND_CHANNEL_CAPACITY: usize = 1024;
const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

// ── MqttConfig ───────────────────────────────────────────────────────

/// Broker connection settings.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub keep_alive: Duration,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 1883,
            client_id: "linecount".into(),
            username: None,
            password: None,
            keep_alive: Duration::from_secs(30),
        }
    }
}

impl MqttConfig {
    fn to_options(&self) -> Result<MqttOptions, Error> {
        if self.host.trim().is_empty() {
            return Err(Error::InvalidConfig("broker host is empty".into()));
        }
        if self.client_id.trim().is_empty() {
            return Err(Error::InvalidConfig("client id is empty".into()));
        }

        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        if let Some(ref username) = self.username {
            let password = self
                .password
                .as_ref()
                .map(|p| p.expose_secret().to_owned())
                .unwrap_or_default();
            options.set_credentials(username, password);
        }
        Ok(options)
    }
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for broker reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── MqttTransport ────────────────────────────────────────────────────

/// Handle to a running MQTT connection.
///
/// Must be started from inside a tokio runtime. Take the inbound receiver
/// once with [`take_inbound`](Self::take_inbound); clone the outbound
/// sender as often as needed.
pub struct MqttTransport {
    inbound_rx: Option<mpsc::Receiver<InboundMessage>>,
    outbound_tx: mpsc::Sender<OutboundMessage>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl MqttTransport {
    /// Spawn the event loop and outbound publisher tasks.
    ///
    /// Returns as soon as the tasks are spawned; the first connection
    /// attempt happens in the background.
    pub fn start(
        config: &MqttConfig,
        namespace: &Namespace,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Result<Self, Error> {
        let options = config.to_options()?;
        let (client, eventloop) = AsyncClient::new(options, CLIENT_REQUEST_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);

        let filters = vec![namespace.event_filter(), namespace.status_filter()];
        tracing::info!(
            host = %config.host,
            port = config.port,
            client_id = %config.client_id,
            ?filters,
            "starting MQTT transport"
        );

        let tasks = vec![
            tokio::spawn(event_loop_task(
                eventloop,
                client.clone(),
                filters,
                inbound_tx,
                reconnect,
                cancel.clone(),
            )),
            tokio::spawn(outbound_task(client, outbound_rx, cancel.clone())),
        ];

        Ok(Self {
            inbound_rx: Some(inbound_rx),
            outbound_tx,
            cancel,
            tasks,
        })
    }

    /// Take the receiver of inbound device publishes. Returns `None` after
    /// the first call.
    pub fn take_inbound(&mut self) -> Option<mpsc::Receiver<InboundMessage>> {
        self.inbound_rx.take()
    }

    /// Sender for publishes towards devices.
    pub fn outbound(&self) -> mpsc::Sender<OutboundMessage> {
        self.outbound_tx.clone()
    }

    /// Cancel the background tasks and wait for them to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "transport task failed");
            }
        }
        tracing::debug!("MQTT transport stopped");
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Poll the broker connection, forwarding publishes and re-subscribing
/// after every (re)connect.
async fn event_loop_task(
    mut eventloop: EventLoop,
    client: AsyncClient,
    filters: Vec<String>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let polled = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            polled = eventloop.poll() => polled,
        };

        match polled {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                tracing::info!(code = ?ack.code, "MQTT connected");
                attempt = 0;
                // Clean sessions drop subscriptions, so every ConnAck re-issues them.
                for filter in &filters {
                    if let Err(e) = client.try_subscribe(filter.as_str(), QoS::AtLeastOnce) {
                        tracing::warn!(error = %e, filter = %filter, "subscribe request failed");
                    }
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                tracing::debug!(pkid = ack.pkid, "subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let message = InboundMessage {
                    topic: publish.topic,
                    payload: publish.payload,
                };
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    sent = inbound_tx.send(message) => {
                        if sent.is_err() {
                            tracing::debug!("inbound receiver dropped, stopping event loop");
                            break;
                        }
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, attempt, "MQTT connection error");

                if let Some(max) = reconnect.max_retries {
                    if attempt >= max {
                        tracing::error!(
                            max_retries = max,
                            "MQTT reconnection limit reached, giving up"
                        );
                        break;
                    }
                }

                let delay = calculate_backoff(attempt, &reconnect);
                tracing::info!(
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    attempt,
                    "waiting before reconnect"
                );

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }

                attempt = attempt.saturating_add(1);
            }
        }
    }

    if let Err(e) = client.try_disconnect() {
        tracing::debug!(error = %e, "disconnect request not queued");
    }
    tracing::debug!("MQTT event loop exiting");
}

/// Drain the outbound channel into the broker client.
async fn outbound_task(
    client: AsyncClient,
    mut outbound_rx: mpsc::Receiver<OutboundMessage>,
    cancel: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            message = outbound_rx.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let size = message.payload.len();
        match client
            .publish(
                message.topic.as_str(),
                QoS::AtMostOnce,
                false,
                message.payload.to_vec(),
            )
            .await
        {
            Ok(()) => tracing::debug!(topic = %message.topic, size, "published"),
            Err(e) => tracing::warn!(error = %e, topic = %message.topic, "publish failed"),
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from many workers.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(16)).unwrap_or(16);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic jitter seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
