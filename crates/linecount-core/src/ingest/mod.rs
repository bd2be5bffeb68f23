//! Device event ingestion.
//!
//! [`EventIngestor`] takes messages off the transport's inbound queue,
//! routes them by topic, and writes `count_delta` events to the ledger.
//! Every message ends in exactly one [`IngestOutcome`]; failures become
//! counted drops and nothing is sent back to the transport. Messages are
//! processed one at a time in arrival order.

mod payload;
mod stats;

use std::sync::Arc;

use chrono::Utc;
use linecount_transport::{InboundMessage, Namespace, TopicKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use payload::DeviceStatus;
pub use stats::{DropCounts, DropReason, IngestSnapshot, IngestStats};

use self::payload::{CountDelta, DeviceEvent, Payload};
use crate::directory::DeviceDirectory;
use crate::error::CoreError;
use crate::ledger::TelemetryLedger;
use crate::model::{NewReading, Reading, SessionId};

/// Non-persisting messages that were understood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Heartbeat,
    Summary,
    Status(DeviceStatus),
    /// Status message with an unrecognized body.
    UnknownStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Accepted(Reading),
    Observed(Observation),
    Dropped(DropReason),
}

#[derive(Clone)]
pub struct EventIngestor {
    namespace: Namespace,
    directory: Arc<DeviceDirectory>,
    ledger: Arc<TelemetryLedger>,
    stats: Arc<IngestStats>,
}

impl EventIngestor {
    pub fn new(
        namespace: Namespace,
        directory: Arc<DeviceDirectory>,
        ledger: Arc<TelemetryLedger>,
        stats: Arc<IngestStats>,
    ) -> Self {
        Self {
            namespace,
            directory,
            ledger,
            stats,
        }
    }

    pub fn stats(&self) -> &Arc<IngestStats> {
        &self.stats
    }

    /// Process one message and record its outcome.
    pub fn handle(&self, message: &InboundMessage) -> IngestOutcome {
        self.stats.record_received();
        let outcome = self.process(message);
        match &outcome {
            IngestOutcome::Accepted(_) => self.stats.record_accepted(),
            IngestOutcome::Observed(_) => self.stats.record_observed(),
            IngestOutcome::Dropped(reason) => self.stats.record_drop(*reason),
        }
        outcome
    }

    /// Drain `inbound` until it closes or `cancel` fires.
    ///
    /// Each message is handled on the blocking pool, one at a time, so store
    /// contention never parks a runtime worker.
    pub async fn run(self, mut inbound: mpsc::Receiver<InboundMessage>, cancel: CancellationToken) {
        tracing::info!(namespace = %self.namespace.prefix(), "ingestion started");
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                message = inbound.recv() => match message {
                    Some(message) => {
                        let ingestor = self.clone();
                        let handled = tokio::task::spawn_blocking(move || {
                            ingestor.handle(&message);
                        })
                        .await;
                        if let Err(e) = handled {
                            tracing::error!(error = %e, "ingest worker failed");
                        }
                    }
                    None => {
                        tracing::debug!("inbound channel closed");
                        break;
                    }
                },
            }
        }
        tracing::info!(stats = ?self.stats.snapshot(), "ingestion stopped");
    }

    fn process(&self, message: &InboundMessage) -> IngestOutcome {
        let topic = match self.namespace.parse(&message.topic) {
            Ok(topic) if topic.kind != TopicKind::Command => topic,
            Ok(_) => {
                tracing::warn!(topic = %message.topic, "ignoring message on command topic");
                return IngestOutcome::Dropped(DropReason::MalformedTopic);
            }
            Err(e) => {
                tracing::warn!(topic = %message.topic, error = %e, "dropping message on unexpected topic");
                return IngestOutcome::Dropped(DropReason::MalformedTopic);
            }
        };

        let payload = Payload::decode(&message.payload);
        let device = topic.device_code.as_str();

        match self.directory.resolve(device) {
            Ok(_) => {}
            Err(CoreError::UnknownDevice { .. }) => {
                tracing::warn!(device, kind = %topic.kind, "dropping message from unknown device");
                return IngestOutcome::Dropped(DropReason::UnknownDevice);
            }
            Err(e) => {
                tracing::error!(device, error = %e, "device lookup failed");
                return IngestOutcome::Dropped(DropReason::UnknownDevice);
            }
        }

        if topic.kind == TopicKind::Status {
            return Self::on_status(device, &payload);
        }

        match payload::parse_event(&payload) {
            Ok(DeviceEvent::CountDelta(delta)) => self.on_count_delta(device, delta),
            Ok(DeviceEvent::Heartbeat) => {
                tracing::trace!(device, "heartbeat");
                IngestOutcome::Observed(Observation::Heartbeat)
            }
            Ok(DeviceEvent::Summary) => {
                tracing::trace!(device, "summary");
                IngestOutcome::Observed(Observation::Summary)
            }
            Err(reason) => {
                tracing::debug!(device, %reason, "dropping event");
                IngestOutcome::Dropped(reason)
            }
        }
    }

    fn on_count_delta(&self, device: &str, event: CountDelta) -> IngestOutcome {
        let (Some(session_id), Some(delta)) = (
            event.session_id.filter(|id| *id != 0),
            event.delta.filter(|d| *d != 0),
        ) else {
            tracing::debug!(device, ?event, "count_delta without session or delta");
            return IngestOutcome::Dropped(DropReason::IncompleteEvent);
        };

        let reading = NewReading::new(SessionId(session_id), device, delta)
            .at(event.timestamp.unwrap_or_else(Utc::now))
            .with_temperature(event.temperature_c);

        match self.ledger.append(&reading) {
            Ok(reading) => IngestOutcome::Accepted(reading),
            Err(e) if e.is_client_error() => {
                tracing::debug!(device, session_id, delta, error = %e, "count_delta rejected");
                IngestOutcome::Dropped(DropReason::Rejected)
            }
            Err(e) => {
                tracing::error!(device, session_id, delta, error = %e, "count_delta not stored");
                IngestOutcome::Dropped(DropReason::Rejected)
            }
        }
    }

    fn on_status(device: &str, payload: &Payload) -> IngestOutcome {
        match payload::parse_status(payload) {
            Some(DeviceStatus::Online) => {
                tracing::info!(device, "device online");
                IngestOutcome::Observed(Observation::Status(DeviceStatus::Online))
            }
            Some(DeviceStatus::Offline) => {
                tracing::warn!(device, "device offline");
                IngestOutcome::Observed(Observation::Status(DeviceStatus::Offline))
            }
            None => {
                tracing::trace!(device, ?payload, "unrecognized status ignored");
                IngestOutcome::Observed(Observation::UnknownStatus)
            }
        }
    }
}
