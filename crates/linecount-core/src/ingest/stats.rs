use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

/// Why an inbound message was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DropReason {
    /// Topic outside the subscribed namespace or of the wrong shape.
    MalformedTopic,
    /// Device code not in the directory.
    UnknownDevice,
    /// `count_delta` without a session id or with a zero delta.
    IncompleteEvent,
    /// Event payload is not a JSON object.
    InvalidPayload,
    /// Event `type` is missing or not understood.
    UnsupportedType,
    /// The ledger refused the reading.
    Rejected,
}

/// Running ingestion counters, shared between the ingest task and readers.
#[derive(Debug, Default)]
pub struct IngestStats {
    received: AtomicU64,
    accepted: AtomicU64,
    observed: AtomicU64,
    malformed_topic: AtomicU64,
    unknown_device: AtomicU64,
    incomplete_event: AtomicU64,
    invalid_payload: AtomicU64,
    unsupported_type: AtomicU64,
    rejected: AtomicU64,
}

impl IngestStats {
    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_observed(&self) {
        self.observed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drop(&self, reason: DropReason) {
        let counter = match reason {
            DropReason::MalformedTopic => &self.malformed_topic,
            DropReason::UnknownDevice => &self.unknown_device,
            DropReason::IncompleteEvent => &self.incomplete_event,
            DropReason::InvalidPayload => &self.invalid_payload,
            DropReason::UnsupportedType => &self.unsupported_type,
            DropReason::Rejected => &self.rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> IngestSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        IngestSnapshot {
            received: load(&self.received),
            accepted: load(&self.accepted),
            observed: load(&self.observed),
            dropped: DropCounts {
                malformed_topic: load(&self.malformed_topic),
                unknown_device: load(&self.unknown_device),
                incomplete_event: load(&self.incomplete_event),
                invalid_payload: load(&self.invalid_payload),
                unsupported_type: load(&self.unsupported_type),
                rejected: load(&self.rejected),
            },
        }
    }
}

/// Point-in-time copy of [`IngestStats`], as reported by `/health`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSnapshot {
    pub received: u64,
    /// Readings written to the ledger.
    pub accepted: u64,
    /// Heartbeats, summaries and status messages.
    pub observed: u64,
    pub dropped: DropCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropCounts {
    pub malformed_topic: u64,
    pub unknown_device: u64,
    pub incomplete_event: u64,
    pub invalid_payload: u64,
    pub unsupported_type: u64,
    pub rejected: u64,
}

impl DropCounts {
    pub fn total(&self) -> u64 {
        self.malformed_topic
            + self.unknown_device
            + self.incomplete_event
            + self.invalid_payload
            + self.unsupported_type
            + self.rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_are_counted_per_reason() {
        let stats = IngestStats::default();
        stats.record_received();
        stats.record_received();
        stats.record_drop(DropReason::UnknownDevice);
        stats.record_drop(DropReason::UnknownDevice);
        stats.record_drop(DropReason::Rejected);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.received, 2);
        assert_eq!(snapshot.dropped.unknown_device, 2);
        assert_eq!(snapshot.dropped.rejected, 1);
        assert_eq!(snapshot.dropped.total(), 3);
    }

    #[test]
    fn reasons_display_in_snake_case() {
        assert_eq!(DropReason::MalformedTopic.to_string(), "malformed_topic");
        let name: &'static str = DropReason::IncompleteEvent.into();
        assert_eq!(name, "incomplete_event");
    }
}
