// linecount-core: session lifecycle, telemetry ledger and device ingestion.

pub mod coerce;
pub mod command;
pub mod directory;
pub mod error;
pub mod ingest;
pub mod ledger;
pub mod model;
pub mod query;
pub mod registry;
pub mod service;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{CommandAction, CommandPublisher, DeviceCommand};
pub use directory::DeviceDirectory;
pub use error::CoreError;
pub use ingest::{DropReason, EventIngestor, IngestOutcome, IngestSnapshot, IngestStats};
pub use ledger::TelemetryLedger;
pub use query::{QueryFacade, RECENT_READINGS};
pub use registry::{SessionRegistry, Transition};
pub use service::LineService;
pub use store::{Capabilities, Store};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    CatalogSeed, Client, Device, DeviceId, DeviceSeed, NewReading, NewSession, Page,
    PageRequest, Product, Reading, ReadingId, ReadingSample, SeedReport, Session, SessionDetail,
    SessionId, SessionStatus, SessionSummary,
};
