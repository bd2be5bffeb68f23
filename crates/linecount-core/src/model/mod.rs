// ── Domain model ──

mod catalog;
mod ids;
mod page;
mod reading;
mod session;

pub use catalog::{CatalogSeed, Client, Device, DeviceSeed, Product, SeedReport};
pub use ids::{DeviceId, ReadingId, SessionId};
pub use page::{Page, PageRequest};
pub use reading::{NewReading, Reading, ReadingSample};
pub use session::{
    DEFAULT_LOT, MAX_LOT_CHARS, NewSession, Session, SessionDetail, SessionStatus,
    SessionSummary, normalize_lot,
};
