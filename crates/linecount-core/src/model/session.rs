// ── Production session domain types ──
//
// Field names on the wire follow the control API (`cliente_id`, `inicio`,
// ...); the Rust names describe what the field is.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::ids::SessionId;
use super::reading::ReadingSample;

/// Placeholder lot label used when the operator leaves it blank.
pub const DEFAULT_LOT: &str = "default";

/// Longest lot label kept, in characters.
pub const MAX_LOT_CHARS: usize = 255;

/// Lifecycle state of a session. Goes `Active` → `Finalized` once.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum SessionStatus {
    #[serde(rename = "ativa")]
    #[strum(serialize = "ativa")]
    Active,
    #[serde(rename = "finalizada")]
    #[strum(serialize = "finalizada")]
    Finalized,
}

impl ToSql for SessionStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_ref()))
    }
}

impl FromSql for SessionStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        raw.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A stored production session.
///
/// `ended_at` is `Some` exactly when `status` is `Finalized`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    #[serde(rename = "cliente_id")]
    pub client_id: i64,
    #[serde(rename = "produto_id")]
    pub product_id: i64,
    #[serde(rename = "lote")]
    pub lot: String,
    #[serde(rename = "operador_id")]
    pub operator_id: i64,
    #[serde(rename = "inicio")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "fim")]
    pub ended_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

/// A session plus its running total and most recent readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    pub total: i64,
    /// Oldest of the window first.
    #[serde(rename = "ultimas_leituras")]
    pub recent_readings: Vec<ReadingSample>,
}

/// One row of the paginated session listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub status: SessionStatus,
    #[serde(rename = "inicio")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "fim")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(rename = "cliente")]
    pub client: Option<String>,
    #[serde(rename = "produto")]
    pub product: Option<String>,
    pub total: i64,
}

/// Operator request to start a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub client_id: i64,
    pub product_id: i64,
    pub operator_id: i64,
    pub lot: Option<String>,
    pub device_code: String,
}

/// Trim the lot label, fall back to [`DEFAULT_LOT`] when blank, and cap it
/// at [`MAX_LOT_CHARS`] characters.
pub fn normalize_lot(raw: Option<&str>) -> String {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return DEFAULT_LOT.to_owned();
    }
    match trimmed.char_indices().nth(MAX_LOT_CHARS) {
        Some((cut, _)) => trimmed[..cut].to_owned(),
        None => trimmed.to_owned(),
    }
}
