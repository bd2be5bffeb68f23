// Decoding of device event and status payloads.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::stats::DropReason;
use crate::coerce;

/// Inbound body: JSON when it parses, otherwise the raw text.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    pub(crate) fn decode(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).map_or_else(
            |_| Self::Text(String::from_utf8_lossy(bytes).into_owned()),
            Self::Json,
        )
    }

    /// The body as plain text, for status messages sent either as a JSON
    /// string or as raw bytes.
    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Json(Value::String(s)) | Self::Text(s) => Some(s),
            Self::Json(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CountDelta {
    pub session_id: Option<i64>,
    pub delta: Option<i64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub temperature_c: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DeviceEvent {
    CountDelta(CountDelta),
    Heartbeat,
    Summary,
}

pub(crate) fn parse_event(payload: &Payload) -> Result<DeviceEvent, DropReason> {
    let Payload::Json(Value::Object(fields)) = payload else {
        return Err(DropReason::InvalidPayload);
    };

    match fields.get("type").and_then(Value::as_str) {
        Some("count_delta") => Ok(DeviceEvent::CountDelta(parse_count_delta(fields))),
        Some("heartbeat") => Ok(DeviceEvent::Heartbeat),
        Some("summary") => Ok(DeviceEvent::Summary),
        _ => Err(DropReason::UnsupportedType),
    }
}

fn parse_count_delta(fields: &Map<String, Value>) -> CountDelta {
    let session_id = fields
        .get("sessionId")
        .or_else(|| fields.get("sessao_id"))
        .and_then(coerce::int);

    CountDelta {
        session_id,
        delta: fields.get("delta").and_then(coerce::int),
        timestamp: fields
            .get("ts")
            .and_then(Value::as_str)
            .and_then(coerce::timestamp),
        temperature_c: fields.get("temperature_c").and_then(coerce::float),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Online,
    Offline,
}

pub(crate) fn parse_status(payload: &Payload) -> Option<DeviceStatus> {
    let text = payload.as_text()?.trim();
    if text.eq_ignore_ascii_case("online") {
        Some(DeviceStatus::Online)
    } else if text.eq_ignore_ascii_case("offline") {
        Some(DeviceStatus::Offline)
    } else {
        None
    }
}
