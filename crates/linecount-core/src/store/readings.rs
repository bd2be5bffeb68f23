use chrono::{DateTime, Utc};
use rusqlite::ToSql;
use rusqlite::params;

use super::Store;
use crate::error::CoreError;
use crate::model::{DeviceId, ReadingId, ReadingSample, SessionId};

const SESSION_TOTAL_SQL: &str =
    "SELECT COALESCE((SELECT total FROM session_totals WHERE session_id = ?1), 0)";

/// Column values for a new `readings` row.
pub(crate) struct ReadingRow<'a> {
    pub session_id: SessionId,
    pub device_id: DeviceId,
    pub device_code: &'a str,
    pub timestamp: DateTime<Utc>,
    pub increment: i64,
    pub temperature_c: Option<f64>,
}

impl Store {
    /// Append one ledger row; the totals trigger runs in the same statement.
    pub(crate) fn insert_reading(&self, row: &ReadingRow<'_>) -> Result<ReadingId, CoreError> {
        let caps = self.capabilities();

        let mut columns = vec!["session_id", "device_id", "timestamp", "increment"];
        let mut values: Vec<&dyn ToSql> =
            vec![&row.session_id, &row.device_id, &row.timestamp, &row.increment];
        if caps.reading_temperature {
            columns.push("temperature_c");
            values.push(&row.temperature_c);
        }
        if caps.reading_device_code {
            columns.push("device_code");
            values.push(&row.device_code);
        }

        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO readings ({}) VALUES ({placeholders})",
            columns.join(", ")
        );

        // The total check and the insert share one lock hold, so concurrent
        // appends cannot both pass the check and overflow together.
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(SESSION_TOTAL_SQL, [row.session_id], |r| r.get(0))?;
            if total.checked_add(row.increment).is_none() {
                return Ok(None);
            }
            conn.prepare_cached(&sql)?.execute(values.as_slice())?;
            Ok(Some(ReadingId(conn.last_insert_rowid())))
        })?
        .ok_or_else(|| {
            CoreError::invalid_argument(format!(
                "increment {} would overflow the total of session {}",
                row.increment, row.session_id
            ))
        })
    }

    /// Sum of increments for a session; 0 when it has none.
    pub(crate) fn session_total(&self, id: SessionId) -> Result<i64, CoreError> {
        self.with_conn(|conn| {
            conn.query_row(SESSION_TOTAL_SQL, [id], |row| row.get(0))
        })
    }

    /// The newest `limit` readings of a session, newest first.
    pub(crate) fn recent_readings(
        &self,
        id: SessionId,
        limit: usize,
    ) -> Result<Vec<ReadingSample>, CoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT timestamp, increment FROM readings
                 WHERE session_id = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![id, limit], |row| {
                Ok(ReadingSample {
                    timestamp: row.get(0)?,
                    increment: row.get(1)?,
                })
            })?;
            rows.collect()
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::sessions::SessionRow;

    fn setup() -> (Store, SessionId, DeviceId) {
        let store = Store::in_memory().unwrap();
        let device = store.insert_device("DEV1", None).unwrap();
        let session = store
            .insert_session(&SessionRow {
                client_id: 1,
                product_id: 1,
                lot: "L",
                operator_id: 1,
                started_at: Utc::now(),
            })
            .unwrap();
        (store, session, device)
    }

    fn row(session_id: SessionId, device_id: DeviceId, increment: i64) -> ReadingRow<'static> {
        ReadingRow {
            session_id,
            device_id,
            device_code: "DEV1",
            timestamp: Utc::now(),
            increment,
            temperature_c: None,
        }
    }

    #[test]
    fn totals_follow_inserts() {
        let (store, session, device) = setup();
        assert_eq!(store.session_total(session).unwrap(), 0);

        store.insert_reading(&row(session, device, 5)).unwrap();
        store.insert_reading(&row(session, device, 7)).unwrap();
        assert_eq!(store.session_total(session).unwrap(), 12);
    }

    #[test]
    fn non_positive_increment_violates_check_constraint() {
        let (store, session, device) = setup();
        assert!(store.insert_reading(&row(session, device, 0)).is_err());
        assert_eq!(store.session_total(session).unwrap(), 0);
    }

    #[test]
    fn reading_ids_follow_arrival_order() {
        let (store, session, device) = setup();
        let a = store.insert_reading(&row(session, device, 1)).unwrap();
        let b = store.insert_reading(&row(session, device, 1)).unwrap();
        assert!(b > a);
    }

    #[test]
    fn recent_readings_are_newest_first_and_limited() {
        let (store, session, device) = setup();
        for inc in 1..=5 {
            store.insert_reading(&row(session, device, inc)).unwrap();
        }
        let recent = store.recent_readings(session, 3).unwrap();
        assert_eq!(
            recent.iter().map(|r| r.increment).collect::<Vec<_>>(),
            vec![5, 4, 3]
        );
    }

    #[test]
    fn device_code_column_is_written_when_present() {
        let (store, session, device) = setup();
        store.insert_reading(&row(session, device, 2)).unwrap();
        let code: Option<String> = store
            .with_conn(|conn| {
                conn.query_row("SELECT device_code FROM readings LIMIT 1", [], |r| r.get(0))
            })
            .unwrap();
        assert_eq!(code.as_deref(), Some("DEV1"));
    }
}
