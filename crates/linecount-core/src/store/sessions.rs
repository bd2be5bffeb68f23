use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};

use super::Store;
use crate::error::CoreError;
use crate::model::{PageRequest, Session, SessionId, SessionStatus, SessionSummary};

/// Column values for a new `sessions` row.
pub(crate) struct SessionRow<'a> {
    pub client_id: i64,
    pub product_id: i64,
    pub lot: &'a str,
    pub operator_id: i64,
    pub started_at: DateTime<Utc>,
}

impl Store {
    pub(crate) fn insert_session(&self, row: &SessionRow<'_>) -> Result<SessionId, CoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (client_id, product_id, lot, operator_id, started_at, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    row.client_id,
                    row.product_id,
                    row.lot,
                    row.operator_id,
                    row.started_at,
                    SessionStatus::Active,
                ],
            )?;
            Ok(SessionId(conn.last_insert_rowid()))
        })
    }

    /// Mark a session finalized. Unconditional: returns the number of rows
    /// touched, which is 0 for an unknown id and 1 otherwise (including
    /// re-finalizing, which moves `ended_at`).
    pub(crate) fn finalize_session(
        &self,
        id: SessionId,
        ended_at: DateTime<Utc>,
    ) -> Result<usize, CoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE sessions SET ended_at = ?1, status = ?2 WHERE id = ?3",
                params![ended_at, SessionStatus::Finalized, id],
            )
        })
    }

    pub(crate) fn session(&self, id: SessionId) -> Result<Option<Session>, CoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, client_id, product_id, lot, operator_id, started_at, ended_at, status
                 FROM sessions WHERE id = ?1",
                [id],
                map_session,
            )
            .optional()
        })
    }

    pub(crate) fn session_exists(&self, id: SessionId) -> Result<bool, CoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sessions WHERE id = ?1)",
                [id],
                |row| row.get(0),
            )
        })
    }

    /// Most recent sessions first, each with its running total.
    pub(crate) fn session_summaries(
        &self,
        page: &PageRequest,
    ) -> Result<Vec<SessionSummary>, CoreError> {
        let limit = i64::from(page.size());
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT s.id, s.status, s.started_at, s.ended_at,
                        c.name, p.name, COALESCE(t.total, 0)
                 FROM sessions s
                 LEFT JOIN clients c ON c.id = s.client_id
                 LEFT JOIN products p ON p.id = s.product_id
                 LEFT JOIN session_totals t ON t.session_id = s.id
                 ORDER BY s.id DESC
                 LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt.query_map(params![limit, offset], |row| {
                Ok(SessionSummary {
                    id: row.get(0)?,
                    status: row.get(1)?,
                    started_at: row.get(2)?,
                    ended_at: row.get(3)?,
                    client: row.get(4)?,
                    product: row.get(5)?,
                    total: row.get(6)?,
                })
            })?;
            rows.collect()
        })
    }
}

fn map_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        client_id: row.get(1)?,
        product_id: row.get(2)?,
        lot: row.get(3)?,
        operator_id: row.get(4)?,
        started_at: row.get(5)?,
        ended_at: row.get(6)?,
        status: row.get(7)?,
    })
}
