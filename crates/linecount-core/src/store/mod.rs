//! `SQLite`-backed storage shared by the directory, registry and ledger.
//!
//! A single connection sits behind a mutex; every public method runs one
//! statement (or one read) under the lock, so each write is atomic and
//! appends to the same session are totally ordered by their row id.
//! File databases run in WAL mode.
//!
//! Older databases may lack the optional `readings.device_code` or
//! `readings.temperature_c` columns. Which ones exist is detected once at
//! open and kept as [`Capabilities`]; inserts then simply leave the
//! missing columns out.

mod catalog;
pub(crate) mod readings;
pub(crate) mod sessions;

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OpenFlags};

use crate::error::CoreError;

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Columns `readings` must have for the ledger to work at all.
const REQUIRED_READING_COLUMNS: [&str; 4] = ["session_id", "device_id", "timestamp", "increment"];

/// Optional columns detected at open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// `readings.device_code` (denormalized device code).
    pub reading_device_code: bool,
    /// `readings.temperature_c` (sensor payload).
    pub reading_temperature: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            reading_device_code: true,
            reading_temperature: true,
        }
    }
}

/// Cheaply cloneable handle to the database.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    conn: Mutex<Connection>,
    location: String,
    capabilities: Capabilities,
}

impl Store {
    /// Open or create a database file and bring its schema up to date.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if path.as_os_str() == ":memory:" {
            return Self::in_memory();
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::from_connection(conn, path.display().to_string())
    }

    /// Create an in-memory database, mostly for tests.
    pub fn in_memory() -> Result<Self, CoreError> {
        Self::from_connection(Connection::open_in_memory()?, ":memory:".into())
    }

    fn from_connection(conn: Connection, location: String) -> Result<Self, CoreError> {
        ensure_required_columns(&conn)?;
        conn.execute_batch(SCHEMA_SQL)?;
        let capabilities = detect_capabilities(&conn)?;

        if capabilities != Capabilities::default() {
            tracing::warn!(
                ?capabilities,
                location = %location,
                "readings table lacks optional columns, writing without them"
            );
        }
        tracing::debug!(location = %location, "store opened");

        Ok(Self {
            inner: Arc::new(StoreInner {
                conn: Mutex::new(conn),
                location,
                capabilities,
            }),
        })
    }

    /// Where the database lives (`:memory:` for in-memory stores).
    pub fn location(&self) -> &str {
        &self.inner.location
    }

    pub fn capabilities(&self) -> Capabilities {
        self.inner.capabilities
    }

    /// Run `f` with exclusive access to the connection.
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, CoreError> {
        let conn = self
            .inner
            .conn
            .lock()
            .map_err(|_| CoreError::Internal("store connection lock poisoned".into()))?;
        Ok(f(&conn)?)
    }
}

fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let columns = stmt.query_map([table], |row| row.get::<_, String>(0))?;
    columns.collect()
}

/// Fail fast when an existing `readings` table cannot hold ledger rows.
fn ensure_required_columns(conn: &Connection) -> Result<(), CoreError> {
    let columns = table_columns(conn, "readings")?;
    if columns.is_empty() {
        // Table does not exist yet; the schema will create it.
        return Ok(());
    }
    for required in REQUIRED_READING_COLUMNS {
        if !columns.iter().any(|c| c == required) {
            return Err(CoreError::SchemaMismatch {
                table: "readings",
                column: required.to_owned(),
            });
        }
    }
    Ok(())
}

fn detect_capabilities(conn: &Connection) -> rusqlite::Result<Capabilities> {
    let columns = table_columns(conn, "readings")?;
    let has = |name: &str| columns.iter().any(|c| c == name);
    Ok(Capabilities {
        reading_device_code: has("device_code"),
        reading_temperature: has("temperature_c"),
    })
}
