//! Connection setup for the vote store.
//!
//! # Invariants
//! - Returned connections enforce foreign keys and carry a busy timeout.
//! - Returned connections are migrated to the latest schema.
//! - File connections use WAL so tally reads do not block vote writers.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Lock wait applied when the caller does not configure one.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy)]
enum StoreKind {
    File,
    Memory,
}

impl StoreKind {
    fn label(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

/// Opens the database file at `path` with [`DEFAULT_BUSY_TIMEOUT`].
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
}

/// Opens the database file at `path`, waiting up to `busy_timeout` for
/// locks held by other handlers.
pub fn open_db_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> DbResult<Connection> {
    let started_at = Instant::now();
    let opened = Connection::open(path).map_err(DbError::from).and_then(|mut conn| {
        prepare(&mut conn, StoreKind::File, busy_timeout)?;
        Ok(conn)
    });
    log_open(StoreKind::File, started_at, opened)
}

/// Opens a private in-memory database, mainly for tests.
pub fn open_db_in_memory() -> DbResult<Connection> {
    let started_at = Instant::now();
    let opened = Connection::open_in_memory()
        .map_err(DbError::from)
        .and_then(|mut conn| {
            prepare(&mut conn, StoreKind::Memory, DEFAULT_BUSY_TIMEOUT)?;
            Ok(conn)
        });
    log_open(StoreKind::Memory, started_at, opened)
}

fn prepare(conn: &mut Connection, kind: StoreKind, busy_timeout: Duration) -> DbResult<()> {
    // Set before the journal switch, which can contend with other openers.
    conn.busy_timeout(busy_timeout)?;
    if let StoreKind::File = kind {
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    }
    conn.pragma_update(None, "foreign_keys", true)?;
    apply_migrations(conn)
}

fn log_open(
    kind: StoreKind,
    started_at: Instant,
    opened: DbResult<Connection>,
) -> DbResult<Connection> {
    let duration_ms = started_at.elapsed().as_millis();
    match &opened {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={} duration_ms={duration_ms}",
            kind.label()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={duration_ms} retryable={} error={err}",
            kind.label(),
            err.is_unavailable()
        ),
    }
    opened
}
