//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the collaborator contracts the tally engine consumes
//!   (`VoteDirectory`) and the ledger contract it owns (`TallyLedger`).
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Only `TallyLedger` implementations write `ballots` rows or change
//!   `menus.points_total`.
//! - Repositories refuse connections whose schema lacks required tables.

use rusqlite::Connection;

pub mod directory_repo;
pub mod ledger_repo;

pub(crate) fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
