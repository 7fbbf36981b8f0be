//! Tally ledger contract and SQLite implementation.
//!
//! # Responsibility
//! - Append ballots and accumulate menu point totals.
//! - Answer tally queries over the append-only ballot record.
//!
//! # Invariants
//! - A submission is applied inside one `IMMEDIATE` transaction: either every
//!   ballot and point increment persists, or none does.
//! - Point increments are a single `points_total = points_total + ?`
//!   statement; totals are never written back from application memory.
//! - The `(employee_id, menu_id, day)` unique constraint is the authority on
//!   duplicates. A constraint hit surfaces as `LedgerError::DuplicateBallot`.

use crate::db::{is_foreign_key_violation, is_unique_violation, DbError};
use crate::model::ballot::{AcceptedVote, Ballot, Points};
use crate::model::employee::EmployeeId;
use crate::model::menu::{MenuId, RestaurantId};
use crate::repo::table_exists;
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const BALLOT_SELECT_SQL: &str = "SELECT
    uuid,
    menu_id,
    employee_id,
    day,
    points
FROM ballots";

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger-layer error for ballot writes and tally reads.
#[derive(Debug)]
pub enum LedgerError {
    Db(DbError),
    /// Insert lost against the ballot uniqueness constraint.
    DuplicateBallot {
        employee_id: EmployeeId,
        menu_id: MenuId,
        day: NaiveDate,
    },
    MenuNotFound(MenuId),
    EmployeeNotFound(EmployeeId),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateBallot {
                employee_id,
                menu_id,
                day,
            } => write!(
                f,
                "ballot already recorded for employee {employee_id} on menu {menu_id} for {day}"
            ),
            Self::MenuNotFound(id) => write!(f, "menu not found: {id}"),
            Self::EmployeeNotFound(id) => write!(f, "employee not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted ballot data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for LedgerError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Per-menu tally row for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TallyEntry {
    pub menu_id: MenuId,
    pub restaurant_id: RestaurantId,
    pub points_total: u32,
    /// Ballots cast for this menu on the tallied day.
    pub ballot_count: u32,
}

/// Append-only ballot ledger.
pub trait TallyLedger {
    fn has_ballot(
        &self,
        employee_id: EmployeeId,
        menu_id: MenuId,
        day: NaiveDate,
    ) -> LedgerResult<bool>;

    /// Applies one accepted vote.
    fn apply(&self, vote: &AcceptedVote) -> LedgerResult<Ballot> {
        let mut ballots = self.apply_batch(std::slice::from_ref(vote))?;
        ballots
            .pop()
            .ok_or_else(|| LedgerError::InvalidData("ledger applied no ballot".to_string()))
    }

    /// Applies all votes atomically, returning ballots in input order.
    fn apply_batch(&self, votes: &[AcceptedVote]) -> LedgerResult<Vec<Ballot>>;

    fn ballots_for_day(&self, day: NaiveDate) -> LedgerResult<Vec<Ballot>>;

    fn ballots_for_employee(
        &self,
        employee_id: EmployeeId,
        day: NaiveDate,
    ) -> LedgerResult<Vec<Ballot>>;

    /// Menus created on `day` with their totals, highest total first.
    fn tally_for_day(&self, day: NaiveDate) -> LedgerResult<Vec<TallyEntry>>;
}

/// SQLite-backed tally ledger.
pub struct SqliteTallyLedger<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTallyLedger<'conn> {
    /// Constructs a ledger from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> LedgerResult<Self> {
        for table in ["menus", "ballots"] {
            if !table_exists(conn, table)? {
                return Err(LedgerError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }
}

impl TallyLedger for SqliteTallyLedger<'_> {
    fn has_ballot(
        &self,
        employee_id: EmployeeId,
        menu_id: MenuId,
        day: NaiveDate,
    ) -> LedgerResult<bool> {
        let found: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM ballots
                WHERE employee_id = ?1
                  AND menu_id = ?2
                  AND day = ?3
            );",
            params![employee_id, menu_id, day],
            |row| row.get(0),
        )?;
        Ok(found == 1)
    }

    fn apply_batch(&self, votes: &[AcceptedVote]) -> LedgerResult<Vec<Ballot>> {
        // Repositories share `&Connection`, so the transaction is opened
        // unchecked; no other transaction is active on this connection here.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut ballots = Vec::with_capacity(votes.len());

        for vote in votes {
            let changed = tx.execute(
                "UPDATE menus
                 SET points_total = points_total + ?1
                 WHERE id = ?2;",
                params![i64::from(vote.points), vote.menu_id],
            )?;
            if changed == 0 {
                return Err(LedgerError::MenuNotFound(vote.menu_id));
            }

            let ballot = Ballot::from_accepted(vote);
            insert_ballot(&tx, &ballot)?;
            ballots.push(ballot);
        }

        tx.commit()?;
        Ok(ballots)
    }

    fn ballots_for_day(&self, day: NaiveDate) -> LedgerResult<Vec<Ballot>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BALLOT_SELECT_SQL} WHERE day = ?1 ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([day])?;
        let mut ballots = Vec::new();
        while let Some(row) = rows.next()? {
            ballots.push(parse_ballot_row(row)?);
        }
        Ok(ballots)
    }

    fn ballots_for_employee(
        &self,
        employee_id: EmployeeId,
        day: NaiveDate,
    ) -> LedgerResult<Vec<Ballot>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BALLOT_SELECT_SQL}
             WHERE employee_id = ?1
               AND day = ?2
             ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query(params![employee_id, day])?;
        let mut ballots = Vec::new();
        while let Some(row) = rows.next()? {
            ballots.push(parse_ballot_row(row)?);
        }
        Ok(ballots)
    }

    fn tally_for_day(&self, day: NaiveDate) -> LedgerResult<Vec<TallyEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                m.id AS menu_id,
                m.restaurant_id AS restaurant_id,
                m.points_total AS points_total,
                COUNT(b.uuid) AS ballot_count
             FROM menus m
             LEFT JOIN ballots b
               ON b.menu_id = m.id
              AND b.day = ?1
             WHERE m.created_on = ?1
             GROUP BY m.id
             ORDER BY m.points_total DESC, m.id ASC;",
        )?;
        let mut rows = stmt.query([day])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let menu_id: MenuId = row.get("menu_id")?;
            entries.push(TallyEntry {
                menu_id,
                restaurant_id: row.get("restaurant_id")?,
                points_total: non_negative(row.get("points_total")?, "menus.points_total")?,
                ballot_count: non_negative(row.get("ballot_count")?, "ballot_count")?,
            });
        }
        Ok(entries)
    }
}

fn insert_ballot(tx: &Transaction<'_>, ballot: &Ballot) -> LedgerResult<()> {
    let inserted = tx.execute(
        "INSERT INTO ballots (uuid, menu_id, employee_id, day, points)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            ballot.id.to_string(),
            ballot.menu_id,
            ballot.employee_id,
            ballot.day,
            i64::from(ballot.points),
        ],
    );

    match inserted {
        Ok(_) => Ok(()),
        Err(err) if is_unique_violation(&err) => Err(LedgerError::DuplicateBallot {
            employee_id: ballot.employee_id,
            menu_id: ballot.menu_id,
            day: ballot.day,
        }),
        // The menu row was just updated, so the missing parent is the employee.
        Err(err) if is_foreign_key_violation(&err) => {
            Err(LedgerError::EmployeeNotFound(ballot.employee_id))
        }
        Err(err) => Err(err.into()),
    }
}

fn parse_ballot_row(row: &Row<'_>) -> LedgerResult<Ballot> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        LedgerError::InvalidData(format!("invalid uuid value `{uuid_text}` in ballots.uuid"))
    })?;

    let raw_points: i64 = row.get("points")?;
    let points = Points::new(raw_points)
        .map_err(|err| LedgerError::InvalidData(format!("ballots.points: {err}")))?;

    Ok(Ballot {
        id,
        menu_id: row.get("menu_id")?,
        employee_id: row.get("employee_id")?,
        day: row.get("day")?,
        points,
    })
}

fn non_negative(value: i64, column: &str) -> LedgerResult<u32> {
    u32::try_from(value)
        .map_err(|_| LedgerError::InvalidData(format!("invalid value `{value}` in {column}")))
}
