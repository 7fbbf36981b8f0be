//! Ballot ledger records.
//!
//! # Invariants
//! - At most one `Ballot` exists per `(employee_id, menu_id, day)`.
//! - Ballots are immutable once persisted.
//! - `Points` is always within `1..=3`.

use crate::model::employee::EmployeeId;
use crate::model::menu::MenuId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type BallotId = Uuid;

/// Point weight carried by one vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Points(u8);

impl Points {
    pub const MIN: Points = Points(1);
    pub const MAX: Points = Points(3);
    /// Weight of a legacy single-menu vote.
    pub const SINGLE: Points = Points(1);

    pub fn new(value: i64) -> Result<Self, PointsOutOfRange> {
        u8::try_from(value)
            .ok()
            .filter(|points| (Self::MIN.0..=Self::MAX.0).contains(points))
            .map(Self)
            .ok_or(PointsOutOfRange(value))
    }

    pub fn get(self) -> u32 {
        u32::from(self.0)
    }
}

impl TryFrom<i64> for Points {
    type Error = PointsOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Points> for i64 {
    fn from(value: Points) -> Self {
        i64::from(value.0)
    }
}

impl Display for Points {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointsOutOfRange(pub i64);

impl Display for PointsOutOfRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "points must be between {} and {}, got {}",
            Points::MIN,
            Points::MAX,
            self.0
        )
    }
}

impl Error for PointsOutOfRange {}

/// A vote that passed validation and is ready for the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptedVote {
    pub menu_id: MenuId,
    pub employee_id: EmployeeId,
    pub day: NaiveDate,
    pub points: Points,
}

/// One persisted, immutable accepted-vote record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub id: BallotId,
    pub menu_id: MenuId,
    pub employee_id: EmployeeId,
    pub day: NaiveDate,
    pub points: Points,
}

impl Ballot {
    /// Creates the ballot record for an accepted vote with a fresh stable ID.
    pub fn from_accepted(vote: &AcceptedVote) -> Self {
        Self {
            id: Uuid::new_v4(),
            menu_id: vote.menu_id,
            employee_id: vote.employee_id,
            day: vote.day,
            points: vote.points,
        }
    }
}
