//! Vote request shapes accepted at the core boundary.
//!
//! Clients select legacy single voting or ranked batch voting with a
//! build-version signal. The signal is parsed once into [`SubmissionMode`];
//! everything past that point dispatches on [`VoteRequest`] variants.

use crate::model::employee::EmployeeId;
use crate::model::menu::MenuId;

/// Number of menus a ranked batch must contain.
pub const BATCH_SIZE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionMode {
    /// Legacy one-menu, implicit 1-point vote.
    Single,
    /// Ranked vote across exactly three menus.
    Batch,
}

impl SubmissionMode {
    /// Maps the client build-version signal to a mode.
    ///
    /// Returns `None` for missing or unrecognized values.
    pub fn from_build_version(value: Option<&str>) -> Option<Self> {
        match value.map(str::trim) {
            Some("old") => Some(Self::Single),
            Some("new") => Some(Self::Batch),
            Some(_) | None => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Batch => "batch",
        }
    }
}

/// Raw point value as submitted, before range validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointsInput {
    Integer(i64),
    /// Present but not an integer (fraction, string, boolean, ...).
    NotInteger,
}

/// One `(menu, points)` pair of a ranked batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchEntry {
    pub menu_id: Option<MenuId>,
    pub points: Option<PointsInput>,
}

impl BatchEntry {
    pub fn new(menu_id: MenuId, points: i64) -> Self {
        Self {
            menu_id: Some(menu_id),
            points: Some(PointsInput::Integer(points)),
        }
    }
}

/// A vote submission as received from the request layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteRequest {
    Single {
        menu_id: Option<MenuId>,
        employee_id: Option<EmployeeId>,
    },
    Batch {
        employee_id: Option<EmployeeId>,
        entries: Vec<BatchEntry>,
    },
    /// The client sent a build version this core does not serve.
    Unsupported { build_version: Option<String> },
}

impl VoteRequest {
    pub fn single(menu_id: MenuId, employee_id: EmployeeId) -> Self {
        Self::Single {
            menu_id: Some(menu_id),
            employee_id: Some(employee_id),
        }
    }

    pub fn batch(employee_id: EmployeeId, entries: Vec<BatchEntry>) -> Self {
        Self::Batch {
            employee_id: Some(employee_id),
            entries,
        }
    }

    pub fn mode_label(&self) -> &'static str {
        match self {
            Self::Single { .. } => SubmissionMode::Single.label(),
            Self::Batch { .. } => SubmissionMode::Batch.label(),
            Self::Unsupported { .. } => "unsupported",
        }
    }
}
