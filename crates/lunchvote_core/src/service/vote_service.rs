//! Vote submission use-case service.
//!
//! # Responsibility
//! - Dispatch a `VoteRequest` through the ballot validator and, when
//!   accepted, through the tally ledger.
//! - Translate storage outcomes into caller-facing `VoteError` kinds.
//!
//! # Invariants
//! - Every rejection leaves ballots and point totals untouched.
//! - `StorageConflict` reaches callers as a duplicate vote but is logged
//!   under its own error code.

use crate::db::DbError;
use crate::model::ballot::Ballot;
use crate::model::employee::EmployeeId;
use crate::model::menu::MenuId;
use crate::model::submission::{SubmissionMode, VoteRequest};
use crate::repo::directory_repo::{RepoError, VoteDirectory};
use crate::repo::ledger_repo::{LedgerError, TallyEntry, TallyLedger};
use crate::service::ballot_validator::BallotValidator;
use chrono::NaiveDate;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type VoteResult<T> = Result<T, VoteError>;

/// Caller-facing failure of a vote submission.
#[derive(Debug)]
pub enum VoteError {
    /// The build-version signal does not select a known mode.
    InvalidRequestVersion { build_version: Option<String> },
    InvalidMenu(Option<MenuId>),
    InvalidEmployee(Option<EmployeeId>),
    /// Malformed batch: wrong count, missing fields, bad points.
    InvalidVoteData(String),
    DuplicateVote { menu_id: MenuId },
    /// A concurrent submission won the ballot uniqueness race.
    StorageConflict { menu_id: MenuId },
    /// Storage failed for reasons unrelated to the vote; nothing was
    /// committed. See [`VoteError::is_retryable`].
    Unavailable(Box<dyn Error + Send + Sync>),
}

impl VoteError {
    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequestVersion { .. } => "invalid_request_version",
            Self::InvalidMenu(_) => "invalid_menu",
            Self::InvalidEmployee(_) => "invalid_employee",
            Self::InvalidVoteData(_) => "invalid_vote_data",
            Self::DuplicateVote { .. } => "duplicate_vote",
            Self::StorageConflict { .. } => "storage_conflict",
            Self::Unavailable(_) => "storage_unavailable",
        }
    }

    /// Whether callers must treat this as "already voted for this menu today".
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            Self::DuplicateVote { .. } | Self::StorageConflict { .. }
        )
    }

    /// Whether resubmitting may succeed: only transient storage conditions
    /// (lock contention, I/O) qualify.
    pub fn is_retryable(&self) -> bool {
        let Self::Unavailable(source) = self else {
            return false;
        };
        let mut current: Option<&(dyn Error + 'static)> = Some(source.as_ref());
        while let Some(err) = current {
            if let Some(db_err) = err.downcast_ref::<DbError>() {
                return db_err.is_unavailable();
            }
            current = err.source();
        }
        false
    }
}

impl Display for VoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequestVersion { build_version } => match build_version {
                Some(value) => write!(f, "invalid request version `{value}`"),
                None => write!(f, "missing request version"),
            },
            Self::InvalidMenu(Some(id)) => write!(f, "invalid menu id {id}"),
            Self::InvalidMenu(None) => write!(f, "missing menu id"),
            Self::InvalidEmployee(Some(id)) => write!(f, "invalid employee id {id}"),
            Self::InvalidEmployee(None) => write!(f, "missing employee id"),
            Self::InvalidVoteData(reason) => write!(f, "invalid vote data: {reason}"),
            Self::DuplicateVote { menu_id } | Self::StorageConflict { menu_id } => {
                write!(f, "already voted for menu {menu_id} today")
            }
            Self::Unavailable(err) => write!(f, "vote storage unavailable: {err}"),
        }
    }
}

impl Error for VoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unavailable(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<RepoError> for VoteError {
    fn from(value: RepoError) -> Self {
        Self::Unavailable(Box::new(value))
    }
}

impl From<LedgerError> for VoteError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::DuplicateBallot { menu_id, .. } => Self::StorageConflict { menu_id },
            LedgerError::MenuNotFound(id) => Self::InvalidMenu(Some(id)),
            LedgerError::EmployeeNotFound(id) => Self::InvalidEmployee(Some(id)),
            other => Self::Unavailable(Box::new(other)),
        }
    }
}

/// Acknowledgement for an applied submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteReceipt {
    pub mode: SubmissionMode,
    /// Ballots created, in submitted order.
    pub ballots: Vec<Ballot>,
}

/// Vote submission service over a directory and a tally ledger.
pub struct VoteService<D: VoteDirectory, L: TallyLedger> {
    directory: D,
    ledger: L,
}

impl<D: VoteDirectory, L: TallyLedger> VoteService<D, L> {
    pub fn new(directory: D, ledger: L) -> Self {
        Self { directory, ledger }
    }

    /// Validates and applies one submission for `day`.
    ///
    /// # Contract
    /// - Single mode creates exactly one 1-point ballot.
    /// - Batch mode creates exactly three ballots or none.
    /// - Unsupported requests fail with `InvalidRequestVersion`.
    pub fn submit_vote(&self, request: &VoteRequest, day: NaiveDate) -> VoteResult<VoteReceipt> {
        let started_at = Instant::now();
        let mode_label = request.mode_label();

        match self.validate_and_apply(request, day) {
            Ok(receipt) => {
                info!(
                    "event=vote_submit module=vote status=ok mode={} ballots={} duration_ms={}",
                    mode_label,
                    receipt.ballots.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(receipt)
            }
            Err(err) => {
                log_rejection(mode_label, &err, started_at);
                Err(err)
            }
        }
    }

    /// Menus created on `day` with their current totals.
    pub fn current_tally(&self, day: NaiveDate) -> VoteResult<Vec<TallyEntry>> {
        Ok(self.ledger.tally_for_day(day)?)
    }

    /// Ballots one employee cast on `day`.
    pub fn ballots_for_employee(
        &self,
        employee_id: EmployeeId,
        day: NaiveDate,
    ) -> VoteResult<Vec<Ballot>> {
        Ok(self.ledger.ballots_for_employee(employee_id, day)?)
    }

    fn validate_and_apply(&self, request: &VoteRequest, day: NaiveDate) -> VoteResult<VoteReceipt> {
        let mode = match request {
            VoteRequest::Single { .. } => SubmissionMode::Single,
            VoteRequest::Batch { .. } => SubmissionMode::Batch,
            VoteRequest::Unsupported { build_version } => {
                return Err(VoteError::InvalidRequestVersion {
                    build_version: build_version.clone(),
                });
            }
        };

        let accepted = BallotValidator::new(&self.directory, &self.ledger).validate(request, day)?;
        let ballots = self.ledger.apply_batch(&accepted)?;
        Ok(VoteReceipt { mode, ballots })
    }
}

fn log_rejection(mode_label: &str, err: &VoteError, started_at: Instant) {
    let duration_ms = started_at.elapsed().as_millis();
    match err {
        VoteError::Unavailable(source) => error!(
            "event=vote_submit module=vote status=error mode={} duration_ms={} error_code={} retryable={} error={}",
            mode_label,
            duration_ms,
            err.code(),
            err.is_retryable(),
            source
        ),
        VoteError::StorageConflict { menu_id } => warn!(
            "event=vote_submit module=vote status=rejected mode={} duration_ms={} error_code={} menu_id={}",
            mode_label,
            duration_ms,
            err.code(),
            menu_id
        ),
        _ => info!(
            "event=vote_submit module=vote status=rejected mode={} duration_ms={} error_code={}",
            mode_label,
            duration_ms,
            err.code()
        ),
    }
}
