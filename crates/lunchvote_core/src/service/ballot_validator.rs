//! Ballot admissibility rules.
//!
//! # Responsibility
//! - Decide whether a single or batch submission may be applied.
//! - Normalize accepted submissions into `AcceptedVote`s.
//!
//! # Invariants
//! - Checks run in a fixed order and stop at the first failure.
//! - Validation is read-only; the ledger is never written from here.
//! - A menu may appear at most once per batch.

use crate::model::ballot::{AcceptedVote, Points};
use crate::model::employee::EmployeeId;
use crate::model::menu::MenuId;
use crate::model::submission::{BatchEntry, PointsInput, VoteRequest, BATCH_SIZE};
use crate::repo::directory_repo::VoteDirectory;
use crate::repo::ledger_repo::TallyLedger;
use crate::service::vote_service::{VoteError, VoteResult};
use chrono::NaiveDate;
use std::collections::HashSet;

/// Validator bound to the lookups it needs for one submission.
pub struct BallotValidator<'a, D: VoteDirectory, L: TallyLedger> {
    directory: &'a D,
    ledger: &'a L,
}

impl<'a, D: VoteDirectory, L: TallyLedger> BallotValidator<'a, D, L> {
    pub fn new(directory: &'a D, ledger: &'a L) -> Self {
        Self { directory, ledger }
    }

    /// Returns the votes to apply for `request` on `day`, or the first
    /// reason the request is inadmissible.
    pub fn validate(&self, request: &VoteRequest, day: NaiveDate) -> VoteResult<Vec<AcceptedVote>> {
        match request {
            VoteRequest::Single {
                menu_id,
                employee_id,
            } => self
                .validate_single(*menu_id, *employee_id, day)
                .map(|vote| vec![vote]),
            VoteRequest::Batch {
                employee_id,
                entries,
            } => self.validate_batch(*employee_id, entries, day),
            VoteRequest::Unsupported { build_version } => Err(VoteError::InvalidRequestVersion {
                build_version: build_version.clone(),
            }),
        }
    }

    fn validate_single(
        &self,
        menu_id: Option<MenuId>,
        employee_id: Option<EmployeeId>,
        day: NaiveDate,
    ) -> VoteResult<AcceptedVote> {
        let menu_id = self.resolve_menu(menu_id)?;
        let employee_id = self.resolve_employee(employee_id)?;
        self.ensure_not_voted(employee_id, menu_id, day)?;

        Ok(AcceptedVote {
            menu_id,
            employee_id,
            day,
            points: Points::SINGLE,
        })
    }

    fn validate_batch(
        &self,
        employee_id: Option<EmployeeId>,
        entries: &[BatchEntry],
        day: NaiveDate,
    ) -> VoteResult<Vec<AcceptedVote>> {
        if entries.len() != BATCH_SIZE {
            return Err(VoteError::InvalidVoteData(format!(
                "expected exactly {BATCH_SIZE} votes, got {}",
                entries.len()
            )));
        }

        let employee_id = self.resolve_employee(employee_id)?;
        let mut seen_menus = HashSet::with_capacity(BATCH_SIZE);
        let mut accepted = Vec::with_capacity(BATCH_SIZE);

        for (position, entry) in entries.iter().enumerate() {
            let (menu_id, points) = entry_shape(position, entry)?;
            if !seen_menus.insert(menu_id) {
                return Err(VoteError::InvalidVoteData(format!(
                    "vote {position}: menu {menu_id} appears more than once"
                )));
            }

            let menu_id = self.resolve_menu(Some(menu_id))?;
            self.ensure_not_voted(employee_id, menu_id, day)?;
            accepted.push(AcceptedVote {
                menu_id,
                employee_id,
                day,
                points,
            });
        }

        Ok(accepted)
    }

    fn resolve_menu(&self, menu_id: Option<MenuId>) -> VoteResult<MenuId> {
        match menu_id {
            Some(id) if self.directory.menu_exists(id)? => Ok(id),
            other => Err(VoteError::InvalidMenu(other)),
        }
    }

    fn resolve_employee(&self, employee_id: Option<EmployeeId>) -> VoteResult<EmployeeId> {
        match employee_id {
            Some(id) if self.directory.employee_exists(id)? => Ok(id),
            other => Err(VoteError::InvalidEmployee(other)),
        }
    }

    fn ensure_not_voted(
        &self,
        employee_id: EmployeeId,
        menu_id: MenuId,
        day: NaiveDate,
    ) -> VoteResult<()> {
        if self.ledger.has_ballot(employee_id, menu_id, day)? {
            return Err(VoteError::DuplicateVote { menu_id });
        }
        Ok(())
    }
}

fn entry_shape(position: usize, entry: &BatchEntry) -> VoteResult<(MenuId, Points)> {
    let menu_id = entry
        .menu_id
        .ok_or_else(|| VoteError::InvalidVoteData(format!("vote {position}: missing menu_id")))?;

    let points = match entry.points {
        Some(PointsInput::Integer(value)) => Points::new(value)
            .map_err(|err| VoteError::InvalidVoteData(format!("vote {position}: {err}")))?,
        Some(PointsInput::NotInteger) => {
            return Err(VoteError::InvalidVoteData(format!(
                "vote {position}: points must be an integer"
            )));
        }
        None => {
            return Err(VoteError::InvalidVoteData(format!(
                "vote {position}: missing points"
            )));
        }
    };

    Ok((menu_id, points))
}
