//! Daily winner resolution.
//!
//! # Invariants
//! - Only menus created on the queried day compete.
//! - Every menu tied at the maximum total wins; ties are never broken.
//! - No menus for the day is `NoWinner`, distinct from a tie.

use crate::model::menu::Menu;
use crate::repo::directory_repo::{RepoResult, VoteDirectory};
use chrono::NaiveDate;
use log::debug;

/// Result of resolving a day's winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WinnerOutcome {
    NoWinner,
    /// Menus sharing the maximum total, ordered by id.
    Winners(Vec<Menu>),
}

impl WinnerOutcome {
    pub fn menus(&self) -> &[Menu] {
        match self {
            Self::NoWinner => &[],
            Self::Winners(menus) => menus,
        }
    }

    pub fn is_tie(&self) -> bool {
        self.menus().len() > 1
    }
}

pub struct WinnerService<D: VoteDirectory> {
    directory: D,
}

impl<D: VoteDirectory> WinnerService<D> {
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    /// Resolves the winning menu(s) for `day` from current totals.
    pub fn winning_menus(&self, day: NaiveDate) -> RepoResult<WinnerOutcome> {
        let menus = self.directory.menus_for_day(day)?;
        let candidates = menus.len();
        let outcome = resolve_winners(menus);
        debug!(
            "event=winner_resolve module=vote status=ok day={} candidates={} winners={}",
            day,
            candidates,
            outcome.menus().len()
        );
        Ok(outcome)
    }
}

/// Picks every menu tied at the maximum `points_total`.
///
/// The result does not depend on input order.
pub fn resolve_winners(menus: Vec<Menu>) -> WinnerOutcome {
    let Some(max_points) = menus.iter().map(|menu| menu.points_total).max() else {
        return WinnerOutcome::NoWinner;
    };

    let mut winners: Vec<Menu> = menus
        .into_iter()
        .filter(|menu| menu.points_total == max_points)
        .collect();
    winners.sort_by_key(|menu| menu.id);
    WinnerOutcome::Winners(winners)
}
