//! Core voting logic for LunchVote.
//! This crate is the single source of truth for tally invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::ballot::{AcceptedVote, Ballot, BallotId, Points, PointsOutOfRange};
pub use model::employee::{Employee, EmployeeId, NewEmployee, Organization, Role};
pub use model::menu::{Menu, MenuId, NewRestaurant, Restaurant, RestaurantId};
pub use model::submission::{BatchEntry, PointsInput, SubmissionMode, VoteRequest, BATCH_SIZE};
pub use repo::directory_repo::{
    DirectoryRepository, RepoError, RepoResult, SqliteDirectoryRepository, VoteDirectory,
};
pub use repo::ledger_repo::{
    LedgerError, LedgerResult, SqliteTallyLedger, TallyEntry, TallyLedger,
};
pub use service::ballot_validator::BallotValidator;
pub use service::directory_service::{DirectoryService, RegisterEmployeeRequest};
pub use service::vote_service::{VoteError, VoteReceipt, VoteResult, VoteService};
pub use service::winner_service::{resolve_winners, WinnerOutcome, WinnerService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
