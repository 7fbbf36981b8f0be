//! Domain model for the lunch-voting core.
//!
//! # Responsibility
//! - Define the records the tally engine reads (`Menu`, `Employee`) and the
//!   record it owns (`Ballot`).
//! - Define the transient vote request shapes accepted at the boundary.
//!
//! # Invariants
//! - Menu and employee identities are storage-assigned integers.
//! - Ballot identities are stable UUIDs and never reused.

pub mod ballot;
pub mod employee;
pub mod menu;
pub mod submission;
