//! Request-facing facade over `lunchvote_core`.
//!
//! The HTTP transport calls [`api`] functions and serializes the returned
//! envelopes; no core types need to cross that boundary directly.

pub mod api;
mod payload;

pub use api::{ApiResponse, VoteResponseData};
