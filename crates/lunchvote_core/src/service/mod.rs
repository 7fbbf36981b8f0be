//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own the tally rules: admissibility, application and winner resolution.
//! - Keep request-layer callers decoupled from storage details.

pub mod ballot_validator;
pub mod directory_service;
pub mod vote_service;
pub mod winner_service;
