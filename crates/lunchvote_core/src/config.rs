//! Runtime configuration resolved from the environment.
//!
//! # Invariants
//! - Resolution never fails: malformed values fall back to defaults with a
//!   warning.
//! - `log_level` is always a normalized level name.

use crate::db::DEFAULT_BUSY_TIMEOUT;
use crate::logging::{default_log_level, normalize_level};
use log::warn;
use std::path::PathBuf;
use std::time::Duration;

pub const DB_PATH_ENV: &str = "LUNCHVOTE_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "LUNCHVOTE_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "LUNCHVOTE_LOG_DIR";
pub const BUSY_TIMEOUT_ENV: &str = "LUNCHVOTE_BUSY_TIMEOUT_MS";

const DEFAULT_DB_FILE_NAME: &str = "lunchvote.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: &'static str,
    /// Logging stays disabled when unset.
    pub log_dir: Option<PathBuf>,
    pub busy_timeout: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level(),
            log_dir: None,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl CoreConfig {
    /// Resolves configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = read(DB_PATH_ENV).map_or(defaults.db_path, PathBuf::from);

        let log_level = match read(LOG_LEVEL_ENV) {
            Some(raw) => normalize_level(&raw).unwrap_or_else(|err| {
                warn!("event=config_load module=config status=fallback key={LOG_LEVEL_ENV} error={err}");
                defaults.log_level
            }),
            None => defaults.log_level,
        };

        let busy_timeout = match read(BUSY_TIMEOUT_ENV) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(millis) => Duration::from_millis(millis),
                Err(err) => {
                    warn!("event=config_load module=config status=fallback key={BUSY_TIMEOUT_ENV} error={err}");
                    defaults.busy_timeout
                }
            },
            None => defaults.busy_timeout,
        };

        Self {
            db_path,
            log_level,
            log_dir: read(LOG_DIR_ENV).map(PathBuf::from),
            busy_timeout,
        }
    }
}
