//! Session configuration loading: budgets, animation timing, retry policy and storage key.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};
use validator::{Validate, ValidationError};

use crate::{error::ConfigError, services::retry::RetryPolicy};

/// Default location on disk where the session looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/session.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIVIA_SESSION_CONFIG_PATH";

/// What to do when a persisted countdown comes back after a long absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum StaleTimerPolicy {
    /// Deduct the absence; if nothing is left the time expires immediately.
    #[default]
    Expire,
    /// Discard the snapshot and start a fresh session when the running countdown was started
    /// more than `max_absence_secs` ago.
    #[serde(rename_all = "camelCase")]
    ResetSession {
        /// Longest tolerated absence.
        max_absence_secs: u64,
    },
}

/// Immutable session configuration.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
#[validate(schema(function = "validate_budgets"))]
pub struct GameConfig {
    /// Fact slots per challenge.
    #[validate(range(min = 1, max = 64))]
    pub fact_count: usize,
    /// Main countdown budget.
    #[validate(range(min = 1))]
    pub time_budget_secs: u32,
    /// Wrong regular guesses allowed before the bonus round.
    #[validate(range(min = 1, max = 32))]
    pub max_guesses: usize,
    /// Delay between a reveal start and its commit (matches the opening animation).
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub reveal_commit_delay: Duration,
    /// Bonus round countdown budget.
    #[validate(range(min = 1))]
    pub final_five_time_secs: u32,
    /// Backoff applied to the Final Five option fetch.
    #[validate(nested)]
    pub final_five_retry: RetryPolicy,
    /// Key under which the snapshot is stored.
    #[validate(length(min = 1))]
    pub storage_key: String,
    /// Policy for countdowns resumed after a long absence.
    pub stale_timer: StaleTimerPolicy,
}

/// Every wrong guess consumes a clue, so the board must hold at least one fact per allowed guess.
fn validate_budgets(config: &GameConfig) -> Result<(), ValidationError> {
    if config.fact_count < config.max_guesses {
        let mut err = ValidationError::new("fact_count_below_max_guesses");
        err.message = Some(
            format!(
                "factCount ({}) must be at least maxGuesses ({})",
                config.fact_count, config.max_guesses
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            fact_count: 8,
            time_budget_secs: 300,
            max_guesses: 5,
            reveal_commit_delay: Duration::from_millis(950),
            final_five_time_secs: 55,
            final_five_retry: RetryPolicy::default(),
            storage_key: "trivia-session".into(),
            stale_timer: StaleTimerPolicy::default(),
        }
    }
}

impl GameConfig {
    /// Load the configuration from disk, falling back to the built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match Self::from_path(&path) {
            Ok(config) => {
                info!(
                    path = %path.display(),
                    facts = config.fact_count,
                    budget_secs = config.time_budget_secs,
                    "loaded session config"
                );
                config
            }
            Err(ConfigError::Read { source, .. }) if source.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to load config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Read and validate a configuration file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Parse and validate a JSON configuration. Missing keys take their default value.
    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
