use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::WalletPassError;

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_FETCH_MAX_RETRIES: u32 = 2;

/// When to check whether a pass is already in the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateCheck {
    /// Never check; the wallet shows its own (no-op) screen for duplicates.
    Disabled,
    /// Check the resolved payload right before presenting it.
    #[default]
    AfterFetch,
    /// Also check the caller's pass key before fetching, skipping the download for passes that
    /// are already stored. Falls back to [`DuplicateCheck::AfterFetch`] when no key is given.
    BeforeFetch,
}

/// Configuration of a [`WalletSession`](crate::session::WalletSession).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(default)]
pub struct SessionConfig {
    /// Timeout of each pass download attempt, in seconds.
    pub fetch_timeout_secs: u64,
    /// How many times a transient download failure is retried.
    pub fetch_max_retries: u32,
    /// Duplicate pass policy.
    pub duplicate_check: DuplicateCheck,
    /// `User-Agent` sent with pass downloads.
    pub user_agent: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            fetch_max_retries: DEFAULT_FETCH_MAX_RETRIES,
            duplicate_check: DuplicateCheck::default(),
            user_agent: None,
        }
    }
}

impl SessionConfig {
    /// Parses a config from JSON; missing fields take their defaults.
    ///
    /// # Errors
    /// Returns `InvalidData` if the JSON is malformed or `fetch_timeout_secs` is zero.
    pub fn from_json(json: &str) -> Result<Self, WalletPassError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| WalletPassError::invalid_data(format!("Invalid config: {e}")))?;
        if config.fetch_timeout_secs == 0 {
            return Err(WalletPassError::invalid_data(
                "Invalid config: fetch_timeout_secs must be at least 1",
            ));
        }
        Ok(config)
    }

    /// Per-attempt download timeout, never shorter than one second.
    pub(crate) const fn fetch_timeout(&self) -> Duration {
        if self.fetch_timeout_secs == 0 {
            return Duration::from_secs(1);
        }
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub(crate) fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("walletpass-core/{}", env!("CARGO_PKG_VERSION")))
    }
}
