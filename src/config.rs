//! Configuration for mailbox registries.
//!
//! The core protocol has no deadlines: a call with no eligible match blocks
//! forever. A registry can nevertheless bound every mailbox wait, which turns
//! a stuck wait into an [`ErrorKind::Interrupted`](crate::ErrorKind::Interrupted)
//! failure. Tests use this so a protocol bug fails instead of hanging.

use std::time::Duration;

use thiserror::Error;

/// Environment variable read by [`Config::from_env`].
pub const WAIT_TIMEOUT_ENV: &str = "RENDEZVOUS_WAIT_TIMEOUT_MS";

/// Errors produced while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value {value:?} for {var}: expected milliseconds as an unsigned integer")]
    InvalidValue {
        /// Name of the variable.
        var: &'static str,
        /// Raw value found.
        value: String,
    },

    /// A zero timeout would interrupt every wait immediately.
    #[error("{var} must be greater than zero")]
    ZeroTimeout {
        /// Name of the variable.
        var: &'static str,
    },
}

/// Configuration shared by every process of a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Upper bound on a single mailbox wait. `None` waits forever.
    ///
    /// See [`Config::wait_timeout`] for what an expiry means to a
    /// rendezvous in flight.
    pub wait_timeout: Option<Duration>,
}

impl Config {
    /// Creates the default configuration: unbounded waits.
    #[must_use]
    pub const fn new() -> Self {
        Self { wait_timeout: None }
    }

    /// Bounds every mailbox wait by `timeout`.
    ///
    /// A wait that expires fails the command with
    /// [`ErrorKind::Interrupted`](crate::ErrorKind::Interrupted) and withdraws
    /// its remaining offers. An expiry can race a rendezvous that already
    /// committed: if the channel posts the `Commit` just as the timeout
    /// fires, the partner has completed while this side reports
    /// `Interrupted` and the transferred value is lost to it. Leave waits
    /// unbounded where every rendezvous must be observed by both sides.
    #[must_use]
    pub const fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    /// Removes any bound on mailbox waits.
    #[must_use]
    pub const fn no_wait_timeout(mut self) -> Self {
        self.wait_timeout = None;
        self
    }

    /// Loads configuration from the environment.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();
        if let Some(raw) = lookup(WAIT_TIMEOUT_ENV) {
            let millis = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    var: WAIT_TIMEOUT_ENV,
                    value: raw.clone(),
                })?;
            if millis == 0 {
                return Err(ConfigError::ZeroTimeout {
                    var: WAIT_TIMEOUT_ENV,
                });
            }
            config = config.wait_timeout(Duration::from_millis(millis));
        }
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
