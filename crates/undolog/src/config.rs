#![forbid(unsafe_code)]

//! Construction-time configuration for [`History`](crate::History).

/// Environment variable read by [`HistoryConfig::from_env`].
pub const CAPACITY_ENV: &str = "UNDOLOG_CAPACITY";

/// Capacity used when none is given.
pub const DEFAULT_CAPACITY: usize = 100;

/// Errors produced while parsing configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The value is not a non-negative integer.
    #[error("invalid capacity {value:?}: expected a positive integer")]
    InvalidCapacity { value: String },
    /// The value parsed but is zero.
    #[error("capacity must be at least 1")]
    ZeroCapacity,
}

/// Configuration for a history instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistoryConfig {
    /// Maximum number of actions retained (past + future). Always `>= 1`
    /// once [`validated`](Self::validated).
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl HistoryConfig {
    /// Create a configuration with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity }.validated()
    }

    /// Set the capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self.validated()
    }

    /// Clamp values to valid ranges (capacity of at least one).
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.capacity = self.capacity.max(1);
        self
    }

    /// Load config from environment variables.
    ///
    /// Reads `UNDOLOG_CAPACITY`. Unparseable or zero values fall back to the
    /// default and are logged.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an injectable lookup.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = get_env(CAPACITY_ENV) {
            match parse_capacity(&raw) {
                Ok(capacity) => config.capacity = capacity,
                Err(err) => {
                    tracing::warn!(
                        var = CAPACITY_ENV,
                        value = %raw,
                        error = %err,
                        "ignoring invalid history capacity"
                    );
                }
            }
        }
        config.validated()
    }
}

/// Parse a capacity value such as `"250"`.
pub fn parse_capacity(raw: &str) -> Result<usize, ConfigError> {
    let capacity: usize = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidCapacity {
            value: raw.to_string(),
        })?;
    if capacity == 0 {
        return Err(ConfigError::ZeroCapacity);
    }
    Ok(capacity)
}
