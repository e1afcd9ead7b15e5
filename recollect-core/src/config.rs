use std::time::Duration;

/// Configuration for a history tracker
///
/// # Example
///
/// ```rust
/// use recollect_core::HistoryConfig;
/// use std::time::Duration;
///
/// let config = HistoryConfig::new("orders")
///     .with_time_to_live(Duration::from_secs(300))
///     .with_clean_interval(Duration::from_secs(30))
///     .with_hashing(true);
/// ```
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Name of the tracked collection (default: empty, which generates a random name)
    pub name: String,
    /// How long a recorded entry counts as "seen" (default: 60 seconds)
    pub time_to_live: Duration,
    /// Interval between background clean runs (default: 60 seconds, zero disables)
    pub clean_interval: Duration,
    /// Store a digest of each key instead of the key itself (default: false)
    pub use_hashing: bool,
    /// Upper bound for each remote call (default: none)
    pub remote_timeout: Option<Duration>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            time_to_live: Duration::from_secs(60),
            clean_interval: Duration::from_secs(60),
            use_hashing: false,
            remote_timeout: None,
        }
    }
}

impl HistoryConfig {
    /// Creates a new configuration with the given collection name and default values
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the time-to-live applied by `has` and `clean`
    ///
    /// A zero duration is ignored, the same as `HistoryTracker::set_time_to_live`.
    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        if !ttl.is_zero() {
            self.time_to_live = ttl;
        }
        self
    }

    /// Sets the clean interval
    ///
    /// This determines how often the background task removes stale entries.
    /// A zero interval disables background cleaning.
    pub fn with_clean_interval(mut self, interval: Duration) -> Self {
        self.clean_interval = interval;
        self
    }

    /// Enables or disables key hashing
    pub fn with_hashing(mut self, use_hashing: bool) -> Self {
        self.use_hashing = use_hashing;
        self
    }

    /// Sets a timeout for every call made to a remote backend
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = Some(timeout);
        self
    }

    /// Create a configuration from environment variables.
    ///
    /// Reads:
    /// - `RECOLLECT_NAME` - Collection name (defaults to a generated one)
    /// - `RECOLLECT_TTL_SECS` - Time-to-live in seconds (defaults to 60)
    /// - `RECOLLECT_CLEAN_INTERVAL_SECS` - Clean interval in seconds (defaults to 60)
    /// - `RECOLLECT_USE_HASHING` - `true`/`1` to hash keys (defaults to false)
    /// - `RECOLLECT_REMOTE_TIMEOUT_MS` - Optional remote call timeout in milliseconds
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());

        let time_to_live = number("RECOLLECT_TTL_SECS")
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.time_to_live);
        let clean_interval = number("RECOLLECT_CLEAN_INTERVAL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.clean_interval);
        let use_hashing = lookup("RECOLLECT_USE_HASHING")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.use_hashing);
        let remote_timeout = number("RECOLLECT_REMOTE_TIMEOUT_MS").map(Duration::from_millis);

        Self {
            name: lookup("RECOLLECT_NAME").unwrap_or_default(),
            time_to_live,
            clean_interval,
            use_hashing,
            remote_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = HistoryConfig::default();
        assert_eq!(config.time_to_live, Duration::from_secs(60));
        assert_eq!(config.clean_interval, Duration::from_secs(60));
        assert!(!config.use_hashing);
        assert!(config.remote_timeout.is_none());
    }

    #[test]
    fn test_builder_pattern_chaining() {
        let config = HistoryConfig::new("events")
            .with_time_to_live(Duration::from_secs(2))
            .with_clean_interval(Duration::from_secs(1))
            .with_hashing(true)
            .with_remote_timeout(Duration::from_millis(250));
        assert_eq!(config.name, "events");
        assert_eq!(config.time_to_live, Duration::from_secs(2));
        assert_eq!(config.clean_interval, Duration::from_secs(1));
        assert!(config.use_hashing);
        assert_eq!(config.remote_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_zero_ttl_is_ignored() {
        let config = HistoryConfig::default().with_time_to_live(Duration::ZERO);
        assert_eq!(config.time_to_live, Duration::from_secs(60));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("RECOLLECT_NAME", "payments"),
            ("RECOLLECT_TTL_SECS", "15"),
            ("RECOLLECT_CLEAN_INTERVAL_SECS", "not-a-number"),
            ("RECOLLECT_USE_HASHING", "TRUE"),
            ("RECOLLECT_REMOTE_TIMEOUT_MS", "500"),
        ]
        .into_iter()
        .collect();

        let config = HistoryConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.name, "payments");
        assert_eq!(config.time_to_live, Duration::from_secs(15));
        assert_eq!(config.clean_interval, Duration::from_secs(60));
        assert!(config.use_hashing);
        assert_eq!(config.remote_timeout, Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_from_lookup_empty_uses_defaults() {
        let config = HistoryConfig::from_lookup(|_| None);
        assert!(config.name.is_empty());
        assert_eq!(config.time_to_live, Duration::from_secs(60));
        assert!(!config.use_hashing);
    }
}
