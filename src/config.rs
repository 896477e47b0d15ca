use std::path::PathBuf;
use std::time::Duration;

/// Engine configuration
///
/// Built with the builder methods or read from `OGLIKE_*` environment
/// variables. The catalog and the store handle are provided separately.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Acquisitions blocking longer than this are reported
    pub lock_wait_warning: Duration,

    /// Registry size above which idle locks are pruned (0 disables pruning)
    pub lock_prune_threshold: usize,

    /// JSON catalog document used by the binary
    pub catalog_path: Option<PathBuf>,

    /// Default log filter when `RUST_LOG` is not set
    pub log_filter: String,
}

impl EngineConfig {
    pub const LOCK_WAIT_WARNING_VAR: &'static str = "OGLIKE_LOCK_WAIT_WARNING_MS";
    pub const LOCK_PRUNE_THRESHOLD_VAR: &'static str = "OGLIKE_LOCK_PRUNE_THRESHOLD";
    pub const CATALOG_VAR: &'static str = "OGLIKE_CATALOG";
    pub const LOG_VAR: &'static str = "OGLIKE_LOG";

    pub fn new() -> Self {
        Self {
            lock_wait_warning: Duration::from_millis(500),
            lock_prune_threshold: 1024,
            catalog_path: None,
            log_filter: "info".to_string(),
        }
    }

    /// Set the slow acquisition threshold
    pub fn lock_wait_warning(mut self, threshold: Duration) -> Self {
        self.lock_wait_warning = threshold;
        self
    }

    /// Set the pruning threshold of the lock registry
    pub fn lock_prune_threshold(mut self, threshold: usize) -> Self {
        self.lock_prune_threshold = threshold;
        self
    }

    /// Set the catalog document
    pub fn catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    /// Set the default log filter
    pub fn log_filter(mut self, filter: &str) -> Self {
        self.log_filter = filter.to_string();
        self
    }

    /// Read overrides from the process environment
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`, starting from the defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(raw) = lookup(Self::LOCK_WAIT_WARNING_VAR) {
            let millis: u64 = raw
                .trim()
                .parse()
                .map_err(|_| format!("{} must be an integer, got '{}'", Self::LOCK_WAIT_WARNING_VAR, raw))?;
            config = config.lock_wait_warning(Duration::from_millis(millis));
        }

        if let Some(raw) = lookup(Self::LOCK_PRUNE_THRESHOLD_VAR) {
            let threshold: usize = raw
                .trim()
                .parse()
                .map_err(|_| format!("{} must be an integer, got '{}'", Self::LOCK_PRUNE_THRESHOLD_VAR, raw))?;
            config = config.lock_prune_threshold(threshold);
        }

        if let Some(path) = lookup(Self::CATALOG_VAR) {
            config = config.catalog_path(path);
        }

        if let Some(filter) = lookup(Self::LOG_VAR) {
            config = config.log_filter(&filter);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.lock_wait_warning.is_zero() {
            return Err("lock_wait_warning must be > 0".to_string());
        }

        if self.log_filter.trim().is_empty() {
            return Err("log_filter cannot be empty".to_string());
        }

        if let Some(path) = &self.catalog_path {
            if path.as_os_str().is_empty() {
                return Err("catalog_path cannot be empty".to_string());
            }
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
