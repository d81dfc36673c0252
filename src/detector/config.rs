//! SpiderDetector configuration types.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default root of the spider rule files.
pub const DEFAULT_SPIDERS_DIR: &str = "config/spiders";

/// Default forward DNS timeout in milliseconds.
pub const DEFAULT_DNS_TIMEOUT_MS: u64 = 200;

/// Configuration for a SpiderDetector.
///
/// # Examples
/// ```
/// use spiderdetect::SpiderConfig;
///
/// let config = SpiderConfig::from_yaml_str(
///     "spiders_dir: /srv/dspace/config/spiders\ncase_insensitive: true\n",
/// ).unwrap();
/// assert!(config.case_insensitive);
/// assert!(!config.use_proxies);
/// assert_eq!(config.dns_timeout_ms, 200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpiderConfig {
    /// Directory holding IP lists, with `agents/` and `domains/` below it
    pub spiders_dir: PathBuf,
    /// Lowercase agent/domain patterns and inputs before matching
    pub case_insensitive: bool,
    /// Also check addresses from the `X-Forwarded-For` chain
    pub use_proxies: bool,
    /// Timeout for resolving hostname entries in IP lists
    pub dns_timeout_ms: u64,
    /// Record usage events from spiders
    pub log_bots: bool,
}

impl SpiderConfig {
    /// Create a config rooted at `spiders_dir` with default flags.
    pub fn new(spiders_dir: impl Into<PathBuf>) -> Self {
        Self {
            spiders_dir: spiders_dir.into(),
            ..Self::default()
        }
    }

    /// Parse a config from YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Check the values that cannot be expressed in the types.
    pub fn validate(&self) -> Result<()> {
        if self.dns_timeout_ms == 0 {
            return Err(Error::Config("dns_timeout_ms must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Set case-insensitive matching.
    pub fn with_case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    /// Set whether proxy headers are trusted.
    pub fn with_use_proxies(mut self, enabled: bool) -> Self {
        self.use_proxies = enabled;
        self
    }

    /// Set the DNS timeout, rounded down to whole milliseconds (at least 1).
    pub fn with_dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout_ms = u64::try_from(timeout.as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        self
    }

    /// Set whether spider usage is recorded.
    pub fn with_log_bots(mut self, enabled: bool) -> Self {
        self.log_bots = enabled;
        self
    }

    /// Get the DNS timeout as a Duration.
    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }
}

impl Default for SpiderConfig {
    fn default() -> Self {
        Self {
            spiders_dir: PathBuf::from(DEFAULT_SPIDERS_DIR),
            case_insensitive: false,
            use_proxies: false,
            dns_timeout_ms: DEFAULT_DNS_TIMEOUT_MS,
            log_bots: true,
        }
    }
}
