//! Application configuration structures.

use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Allowed pause between upstream page requests.
pub const PAGE_DELAY_RANGE_MS: RangeInclusive<u64> = 300..=500;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listening address for the HTTP service
    #[serde(default)]
    pub server: ServerConfig,

    /// Remote registration API settings
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Cache lifetimes
    #[serde(default)]
    pub cache: CacheConfig,

    /// Registrant ordering
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Region lookup settings
    #[serde(default)]
    pub regions: RegionsConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply the `PORT` environment variable on top of the file settings.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var("PORT") {
            match raw.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(e) => log::warn!("Invalid PORT value {raw:?}: {e}. Keeping {}", self.server.port),
            }
        }
        self
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let urls = [
            ("upstream.registration_url", &self.upstream.registration_url),
            ("upstream.school_url", &self.upstream.school_url),
            ("upstream.region_url", &self.upstream.region_url),
        ];
        for (name, value) in urls {
            if value.trim().is_empty() {
                return Err(AppError::validation(format!("{name} is empty")));
            }
            url::Url::parse(value)
                .map_err(|e| AppError::validation(format!("{name} is not a URL: {e}")))?;
        }
        if self.upstream.user_agent.trim().is_empty() {
            return Err(AppError::validation("upstream.user_agent is empty"));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(AppError::validation("upstream.timeout_secs must be > 0"));
        }
        if self.upstream.page_size == 0 || self.upstream.school_page_size == 0 {
            return Err(AppError::validation("upstream page sizes must be > 0"));
        }
        if !PAGE_DELAY_RANGE_MS.contains(&self.upstream.page_delay_ms) {
            return Err(AppError::validation(format!(
                "upstream.page_delay_ms must be within {}..={}",
                PAGE_DELAY_RANGE_MS.start(),
                PAGE_DELAY_RANGE_MS.end()
            )));
        }
        let ttls = [
            self.cache.registrants_ttl_secs,
            self.cache.regions_ttl_secs,
            self.cache.schools_ttl_secs,
            self.cache.school_detail_ttl_secs,
        ];
        if ttls.contains(&0) {
            return Err(AppError::validation("cache TTLs must be > 0"));
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::host")]
    pub host: String,

    #[serde(default = "defaults::port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
        }
    }
}

/// Remote API endpoints and request pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Paginated registrant listing
    #[serde(default = "defaults::registration_url")]
    pub registration_url: String,

    /// Paginated school listing; `/{npsn}` gives a school's detail
    #[serde(default = "defaults::school_url")]
    pub school_url: String,

    /// Education-branch region listing
    #[serde(default = "defaults::region_url")]
    pub region_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Pause between consecutive page requests in milliseconds
    #[serde(default = "defaults::page_delay")]
    pub page_delay_ms: u64,

    /// Registrants requested per page
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    /// Schools requested per page
    #[serde(default = "defaults::page_size")]
    pub school_page_size: u32,

    /// `limit` sent with the region request
    #[serde(default = "defaults::region_limit")]
    pub region_limit: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            registration_url: defaults::registration_url(),
            school_url: defaults::school_url(),
            region_url: defaults::region_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_delay_ms: defaults::page_delay(),
            page_size: defaults::page_size(),
            school_page_size: defaults::page_size(),
            region_limit: defaults::region_limit(),
        }
    }
}

/// Time-to-live for each kind of cached lookup, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "defaults::ttl")]
    pub registrants_ttl_secs: u64,

    #[serde(default = "defaults::ttl")]
    pub regions_ttl_secs: u64,

    #[serde(default = "defaults::ttl")]
    pub schools_ttl_secs: u64,

    #[serde(default = "defaults::ttl")]
    pub school_detail_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            registrants_ttl_secs: defaults::ttl(),
            regions_ttl_secs: defaults::ttl(),
            schools_ttl_secs: defaults::ttl(),
            school_detail_ttl_secs: defaults::ttl(),
        }
    }
}

/// Ordering applied to filtered registrants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingStrategy {
    /// Score descending, then first-choice distance ascending
    #[default]
    ScoreFirst,
    /// First-choice distance ascending, then score descending
    DistanceFirst,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default)]
    pub strategy: RankingStrategy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionsConfig {
    /// Replacement for the bundled fallback region table
    #[serde(default)]
    pub fallback_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    const API_BASE: &str = "https://spmb.jabarprov.go.id/api/public";

    // Server defaults
    pub fn host() -> String {
        "0.0.0.0".into()
    }
    pub fn port() -> u16 {
        5000
    }

    // Upstream defaults
    pub fn registration_url() -> String {
        format!("{API_BASE}/registration")
    }
    pub fn school_url() -> String {
        format!("{API_BASE}/school")
    }
    pub fn region_url() -> String {
        format!("{API_BASE}/cadisdik")
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; spmb-proxy/0.1)".into()
    }
    pub fn timeout() -> u64 {
        15
    }
    pub fn page_delay() -> u64 {
        500
    }
    pub fn page_size() -> u32 {
        100
    }
    pub fn region_limit() -> u32 {
        100
    }

    // Cache defaults
    pub fn ttl() -> u64 {
        3600
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn defaults_match_upstream_courtesy_limits() {
        let config = Config::default();
        assert_eq!(config.upstream.timeout_secs, 15);
        assert_eq!(config.upstream.page_delay_ms, 500);
        assert_eq!(config.cache.registrants_ttl_secs, 3600);
        assert_eq!(config.ranking.strategy, RankingStrategy::ScoreFirst);
    }

    #[test]
    fn validate_enforces_page_delay_window() {
        let mut config = Config::default();
        for delay in [0, 50, 299, 501, 5_000] {
            config.upstream.page_delay_ms = delay;
            assert!(
                matches!(config.validate(), Err(AppError::Validation(_))),
                "page_delay_ms = {delay} accepted"
            );
        }
        for delay in [300, 400, 500] {
            config.upstream.page_delay_ms = delay;
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.upstream.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_url() {
        let mut config = Config::default();
        config.upstream.school_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_ttl() {
        let mut config = Config::default();
        config.cache.schools_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nport = 8080\n\n[ranking]\nstrategy = \"distance_first\"\n\n[cache]\nregistrants_ttl_secs = 300"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.ranking.strategy, RankingStrategy::DistanceFirst);
        assert_eq!(config.cache.registrants_ttl_secs, 300);
        assert_eq!(config.cache.regions_ttl_secs, 3600);
        assert_eq!(config.upstream.page_size, 100);
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let config = Config::load_or_default("/nonexistent/spmb/config.toml");
        assert_eq!(config.server.port, 5000);
    }
}
