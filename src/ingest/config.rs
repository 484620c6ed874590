// src/ingest/config.rs
//! Runtime knobs for fetching and serving, read from the environment.

use std::time::Duration;

pub const ENV_FETCH_TIMEOUT_SECS: &str = "NEWS_FETCH_TIMEOUT_SECS";
pub const ENV_MAX_ITEMS_PER_SOURCE: &str = "NEWS_MAX_ITEMS_PER_SOURCE";
pub const ENV_USER_AGENT: &str = "NEWS_USER_AGENT";
pub const ENV_CACHE_MAX_AGE_SECS: &str = "NEWS_CACHE_MAX_AGE_SECS";
pub const ENV_CACHE_SWR_SECS: &str = "NEWS_CACHE_SWR_SECS";
pub const ENV_MAX_FEED_BYTES: &str = "NEWS_MAX_FEED_BYTES";

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 8;
pub const DEFAULT_MAX_ITEMS_PER_SOURCE: usize = 20;
pub const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 300;
pub const DEFAULT_CACHE_SWR_SECS: u64 = 600;
pub const DEFAULT_MAX_FEED_BYTES: usize = 5 * 1024 * 1024;

/// Runtime knobs for fetching and serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    pub fetch_timeout: Duration,
    pub max_items_per_source: usize,
    pub user_agent: String,
    pub cache_max_age_secs: u64,
    pub cache_swr_secs: u64,
    /// Feed bodies larger than this are rejected before parsing.
    pub max_feed_bytes: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            max_items_per_source: DEFAULT_MAX_ITEMS_PER_SOURCE,
            user_agent: default_user_agent(),
            cache_max_age_secs: DEFAULT_CACHE_MAX_AGE_SECS,
            cache_swr_secs: DEFAULT_CACHE_SWR_SECS,
            max_feed_bytes: DEFAULT_MAX_FEED_BYTES,
        }
    }
}

impl AggregatorConfig {
    /// Read overrides from the environment; unparsable values keep defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        let timeout = parse_u64_env(std::env::var(ENV_FETCH_TIMEOUT_SECS).ok())
            .map(|v| v.clamp(1, 60))
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);
        Self {
            fetch_timeout: Duration::from_secs(timeout),
            max_items_per_source: parse_u64_env(std::env::var(ENV_MAX_ITEMS_PER_SOURCE).ok())
                .map(|v| (v as usize).max(1))
                .unwrap_or(d.max_items_per_source),
            user_agent: std::env::var(ENV_USER_AGENT)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(d.user_agent),
            cache_max_age_secs: parse_u64_env(std::env::var(ENV_CACHE_MAX_AGE_SECS).ok())
                .unwrap_or(d.cache_max_age_secs),
            cache_swr_secs: parse_u64_env(std::env::var(ENV_CACHE_SWR_SECS).ok())
                .unwrap_or(d.cache_swr_secs),
            max_feed_bytes: parse_u64_env(std::env::var(ENV_MAX_FEED_BYTES).ok())
                .map(|v| (v as usize).max(1024))
                .unwrap_or(d.max_feed_bytes),
        }
    }
}

fn default_user_agent() -> String {
    format!("market-news-aggregator/{}", env!("CARGO_PKG_VERSION"))
}

fn parse_u64_env(raw: Option<String>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[serial_test::serial]
    #[test]
    fn config_from_env_clamps_and_defaults() {
        env::set_var(ENV_FETCH_TIMEOUT_SECS, "600");
        env::set_var(ENV_MAX_ITEMS_PER_SOURCE, "0");
        env::set_var(ENV_CACHE_MAX_AGE_SECS, "soon");
        env::set_var(ENV_MAX_FEED_BYTES, "10");
        let c = AggregatorConfig::from_env();
        assert_eq!(c.fetch_timeout, Duration::from_secs(60));
        assert_eq!(c.max_items_per_source, 1);
        assert_eq!(c.cache_max_age_secs, DEFAULT_CACHE_MAX_AGE_SECS);
        assert_eq!(c.max_feed_bytes, 1024);
        env::remove_var(ENV_FETCH_TIMEOUT_SECS);
        env::remove_var(ENV_MAX_ITEMS_PER_SOURCE);
        env::remove_var(ENV_CACHE_MAX_AGE_SECS);
        env::remove_var(ENV_MAX_FEED_BYTES);

        let c = AggregatorConfig::from_env();
        assert_eq!(c.max_items_per_source, DEFAULT_MAX_ITEMS_PER_SOURCE);
        assert_eq!(c.max_feed_bytes, DEFAULT_MAX_FEED_BYTES);
    }
}
