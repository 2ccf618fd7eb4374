// src/config.rs
// Runtime configuration: one TOML file with an env-var path override. Every
// section and field is optional; absent values take the defaults below, which
// match the source's published rate limits and the 0-10 rating scale.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::catalog::DEFAULT_MAX_TITLES;
use crate::error::RecommendError;
use crate::ingest::jikan::DEFAULT_BASE_URL;
use crate::ingest::retry::RetryPolicy;
use crate::similarity::HybridWeights;

pub const ENV_CONFIG_PATH: &str = "RECOMMENDER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/recommender.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    pub source: SourceConfig,
    pub ingest: IngestConfig,
    pub features: FeatureConfig,
    pub similarity: SimilarityConfig,
    pub server: ServerConfig,
}

impl RecommenderConfig {
    /// Rejects values the pipeline or the scorer cannot run with.
    pub fn validate(&self) -> std::result::Result<(), RecommendError> {
        let i = &self.ingest;
        if i.page_size == 0 || i.max_pages == 0 || i.max_items == 0 {
            return Err(RecommendError::InvalidConfig(
                "page_size, max_pages and max_items must all be positive".to_string(),
            ));
        }
        if i.max_retries_per_page == 0 {
            return Err(RecommendError::InvalidConfig(
                "max_retries_per_page must be at least 1".to_string(),
            ));
        }
        let s = &self.similarity;
        if s.default_limit == 0 || s.max_limit < s.default_limit {
            return Err(RecommendError::InvalidConfig(
                "default_limit must be positive and max_limit must not be below it".to_string(),
            ));
        }
        let weights = [s.genre_weight, s.rating_weight, s.kind_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(RecommendError::InvalidConfig(
                "similarity weights must be finite and non-negative".to_string(),
            ));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(RecommendError::InvalidConfig(
                "similarity weights must not all be zero".to_string(),
            ));
        }
        if self.source.request_timeout_secs == 0 {
            return Err(RecommendError::InvalidConfig(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl SourceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub max_items: usize,
    pub page_size: u32,
    pub max_pages: u32,
    /// Total fetch attempts per page, the first call included.
    pub max_retries_per_page: u32,
    /// Politeness delay after each successful page fetch.
    pub page_delay_ms: u64,
    pub rate_limit_delay_ms: u64,
    pub timeout_delay_ms: u64,
    pub error_delay_ms: u64,
    pub refresh_interval_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_TITLES,
            page_size: 25,
            max_pages: 50,
            max_retries_per_page: 3,
            page_delay_ms: 1500,
            rate_limit_delay_ms: 2000,
            timeout_delay_ms: 5000,
            error_delay_ms: 2000,
            refresh_interval_secs: 3600,
        }
    }
}

impl IngestConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries_per_page,
            rate_limit_delay: Duration::from_millis(self.rate_limit_delay_ms),
            timeout_delay: Duration::from_millis(self.timeout_delay_ms),
            error_delay: Duration::from_millis(self.error_delay_ms),
        }
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Numeric attribute allowlist for the feature space.
    pub attributes: Vec<String>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            attributes: ["rating", "members", "episodes", "popularity"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub genre_weight: f64,
    pub rating_weight: f64,
    pub kind_weight: f64,
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            genre_weight: 0.6,
            rating_weight: 0.25,
            kind_weight: 0.15,
            default_limit: 5,
            max_limit: 50,
        }
    }
}

impl SimilarityConfig {
    pub fn weights(&self) -> HybridWeights {
        HybridWeights {
            genre: self.genre_weight,
            rating: self.rating_weight,
            kind: self.kind_weight,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

pub fn load_from(path: &Path) -> Result<RecommenderConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let cfg: RecommenderConfig = toml::from_str(&content)
        .with_context(|| format!("parsing config from {}", path.display()))?;
    Ok(cfg)
}

/// Load using env var + fallbacks:
/// 1) $RECOMMENDER_CONFIG_PATH (must exist when set)
/// 2) config/recommender.toml
/// 3) built-in defaults
pub fn load_default() -> Result<RecommenderConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_from(&pb);
        }
        return Err(anyhow!(
            "RECOMMENDER_CONFIG_PATH points to non-existent path"
        ));
    }
    let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default_p.exists() {
        return load_from(&default_p);
    }
    Ok(RecommenderConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn defaults_match_source_policy() {
        let cfg = RecommenderConfig::default();
        assert_eq!(cfg.ingest.max_items, 1000);
        assert_eq!(cfg.ingest.page_size, 25);
        assert_eq!(cfg.ingest.max_pages, 50);
        assert_eq!(cfg.ingest.max_retries_per_page, 3);
        assert_eq!(cfg.ingest.page_delay_ms, 1500);
        assert_eq!(cfg.source.base_url, DEFAULT_BASE_URL);
        assert!((cfg.similarity.genre_weight - 0.6).abs() < 1e-12);
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg: RecommenderConfig = toml::from_str(
            r#"
            [ingest]
            page_size = 10
            max_pages = 3

            [similarity]
            genre_weight = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.ingest.page_size, 10);
        assert_eq!(cfg.ingest.max_pages, 3);
        assert_eq!(cfg.ingest.max_items, 1000);
        assert!((cfg.similarity.genre_weight - 0.5).abs() < 1e-12);
        assert!((cfg.similarity.rating_weight - 0.25).abs() < 1e-12);
        assert_eq!(cfg.server.bind_addr, "0.0.0.0:8000");
    }

    #[test]
    fn bad_weights_are_rejected() {
        let mut cfg = RecommenderConfig::default();
        cfg.similarity.genre_weight = -1.0;
        assert!(matches!(
            cfg.validate(),
            Err(RecommendError::InvalidConfig(_))
        ));

        let mut zeroed = RecommenderConfig::default();
        zeroed.similarity.genre_weight = 0.0;
        zeroed.similarity.rating_weight = 0.0;
        zeroed.similarity.kind_weight = 0.0;
        assert!(zeroed.validate().is_err());
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let mut cfg = RecommenderConfig::default();
        cfg.ingest.page_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[serial_test::serial]
    #[test]
    fn env_path_overrides_and_must_exist() {
        let path = env::temp_dir().join(format!("recommender_cfg_{}.toml", std::process::id()));
        std::fs::write(&path, "[ingest]\nmax_items = 42\n").unwrap();

        env::set_var(ENV_CONFIG_PATH, path.display().to_string());
        let cfg = load_default().unwrap();
        assert_eq!(cfg.ingest.max_items, 42);

        env::set_var(ENV_CONFIG_PATH, "/definitely/not/a/real/path.toml");
        assert!(load_default().is_err());

        env::remove_var(ENV_CONFIG_PATH);
        let _ = std::fs::remove_file(&path);
    }
}
