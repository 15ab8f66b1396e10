use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    pub listing_url: String,
    /// Detail page; the identifier is appended as the `detail_param` query parameter.
    pub detail_url: String,
    pub detail_param: String,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            listing_url: "https://www.fundamentus.com.br/fii_resultado.php".to_string(),
            detail_url: "https://www.fundamentus.com.br/detalhes.php".to_string(),
            detail_param: "papel".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub url: String,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            url: "https://api.bcb.gov.br/dados/serie/bcdata.sgs.432/dados/ultimos/1?formato=json"
                .to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub max_attempts: u32,
    /// Random pause before every attempt, in milliseconds.
    pub polite_delay_ms: DelayRange,
    pub backoff_base_ms: u64,
    pub max_jitter_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            max_attempts: 4,
            polite_delay_ms: DelayRange {
                min: 900,
                max: 2200,
            },
            backoff_base_ms: 1000,
            max_jitter_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub listing_ttl_secs: u64,
    pub detail_ttl_secs: u64,
}

impl CacheConfig {
    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_secs)
    }

    pub fn detail_ttl(&self) -> Duration {
        Duration::from_secs(self.detail_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            listing_ttl_secs: 6 * 60 * 60,
            detail_ttl_secs: 6 * 60 * 60,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub benchmark: BenchmarkConfig,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    /// Detail lookups allowed in flight during batch enrichment.
    pub concurrency: usize,
    pub default_top: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            source: SourceConfig::default(),
            benchmark: BenchmarkConfig::default(),
            fetch: FetchConfig::default(),
            cache: CacheConfig::default(),
            concurrency: 4,
            default_top: 10,
        }
    }
}

impl AppConfig {
    /// Loads the default config file, falling back to built-in defaults when
    /// none has been set up.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("br", "fiirank", "fiirank")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
source:
  listing_url: "http://localhost:8080/fii_resultado.php"
  detail_url: "http://localhost:8080/detalhes.php"
fetch:
  max_attempts: 2
  polite_delay_ms:
    min: 0
    max: 0
  backoff_base_ms: 0
  max_jitter_ms: 0
cache:
  detail_ttl_secs: 60
concurrency: 8
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(
            config.source.listing_url,
            "http://localhost:8080/fii_resultado.php"
        );
        assert_eq!(config.source.detail_param, "papel");
        assert_eq!(config.fetch.max_attempts, 2);
        assert_eq!(config.fetch.polite_delay_ms, DelayRange { min: 0, max: 0 });
        assert_eq!(config.cache.detail_ttl(), Duration::from_secs(60));
        assert_eq!(config.cache.listing_ttl(), Duration::from_secs(21600));
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.default_top, 10);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.fetch.max_attempts, 4);
        assert_eq!(
            config.fetch.polite_delay_ms,
            DelayRange {
                min: 900,
                max: 2200
            }
        );
        assert_eq!(config.concurrency, 4);
        assert!(config.benchmark.url.contains("bcdata.sgs.432"));
    }

    #[test]
    fn test_load_from_path() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "default_top: 25\n")?;

        let config = AppConfig::load_from_path(&path)?;
        assert_eq!(config.default_top, 25);

        let missing = AppConfig::load_from_path(temp_dir.path().join("missing.yaml"));
        assert!(
            missing
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
        Ok(())
    }
}
