//! Configuration management
//!
//! One YAML document with `engine`, `browser` and `extraction` sections. The
//! first file found wins: an explicit path, `./config/config.yaml`, then the
//! user config directory; built-in defaults apply when none exists.
//! Environment overrides are layered on top after loading.

use action_flow::{parse_truthy, EngineConfig};
use cdp_adapter::CdpConfig;
use serde::{Deserialize, Serialize};
use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

pub const LOCAL_CONFIG_PATH: &str = "config/config.yaml";
pub const APP_DIR_NAME: &str = "semantic-replay";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path} does not exist")]
    Missing { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value '{value}' for {key}")]
    InvalidOverride { key: String, value: String },
}

/// Application configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub browser: CdpConfig,
    pub extraction: ExtractionConfig,
}

/// Settings for the language-model extraction client
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub enabled: bool,
    /// OpenAI-compatible API root, e.g. `https://api.openai.com/v1`
    pub api_base: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Page text is cut to this many characters before it is sent
    pub max_content_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
            max_content_chars: 20_000,
        }
    }
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// API key from the configured environment variable, if set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        env::var(&self.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

/// Configuration plus the file it came from
#[derive(Clone, Debug)]
pub struct LoadedConfig {
    pub config: Config,
    pub path: Option<PathBuf>,
}

impl Config {
    /// Parse a YAML document; an empty document yields the defaults.
    pub fn from_yaml(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Apply `REPLAY_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = get("REPLAY_HEADLESS") {
            self.browser.headless =
                parse_truthy(&value).ok_or_else(|| ConfigError::InvalidOverride {
                    key: "REPLAY_HEADLESS".to_string(),
                    value: value.clone(),
                })?;
            debug!(headless = self.browser.headless, "REPLAY_HEADLESS override");
        }
        if let Some(value) = get("REPLAY_CHROME") {
            self.browser.executable = Some(PathBuf::from(value));
        }
        if let Some(value) = get("REPLAY_MAX_RETRIES") {
            self.engine.max_retries = parse_number("REPLAY_MAX_RETRIES", &value)?;
        }
        if let Some(value) = get("REPLAY_MAX_GLOBAL_FAILURES") {
            self.engine.max_global_failures = parse_number("REPLAY_MAX_GLOBAL_FAILURES", &value)?;
        }
        if let Some(value) = get("REPLAY_EXTRACTION_MODEL") {
            self.extraction.model = value;
        }
        if let Some(value) = get("REPLAY_EXTRACTION_API_BASE") {
            self.extraction.api_base = value;
        }
        Ok(())
    }

    /// Every limit the configuration violates.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = self.engine.problems();
        problems.extend(self.browser.problems());
        if self.extraction.enabled {
            if self.extraction.timeout_secs == 0 {
                problems.push("extraction.timeout_secs must be greater than zero".to_string());
            }
            if self.extraction.max_content_chars == 0 {
                problems.push("extraction.max_content_chars must be greater than zero".to_string());
            }
            if self.extraction.model.trim().is_empty() {
                problems.push("extraction.model must not be empty".to_string());
            }
            if url::Url::parse(&self.extraction.api_base).is_err() {
                problems.push(format!(
                    "extraction.api_base '{}' is not a valid URL",
                    self.extraction.api_base
                ));
            }
        }
        problems
    }
}

fn parse_number(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Candidate config files in priority order, not counting an explicit path.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_PATH)];
    if let Some(mut dir) = dirs::config_dir() {
        dir.push(APP_DIR_NAME);
        dir.push("config.yaml");
        paths.push(dir);
    }
    paths
}

/// Load configuration and apply environment overrides.
///
/// An explicit path must exist. Without one, the first existing default
/// location is used, else the built-in defaults.
pub async fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let path = match explicit {
        Some(path) => {
            if !fs::try_exists(path).await.unwrap_or(false) {
                return Err(ConfigError::Missing {
                    path: path.to_path_buf(),
                });
            }
            Some(path.to_path_buf())
        }
        None => first_existing(default_config_paths()).await,
    };

    let mut config = match &path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
            let config = Config::from_yaml(&raw, path)?;
            info!(path = %path.display(), "Loaded configuration");
            config
        }
        None => {
            debug!("No configuration file found; using defaults");
            Config::default()
        }
    };
    config.apply_env_overrides()?;
    Ok(LoadedConfig { config, path })
}

async fn first_existing(paths: Vec<PathBuf>) -> Option<PathBuf> {
    for path in paths {
        if fs::try_exists(&path).await.unwrap_or(false) {
            return Some(path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let raw = "engine:\n  max_retries: 5\nbrowser:\n  headless: false\n";
        let config = Config::from_yaml(raw, Path::new("test.yaml")).unwrap();
        assert_eq!(config.engine.max_retries, 5);
        assert_eq!(config.engine.max_global_failures, 5);
        assert!(!config.browser.headless);
        assert_eq!(config.extraction.model, "gpt-4o-mini");
        assert!(config.problems().is_empty());
    }

    #[test]
    fn empty_document_is_default() {
        let config = Config::from_yaml("  \n", Path::new("empty.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn malformed_yaml_reports_path() {
        let err = Config::from_yaml("engine: [1, 2", Path::new("bad.yaml")).unwrap_err();
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn overrides_apply_on_top() {
        let vars: HashMap<&str, &str> = [
            ("REPLAY_HEADLESS", "no"),
            ("REPLAY_MAX_RETRIES", "7"),
            ("REPLAY_EXTRACTION_MODEL", "local-model"),
            ("REPLAY_EXTRACTION_API_BASE", "http://localhost:8080/v1"),
            ("REPLAY_CHROME", ""),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert!(!config.browser.headless);
        assert_eq!(config.engine.max_retries, 7);
        assert_eq!(config.extraction.model, "local-model");
        assert_eq!(config.extraction.api_base, "http://localhost:8080/v1");
        assert_eq!(config.browser.executable, None);
    }

    #[test]
    fn rejects_non_numeric_override() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|key| (key == "REPLAY_MAX_GLOBAL_FAILURES").then(|| "many".into()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { .. }));
    }

    #[test]
    fn flags_limit_violations() {
        let mut config = Config::default();
        config.engine.max_retries = 11;
        config.extraction.timeout_secs = 0;
        config.extraction.api_base = "not a url".to_string();
        let problems = config.problems();
        assert_eq!(problems.len(), 3, "{:?}", problems);
    }

    #[tokio::test]
    async fn explicit_path_must_exist() {
        let err = load_config(Some(Path::new("/nonexistent/replay.yaml")))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
    }

    #[tokio::test]
    async fn loads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.yaml");
        std::fs::write(&path, "engine:\n  retry_delay_ms: 10\n").unwrap();
        let loaded = load_config(Some(&path)).await.unwrap();
        assert_eq!(loaded.config.engine.retry_delay_ms, 10);
        assert_eq!(loaded.path.as_deref(), Some(path.as_path()));
    }
}
