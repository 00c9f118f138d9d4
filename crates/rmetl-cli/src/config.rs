//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global configuration for rmetl
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub output: OutputConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub resource: String,
    pub timeout_secs: u64,
    pub page_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://rickandmortyapi.com/api/".to_string(),
            resource: "character".to_string(),
            timeout_secs: 10,
            page_delay_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    #[serde(deserialize_with = "deserialize_env_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/characters.duckdb"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_path: PathBuf::from("characters.json"),
            csv_path: PathBuf::from("characters.csv"),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Trim names and title-case species before writing
    pub clean: bool,
}

/// Deserialize a path that may be an environment variable reference like ${VAR}
fn deserialize_env_path<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    expand_env_var(&raw)
        .map(PathBuf::from)
        .ok_or_else(|| serde::de::Error::custom(format!("environment variable in {raw} is not set")))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./rmetl.toml (current directory)
    /// 2. ~/.config/rmetl/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("rmetl.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "rmetl") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Settings for the character pipeline
    pub fn characters(&self) -> rmetl_characters::Config {
        rmetl_characters::Config {
            base_url: self.api.base_url.clone(),
            resource: self.api.resource.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
            page_delay: Duration::from_millis(self.api.page_delay_ms),
            clean: self.pipeline.clean,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.api.page_delay_ms, 100);
        assert_eq!(
            config.database.path,
            PathBuf::from("./data/characters.duckdb")
        );
        assert_eq!(config.output.csv_path, PathBuf::from("characters.csv"));
        assert!(!config.pipeline.clean);
    }

    #[test]
    fn characters_config_matches_defaults() {
        let pipeline = Config::default().characters();
        let expected = rmetl_characters::Config::default();
        assert_eq!(pipeline.base_url, expected.base_url);
        assert_eq!(pipeline.resource, expected.resource);
        assert_eq!(pipeline.timeout, expected.timeout);
        assert_eq!(pipeline.page_delay, expected.page_delay);
    }

    #[test]
    fn expand_env_var_simple() {
        std::env::set_var("RMETL_TEST_DB", "/srv/rmetl/characters.duckdb");
        assert_eq!(
            expand_env_var("${RMETL_TEST_DB}"),
            Some("/srv/rmetl/characters.duckdb".to_string())
        );
        std::env::remove_var("RMETL_TEST_DB");
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_env_var("literal"), Some("literal".to_string()));
    }

    #[test]
    fn expand_env_var_missing() {
        assert_eq!(expand_env_var("${NONEXISTENT_VAR_12345}"), None);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[api]
base_url = "http://localhost:8080/api/"
page_delay_ms = 0

[database]
path = "/tmp/rm.duckdb"

[pipeline]
clean = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080/api/");
        assert_eq!(config.api.resource, "character");
        assert_eq!(config.api.page_delay_ms, 0);
        assert_eq!(config.database.path, PathBuf::from("/tmp/rm.duckdb"));
        assert_eq!(config.output.json_path, PathBuf::from("characters.json"));
        assert!(config.pipeline.clean);
    }

    #[test]
    fn unset_env_path_is_parse_error() {
        let toml = r#"
[database]
path = "${NONEXISTENT_VAR_67890}"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("rmetl.toml");
        std::fs::write(&path, "[output]\ncsv_path = \"out/chars.csv\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.output.csv_path, PathBuf::from("out/chars.csv"));
    }

    #[test]
    fn from_file_missing_is_error() {
        let err = Config::from_file(Path::new("/nonexistent/rmetl.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
