use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Prefix for environment overrides; nesting uses `__`
pub const ENV_PREFIX: &str = "HOOKRELAY_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid timeout_ms: {0}. Must be at least 1")]
    InvalidTimeout(u64),

    #[error("blocking_exit_codes cannot be empty")]
    EmptyBlockingCodes,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid decision backend timeout_ms: {0}. Must be at least 1")]
    InvalidBackendTimeout(u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .hookrelay/config.yaml (project config)
    /// 3. .hookrelay/local.yaml (local overrides, optional)
    /// 4. Environment variables (HOOKRELAY_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Same as [`ConfigLoader::load`], rooted at `project_dir`
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Config> {
        let root = project_dir.as_ref().join(".hookrelay");
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(root.join("config.yaml")))
            .merge(Yaml::file(root.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.defaults.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(config.defaults.timeout_ms));
        }

        if config.defaults.blocking_exit_codes.is_empty() {
            return Err(ConfigError::EmptyBlockingCodes);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let backend = &config.decision_backend;
        if backend.timeout_ms == 0 {
            return Err(ConfigError::InvalidBackendTimeout(backend.timeout_ms));
        }
        if backend.enabled {
            if backend.model.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "decision_backend.model cannot be empty".to_string(),
                ));
            }
            if backend.base_url.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "decision_backend.base_url cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.defaults.timeout_ms, 30_000);
        assert_eq!(config.defaults.backoff_step_ms, 1_000);
        assert_eq!(config.defaults.blocking_exit_codes, vec![2]);
        assert!(!config.defaults.parallel);
        assert!(!config.defaults.continue_on_error);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
defaults:
  timeout_ms: 5000
  retry: 2
  parallel: true
logging:
  level: debug
  format: json
decision_backend:
  model: claude-sonnet
hook_files:
  - hooks/a.yaml
  - hooks/b.yaml
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.defaults.timeout_ms, 5000);
        assert_eq!(config.defaults.retry, 2);
        assert!(config.defaults.parallel);
        assert_eq!(config.defaults.blocking_exit_codes, vec![2]);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.decision_backend.model, "claude-sonnet");
        assert_eq!(config.decision_backend.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.hook_files.len(), 2);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.defaults.timeout_ms = 0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidTimeout(0))
        ));
    }

    #[test]
    fn test_validate_empty_blocking_codes() {
        let mut config = Config::default();
        config.defaults.blocking_exit_codes.clear();

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyBlockingCodes)
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }

    #[test]
    fn test_validate_backend_fields() {
        let mut config = Config::default();
        config.decision_backend.model = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ValidationFailed(_))
        ));

        // A disabled backend is not checked for model/base url
        config.decision_backend.enabled = false;
        assert!(ConfigLoader::validate(&config).is_ok());

        config.decision_backend.timeout_ms = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackendTimeout(0))
        ));
    }

    #[test]
    fn test_env_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "defaults:\n  timeout_ms: 5000\n  retry: 1").unwrap();
        file.flush().unwrap();

        let config = temp_env::with_vars(
            [
                ("HOOKRELAY_DEFAULTS__RETRY", Some("4")),
                ("HOOKRELAY_LOGGING__LEVEL", Some("debug")),
            ],
            || ConfigLoader::load_from_file(file.path()),
        )
        .unwrap();

        assert_eq!(config.defaults.timeout_ms, 5000, "File value should persist");
        assert_eq!(config.defaults.retry, 4, "Env should win over the file");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_hierarchical_merging() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join(".hookrelay");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(
            root.join("config.yaml"),
            "defaults:\n  timeout_ms: 1000\nlogging:\n  level: info\n  format: json\n",
        )
        .unwrap();
        std::fs::write(root.join("local.yaml"), "logging:\n  level: debug\n").unwrap();

        let config = ConfigLoader::load_from_dir(dir.path()).unwrap();

        assert_eq!(config.defaults.timeout_ms, 1000);
        assert_eq!(
            config.logging.level, "debug",
            "Override should win for nested fields"
        );
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
    }

    #[test]
    fn test_invalid_file_config_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "logging:\n  format: xml").unwrap();
        file.flush().unwrap();

        let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("xml"));
    }
}
