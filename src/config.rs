//! Configuration management for the review-risk pipeline

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
/// Environment variable that overrides the configuration file location
pub const CONFIG_PATH_ENV: &str = "REVIEW_RISK_CONFIG";
/// Prefix for per-key environment overrides, e.g. `REVIEW_RISK__NATS__URL`
pub const ENV_PREFIX: &str = "REVIEW_RISK";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub explanation: ExplanationConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming order records
    pub request_subject: String,
    /// Subject for results when the request carries no reply subject
    pub result_subject: String,
    /// Queue group shared by service instances (unset = every instance sees every request)
    #[serde(default)]
    pub queue_group: Option<String>,
}

/// Trained artifact locations
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Tree-ensemble model file
    pub model_path: String,
    /// Training median table
    pub medians_path: String,
    /// Ordered feature name list
    pub contract_path: String,
}

/// Explanation output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExplanationConfig {
    /// Number of reasons published per result (0 = all)
    #[serde(default = "default_top_reasons")]
    pub top_reasons: usize,
}

fn default_top_reasons() -> usize {
    5
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            top_reasons: default_top_reasons(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of requests processed concurrently
    pub workers: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from `REVIEW_RISK_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path, layered with environment overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true);
        Self::load_with_env(path, env)
    }

    fn load_with_env<P: AsRef<Path>>(path: P, env: Environment) -> Result<Self> {
        let path = path.as_ref();
        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to build configuration from {}", path.display()))?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.workers == 0 {
            bail!("pipeline.workers must be at least 1");
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            bail!("logging.format must be \"json\" or \"pretty\", got {:?}", self.logging.format);
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                request_subject: "reviews.predict".to_string(),
                result_subject: "reviews.predictions".to_string(),
                queue_group: Some("review-risk".to_string()),
            },
            artifacts: ArtifactsConfig {
                model_path: "artifacts/review_model.json".to_string(),
                medians_path: "artifacts/feature_medians.json".to_string(),
                contract_path: "artifacts/feature_contract.json".to_string(),
            },
            explanation: ExplanationConfig::default(),
            pipeline: PipelineConfig { workers: 4 },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn shipped_config() -> String {
        format!("{}/{}", env!("CARGO_MANIFEST_DIR"), DEFAULT_CONFIG_PATH)
    }

    fn no_env() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .source(Some(HashMap::new()))
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.explanation.top_reasons, 5);
        assert_eq!(config.pipeline.workers, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shipped_file_matches_default() {
        let loaded = AppConfig::load_with_env(shipped_config(), no_env()).unwrap();
        let default = AppConfig::default();

        assert_eq!(loaded.nats.request_subject, default.nats.request_subject);
        assert_eq!(loaded.nats.result_subject, default.nats.result_subject);
        assert_eq!(loaded.nats.queue_group, default.nats.queue_group);
        assert_eq!(loaded.artifacts.model_path, default.artifacts.model_path);
        assert_eq!(loaded.artifacts.medians_path, default.artifacts.medians_path);
        assert_eq!(loaded.artifacts.contract_path, default.artifacts.contract_path);
        assert_eq!(loaded.explanation.top_reasons, default.explanation.top_reasons);
        assert_eq!(loaded.pipeline.workers, default.pipeline.workers);
        assert_eq!(loaded.logging.format, default.logging.format);
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut vars = HashMap::new();
        vars.insert("REVIEW_RISK__NATS__URL".to_string(), "nats://broker:4222".to_string());
        vars.insert("REVIEW_RISK__PIPELINE__WORKERS".to_string(), "16".to_string());
        let env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .source(Some(vars));

        let config = AppConfig::load_with_env(shipped_config(), env).unwrap();
        assert_eq!(config.nats.url, "nats://broker:4222");
        assert_eq!(config.pipeline.workers, 16);
    }

    #[test]
    fn test_missing_explanation_section_uses_default() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[nats]
url = "nats://localhost:4222"
request_subject = "in"
result_subject = "out"

[artifacts]
model_path = "m.json"
medians_path = "med.json"
contract_path = "c.json"

[pipeline]
workers = 2

[logging]
level = "debug"
format = "pretty"
"#
        )
        .unwrap();

        let config = AppConfig::load_with_env(file.path(), no_env()).unwrap();
        assert_eq!(config.explanation.top_reasons, 5);
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.nats.queue_group, None);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = AppConfig::default();
        config.pipeline.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(AppConfig::load_with_env("/nonexistent/config.toml", no_env()).is_err());
    }
}
