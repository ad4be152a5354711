//! Configuration management for the risk prediction service

use crate::error::{Result, RiskApiError};
use crate::models::variant::Variant;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prefix for environment overrides, e.g. `RISK_API__SERVER__PORT=8000`
pub const ENV_PREFIX: &str = "RISK_API";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed by CORS; `"*"` allows any
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Largest accepted request body; larger bodies get a 413
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7000
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

/// Artifact path per model variant
///
/// Every variant except LightGBM is required. Leaving `lightgbm` unset
/// removes its route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelsConfig {
    pub svm: Option<String>,
    pub random_forest: Option<String>,
    pub logistic: Option<String>,
    pub decision_tree: Option<String>,
    pub xgboost: Option<String>,
    pub lightgbm: Option<String>,
}

impl ModelsConfig {
    /// Configured artifact path for a variant
    pub fn path_for(&self, variant: Variant) -> Option<&str> {
        let path = match variant {
            Variant::Svm => &self.svm,
            Variant::RandomForest => &self.random_forest,
            Variant::Logistic => &self.logistic,
            Variant::DecisionTree => &self.decision_tree,
            Variant::XgBoost => &self.xgboost,
            Variant::LightGbm => &self.lightgbm,
        };
        path.as_deref().filter(|p| !p.trim().is_empty())
    }
}

fn default_label_column() -> String {
    "Risk".to_string()
}

/// Where the held-out evaluation data lives
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "layout", rename_all = "lowercase")]
pub enum EvaluationConfig {
    /// Parallel feature and label files correlated by row
    Split {
        features_path: String,
        labels_path: String,
    },
    /// One file with the features plus a label column
    Combined {
        path: String,
        #[serde(default = "default_label_column")]
        label_column: String,
    },
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty, json)
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Pretty,
        }
    }
}

/// Serving metrics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between summary log lines; 0 disables the reporter
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
}

fn default_report_interval() -> u64 {
    60
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: default_report_interval(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path, layered with environment overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_origins"),
            );
        Self::finish(builder.build())
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::finish(
            Config::builder()
                .add_source(File::from_str(toml, FileFormat::Toml))
                .build(),
        )
    }

    fn finish(built: std::result::Result<Config, config::ConfigError>) -> Result<Self> {
        let config: AppConfig = built
            .and_then(Config::try_deserialize)
            .map_err(|e| RiskApiError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = Variant::ALL
            .into_iter()
            .filter(|v| !v.is_optional() && self.models.path_for(*v).is_none())
            .map(Variant::config_key)
            .collect();
        if !missing.is_empty() {
            return Err(RiskApiError::Config(format!(
                "missing artifact path for required models: {}",
                missing.join(", ")
            )));
        }
        if self.server.max_body_bytes == 0 {
            return Err(RiskApiError::Config("server.max_body_bytes must be positive".to_string()));
        }
        if self.server.allowed_origins.is_empty() {
            return Err(RiskApiError::Config(
                "server.allowed_origins must list at least one origin".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                allowed_origins: default_allowed_origins(),
                max_body_bytes: default_max_body_bytes(),
            },
            models: ModelsConfig {
                svm: Some("models/svm.json".to_string()),
                random_forest: Some("models/random_forest.json".to_string()),
                logistic: Some("models/logistic.json".to_string()),
                decision_tree: Some("models/decision_tree.json".to_string()),
                xgboost: Some("models/xgboost.json".to_string()),
                lightgbm: None,
            },
            evaluation: EvaluationConfig::Split {
                features_path: "datasets/X_test.csv".to_string(),
                labels_path: "datasets/y_test.csv".to_string(),
            },
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [server]
        port = 8080
        allowed_origins = ["https://bp-prediction-frontend.onrender.com"]

        [models]
        svm = "models/svm.json"
        random_forest = "models/rf.json"
        logistic = "models/logistic.json"
        decision_tree = "models/tree.json"
        xgboost = "models/xgb.json"

        [evaluation]
        layout = "split"
        features_path = "datasets/X_test.csv"
        labels_path = "datasets/y_test.csv"

        [logging]
        format = "json"
    "#;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.allowed_origins, vec!["*"]);
        assert_eq!(config.server.max_body_bytes, 2 * 1024 * 1024);
        assert!(config.models.path_for(Variant::LightGbm).is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_body_limit_rejected() {
        let mut config = AppConfig::default();
        config.server.max_body_bytes = 0;
        assert!(matches!(config.validate(), Err(RiskApiError::Config(_))));
    }

    #[test]
    fn test_parse_toml() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.models.path_for(Variant::RandomForest), Some("models/rf.json"));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.metrics.report_interval_secs, 60);
        assert_eq!(
            config.evaluation,
            EvaluationConfig::Split {
                features_path: "datasets/X_test.csv".to_string(),
                labels_path: "datasets/y_test.csv".to_string(),
            }
        );
    }

    #[test]
    fn test_combined_layout_defaults_label_column() {
        let (head, _) = SAMPLE.split_once("[evaluation]").unwrap();
        let toml = format!(
            "{}[evaluation]\nlayout = \"combined\"\npath = \"datasets/cleaned_df.csv\"\n",
            head
        );
        let config = AppConfig::from_toml_str(&toml).unwrap();
        assert_eq!(
            config.evaluation,
            EvaluationConfig::Combined {
                path: "datasets/cleaned_df.csv".to_string(),
                label_column: "Risk".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_required_model() {
        let toml = SAMPLE.replace("xgboost = \"models/xgb.json\"", "");
        let err = AppConfig::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, RiskApiError::Config(ref msg) if msg.contains("xgboost")));
    }

    #[test]
    fn test_blank_optional_path_disables_variant() {
        let mut models = AppConfig::default().models;
        models.lightgbm = Some("  ".to_string());
        assert!(models.path_for(Variant::LightGbm).is_none());
    }
}
