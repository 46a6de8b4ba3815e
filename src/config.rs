use std::path::PathBuf;

use config::{Config, Environment, File};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use validator::{Validate, ValidationError};

use crate::error::AppError;
use crate::models::PerformanceThresholds;

static LOG_LEVEL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(trace|debug|info|warn|error|TRACE|DEBUG|INFO|WARN|ERROR)$")
        .expect("Invalid regex pattern")
});

#[derive(Debug, Clone, Validate, Deserialize)]
pub struct AppConfig {
    #[validate(nested)]
    pub app: AppMetadata,

    #[validate(nested)]
    pub observability: ObservabilityConfig,

    #[validate(nested)]
    pub analytics: AnalyticsConfig,

    #[validate(nested)]
    pub dataset: DatasetConfig,

    #[serde(default = "default_environment")]
    #[serde(skip)]
    pub environment: EnvironmentType,
}

#[derive(Debug, Clone, Validate, Deserialize)]
pub struct AppMetadata {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(min = 1, max = 20))]
    pub version: String,
}

#[derive(Debug, Clone, Validate, Deserialize)]
pub struct ObservabilityConfig {
    #[validate(custom(function = "validate_log_level"))]
    pub log_level: String,

    #[serde(default = "default_false")]
    pub json_logs: bool,
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    if LOG_LEVEL_REGEX.is_match(level) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

/// Thresholds behind the summary counters. Numbers may arrive as strings from
/// `APP__ANALYTICS__*` variables.
#[derive(Debug, Clone, Validate, Deserialize)]
pub struct AnalyticsConfig {
    #[validate(range(min = 0.0))]
    #[serde(default = "default_best_selling_min_frequency")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub best_selling_min_frequency: f64,

    #[validate(range(min = 0.0))]
    #[serde(default = "default_slow_moving_max_frequency")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub slow_moving_max_frequency: f64,

    #[validate(range(min = 1, max = 3650))]
    #[serde(default = "default_dead_stock_days")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub dead_stock_days: i64,
}

impl AnalyticsConfig {
    pub fn thresholds(&self) -> PerformanceThresholds {
        PerformanceThresholds {
            best_selling_min_frequency: self.best_selling_min_frequency,
            slow_moving_max_frequency: self.slow_moving_max_frequency,
            dead_stock_days: self.dead_stock_days,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            best_selling_min_frequency: default_best_selling_min_frequency(),
            slow_moving_max_frequency: default_slow_moving_max_frequency(),
            dead_stock_days: default_dead_stock_days(),
        }
    }
}

#[derive(Debug, Clone, Validate, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_dataset_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum EnvironmentType {
    #[serde(rename = "development")]
    Development,
    #[serde(rename = "staging")]
    Staging,
    #[serde(rename = "production")]
    Production,
    #[serde(rename = "test")]
    Test,
}

impl EnvironmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
            Self::Test => "test",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "staging" | "stg" => Self::Staging,
            "test" | "testing" => Self::Test,
            _ => Self::Development,
        }
    }
}

fn default_environment() -> EnvironmentType {
    EnvironmentType::Development
}

fn default_false() -> bool {
    false
}

fn default_best_selling_min_frequency() -> f64 {
    1.0
}

fn default_slow_moving_max_frequency() -> f64 {
    0.5
}

fn default_dead_stock_days() -> i64 {
    30
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/sales.json")
}

pub fn load_config() -> Result<AppConfig, AppError> {
    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());
    let env_type = EnvironmentType::parse(&environment);

    tracing::info!(
        "Loading configuration for environment: {}",
        env_type.as_str()
    );

    let config = Config::builder()
        .set_default("app.name", "sales-performance")
        .and_then(|b| b.set_default("app.version", env!("CARGO_PKG_VERSION")))
        .and_then(|b| b.set_default("observability.log_level", "info"))
        .and_then(|b| b.set_default("analytics.best_selling_min_frequency", 1.0))
        .and_then(|b| b.set_default("analytics.slow_moving_max_frequency", 0.5))
        .and_then(|b| b.set_default("analytics.dead_stock_days", 30_i64))
        .and_then(|b| b.set_default("dataset.path", "data/sales.json"))
        .map_err(|e| AppError::ConfigError(e.to_string()))?
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{}", env_type.as_str())).required(false))
        .add_source(File::with_name("config/local").required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .map_err(|e| AppError::ConfigError(format!("Failed to build config: {}", e)))?;

    let mut app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| AppError::ConfigError(format!("Failed to deserialize config: {}", e)))?;

    app_config.environment = env_type;

    app_config
        .validate()
        .map_err(|e| AppError::ConfigError(format!("Configuration validation failed: {}", e)))?;

    validate_business_rules(&app_config)?;

    log_config_loaded(&app_config);

    Ok(app_config)
}

fn validate_business_rules(config: &AppConfig) -> Result<(), AppError> {
    let analytics = &config.analytics;

    if analytics.slow_moving_max_frequency > analytics.best_selling_min_frequency {
        return Err(AppError::ConfigError(
            "analytics.slow_moving_max_frequency must not exceed \
             analytics.best_selling_min_frequency"
                .into(),
        ));
    }

    if config.environment.is_production() && !config.observability.json_logs {
        tracing::warn!("Plain-text logs configured in production; JSON logs are recommended");
    }

    Ok(())
}

fn log_config_loaded(config: &AppConfig) {
    tracing::info!(
        environment = %config.environment.as_str(),
        log_level = %config.observability.log_level,
        best_selling_min_frequency = %config.analytics.best_selling_min_frequency,
        slow_moving_max_frequency = %config.analytics.slow_moving_max_frequency,
        dead_stock_days = %config.analytics.dead_stock_days,
        dataset = %config.dataset.path.display(),
        "Configuration loaded successfully"
    );
}
