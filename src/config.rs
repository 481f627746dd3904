use chrono::NaiveDate;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::env as std_env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_DATABASE_URL: &str = "sqlite://slotter.db?mode=rwc";
const DEFAULT_COMPLETED_DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_MAX_FILE_BYTES: usize = 50 * 1024 * 1024;

/// Column headers (canonical form) that describe the transaction itself.
/// Every other header in an uploaded file is a location-hierarchy column.
pub const DEFAULT_KNOWN_COLUMNS: [&str; 9] = [
    "id",
    "transaction type",
    "order number",
    "item number",
    "description",
    "transaction quantity",
    "completed date",
    "completed by",
    "completed quantity",
];

/// Settings for the ingestion pipeline
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Canonical (trimmed, lower-case) names of the fixed transaction columns
    #[serde(default = "default_known_columns")]
    #[validate(custom = "validate_known_columns")]
    pub known_columns: Vec<String>,

    /// chrono format string used for the "completed date" column
    #[serde(default = "default_completed_date_format")]
    #[validate(custom = "validate_date_format")]
    pub completed_date_format: String,

    /// Upper bound on the size of an uploaded file
    #[serde(default = "default_max_file_bytes")]
    #[validate(range(min = 1))]
    pub max_file_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            known_columns: default_known_columns(),
            completed_date_format: default_completed_date_format(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Application environment
    #[validate(length(min = 1))]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Ingestion pipeline settings
    #[serde(default)]
    #[validate]
    pub ingest: IngestConfig,
}

impl AppConfig {
    /// Creates a new configuration with defaults for everything but the database and environment
    pub fn new(database_url: String, environment: String) -> Self {
        Self {
            database_url,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            ingest: IngestConfig::default(),
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections must not exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if self.is_production() && self.database_url.starts_with("sqlite:") {
            let mut err = ValidationError::new("database_url");
            err.message = Some("SQLite is not supported in production; set APP__DATABASE_URL".into());
            errors.add("database_url", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] ConfigError),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_known_columns() -> Vec<String> {
    DEFAULT_KNOWN_COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn default_completed_date_format() -> String {
    DEFAULT_COMPLETED_DATE_FORMAT.to_string()
}

fn default_max_file_bytes() -> usize {
    DEFAULT_MAX_FILE_BYTES
}

fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_event_channel_capacity() -> usize {
    256
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => {
            let mut err = ValidationError::new("log_level");
            err.message = Some("log_level must be one of trace, debug, info, warn, error".into());
            Err(err)
        }
    }
}

fn validate_known_columns(columns: &Vec<String>) -> Result<(), ValidationError> {
    if columns.is_empty() {
        let mut err = ValidationError::new("known_columns");
        err.message = Some("known_columns must name at least one column".into());
        return Err(err);
    }
    if columns
        .iter()
        .any(|c| c.trim().is_empty() || *c != c.trim().to_lowercase())
    {
        let mut err = ValidationError::new("known_columns");
        err.message = Some("known_columns must be trimmed, lower-case and non-empty".into());
        return Err(err);
    }
    Ok(())
}

fn validate_date_format(format: &str) -> Result<(), ValidationError> {
    let Some(sample) = NaiveDate::from_ymd_opt(2024, 1, 5) else {
        return Ok(());
    };
    let rendered = sample.format(format).to_string();
    match NaiveDate::parse_from_str(&rendered, format) {
        Ok(parsed) if parsed == sample => Ok(()),
        _ => {
            let mut err = ValidationError::new("completed_date_format");
            err.message = Some("completed_date_format must round-trip a full date".into());
            Err(err)
        }
    }
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("event_channel_capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("slotter_ingest={},sea_orm=warn", level);
    let filter_directive = std_env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Loads configuration rooted at an explicit config directory
pub fn load_config_from(config_dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let dir = config_dir.display();
    let config = Config::builder()
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", dir)).required(false))
        .add_source(File::with_name(&format!("{}/{}", dir, run_env)).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("ingest.known_columns")
                .try_parsing(true),
        )
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration constraint validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
