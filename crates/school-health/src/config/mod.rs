use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::errors::{AppError, AppResult};

pub mod defaults;
pub mod duration_serde;

use defaults::*;
use duration_serde::{duration, parse_default};

/// Environment variable prefix; nested keys are separated by `__`,
/// e.g. `SCHOOL_HEALTH_DATABASE__URL`.
pub const ENV_PREFIX: &str = "SCHOOL_HEALTH_";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout", with = "duration")]
    pub connect_timeout: Duration,
    #[serde(default = "default_acquire_timeout", with = "duration")]
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Empty means any origin
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

/// Tunables for the spreadsheet enrollment import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_import_batch_size")]
    pub batch_size: usize,
    /// Pause between batches to ease pressure on the database
    #[serde(default = "default_import_batch_delay", with = "duration")]
    pub batch_delay: Duration,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
    #[serde(default = "default_abort_error_ratio")]
    pub abort_error_ratio: f64,
    #[serde(default = "default_warn_valid_ratio")]
    pub warn_valid_ratio: f64,
    #[serde(default = "default_warn_row_count")]
    pub warn_row_count: usize,
    #[serde(default = "default_min_school_year")]
    pub min_school_year: i32,
    #[serde(default = "default_school_code_floor")]
    pub school_code_floor: i64,
    #[serde(default = "default_school_code_max_attempts")]
    pub school_code_max_attempts: u32,
    #[serde(default = "default_progress_channel_capacity")]
    pub progress_channel_capacity: usize,
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_min_connections() -> u32 {
    DEFAULT_MIN_CONNECTIONS
}

fn default_connect_timeout() -> Duration {
    parse_default(DEFAULT_CONNECT_TIMEOUT)
}

fn default_acquire_timeout() -> Duration {
    parse_default(DEFAULT_ACQUIRE_TIMEOUT)
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_import_batch_size() -> usize {
    DEFAULT_IMPORT_BATCH_SIZE
}

fn default_import_batch_delay() -> Duration {
    parse_default(DEFAULT_IMPORT_BATCH_DELAY)
}

fn default_max_file_size() -> usize {
    DEFAULT_MAX_FILE_SIZE
}

fn default_abort_error_ratio() -> f64 {
    DEFAULT_ABORT_ERROR_RATIO
}

fn default_warn_valid_ratio() -> f64 {
    DEFAULT_WARN_VALID_RATIO
}

fn default_warn_row_count() -> usize {
    DEFAULT_WARN_ROW_COUNT
}

fn default_min_school_year() -> i32 {
    DEFAULT_MIN_SCHOOL_YEAR
}

fn default_school_code_floor() -> i64 {
    DEFAULT_SCHOOL_CODE_FLOOR
}

fn default_school_code_max_attempts() -> u32 {
    DEFAULT_SCHOOL_CODE_MAX_ATTEMPTS
}

fn default_progress_channel_capacity() -> usize {
    DEFAULT_PROGRESS_CHANNEL_CAPACITY
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout: default_connect_timeout(),
            acquire_timeout: default_acquire_timeout(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_import_batch_size(),
            batch_delay: default_import_batch_delay(),
            max_file_size: default_max_file_size(),
            abort_error_ratio: default_abort_error_ratio(),
            warn_valid_ratio: default_warn_valid_ratio(),
            warn_row_count: default_warn_row_count(),
            min_school_year: default_min_school_year(),
            school_code_floor: default_school_code_floor(),
            school_code_max_attempts: default_school_code_max_attempts(),
            progress_channel_capacity: default_progress_channel_capacity(),
        }
    }
}

impl Config {
    /// Load configuration layering defaults, the TOML file (if present) and
    /// `SCHOOL_HEALTH_*` environment variables, in that order.
    pub fn load_from_file<P: AsRef<Path>>(config_file: P) -> AppResult<Self> {
        let path = config_file.as_ref();
        if path.exists() {
            info!("Loading configuration from {}", path.display());
        } else {
            info!(
                "Config file {} not found, using defaults and environment",
                path.display()
            );
        }

        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| AppError::configuration(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.import.batch_size == 0 {
            return Err(AppError::configuration("import.batch_size must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.import.abort_error_ratio) {
            return Err(AppError::configuration(
                "import.abort_error_ratio must be between 0 and 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.import.warn_valid_ratio) {
            return Err(AppError::configuration(
                "import.warn_valid_ratio must be between 0 and 1",
            ));
        }
        if self.import.school_code_max_attempts == 0 {
            return Err(AppError::configuration(
                "import.school_code_max_attempts must be at least 1",
            ));
        }
        if self.database.max_connections < self.database.min_connections {
            return Err(AppError::configuration(
                "database.max_connections must not be below database.min_connections",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_import_contract() {
        let config = Config::default();
        assert_eq!(config.import.batch_size, 100);
        assert_eq!(config.import.batch_delay, Duration::from_millis(100));
        assert_eq!(config.import.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.import.school_code_floor, 35_000_000);
        assert_eq!(config.web.port, 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_file(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[database]
url = "sqlite::memory:"

[web]
port = 9090

[import]
batch_size = 25
batch_delay = "0ms"
"#
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.web.port, 9090);
        assert_eq!(config.import.batch_size, 25);
        assert_eq!(config.import.batch_delay, Duration::ZERO);
        // untouched keys keep their defaults
        assert_eq!(config.import.warn_row_count, 5000);
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let mut config = Config::default();
        config.import.batch_size = 0;
        assert!(matches!(
            config.validate(),
            Err(AppError::Configuration { .. })
        ));
    }
}
