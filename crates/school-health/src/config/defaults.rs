/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Database defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./school_health.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_CONNECT_TIMEOUT: &str = "5s";
pub const DEFAULT_ACQUIRE_TIMEOUT: &str = "3s";

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

// Import defaults
pub const DEFAULT_IMPORT_BATCH_SIZE: usize = 100;
pub const DEFAULT_IMPORT_BATCH_DELAY: &str = "100ms";
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
/// Share of failed rows above which a run aborts before writing
pub const DEFAULT_ABORT_ERROR_RATIO: f64 = 0.5;
/// Share of valid rows below which the validation gate warns
pub const DEFAULT_WARN_VALID_RATIO: f64 = 0.8;
pub const DEFAULT_WARN_ROW_COUNT: usize = 5000;
pub const DEFAULT_MIN_SCHOOL_YEAR: i32 = 2000;
/// First code handed out when no school exists yet
pub const DEFAULT_SCHOOL_CODE_FLOOR: i64 = 35_000_000;
pub const DEFAULT_SCHOOL_CODE_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_PROGRESS_CHANNEL_CAPACITY: usize = 1024;
