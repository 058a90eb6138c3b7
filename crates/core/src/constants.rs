/// Constants used throughout the vaultlink codebase
use std::time::Duration;

// Reference syntax
pub const DEFAULT_REFERENCE_SCHEME: &str = "op";
pub const MAX_REFERENCE_LENGTH: usize = 2048;

// Remote payload limits
pub const DEFAULT_MAX_FIELD_BYTES: usize = 1024 * 1024;

// Batch limits
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

// Environment variable names
pub const VAULTLINK_URL_VAR: &str = "VAULTLINK_URL";
pub const VAULTLINK_TOKEN_VAR: &str = "VAULTLINK_TOKEN";
pub const VAULTLINK_MAX_ATTEMPTS_VAR: &str = "VAULTLINK_MAX_ATTEMPTS";
pub const VAULTLINK_ATTEMPT_TIMEOUT_MS_VAR: &str = "VAULTLINK_ATTEMPT_TIMEOUT_MS";
pub const VAULTLINK_BATCH_TIMEOUT_MS_VAR: &str = "VAULTLINK_BATCH_TIMEOUT_MS";
pub const VAULTLINK_MAX_BATCH_SIZE_VAR: &str = "VAULTLINK_MAX_BATCH_SIZE";
pub const VAULTLINK_LOG_VAR: &str = "VAULTLINK_LOG";

// Configuration key separator used when flattening nested sources
pub const KEY_SEPARATOR: &str = ":";
