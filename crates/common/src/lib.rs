#![forbid(unsafe_code)]

mod error;

pub use error::*;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const API_PREFIX: &str = "/api/v1";
pub const DEFAULT_TTL_SECS: u64 = 5 * 60; // 5 min
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 5 * 60; // 5 min
pub const LOG_FILE_NAME: &str = "memorydb.log";
