use thiserror::Error;

/// Errors that can occur while decoding a single access log line
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Log entry is not a JSON object")]
    NotAnObject,
}

/// Errors that can occur while tailing the access log
#[derive(Error, Debug)]
pub enum TailError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Stopped before the log file became available")]
    Stopped,
}

/// Errors that can occur when delivering alerts
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Webhook returned status {0}")]
    HttpStatus(u16),

    #[error("Webhook request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Failed to build delivery runtime: {0}")]
    RuntimeError(String),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}
