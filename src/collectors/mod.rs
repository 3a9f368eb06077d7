/// Access log line decoding
pub mod log_parser;

/// Append-only log file follower
pub mod log_tailer;

pub use log_parser::{has_server_error, parse_line};
pub use log_tailer::LogTailer;
