//! Access log line decoding
//!
//! Each line written by the proxy is an independent JSON object. Only two keys
//! matter here: `pool` (the backend pool that served the request) and
//! `upstream_status` (one status per upstream attempt, joined with `", "`).

use crate::error::ParseError;
use crate::events::LogEvent;
use log::debug;
use serde_json::Value;

/// Separator the proxy uses between upstream attempts
const UPSTREAM_SEPARATOR: &str = ", ";

impl LogEvent {
    /// Decode one access log line
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the line is not a JSON object.
    ///
    /// # Examples
    ///
    /// ```
    /// use poolwatch::events::LogEvent;
    ///
    /// let event = LogEvent::from_json(r#"{"pool":"green","upstream_status":"502, 200"}"#).unwrap();
    /// assert_eq!(event.pool.as_deref(), Some("green"));
    /// assert!(event.had_error);
    /// ```
    pub fn from_json(line: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(line.trim())
            .map_err(|e| ParseError::InvalidJson(e.to_string()))?;
        let entry = value.as_object().ok_or(ParseError::NotAnObject)?;

        let pool = entry
            .get("pool")
            .and_then(Value::as_str)
            .filter(|pool| !pool.is_empty())
            .map(str::to_string);

        let had_error = match entry.get("upstream_status") {
            Some(Value::String(status)) => has_server_error(status),
            Some(Value::Number(status)) => has_server_error(&status.to_string()),
            _ => false,
        };

        Ok(Self { pool, had_error })
    }
}

/// Whether any upstream attempt in `upstream_status` was a 5xx
///
/// Only the leading character of each token is inspected, so anything
/// starting with `5` counts, numeric or not.
pub fn has_server_error(upstream_status: &str) -> bool {
    upstream_status
        .split(UPSTREAM_SEPARATOR)
        .filter(|token| !token.trim().is_empty())
        .any(|token| token.starts_with('5'))
}

/// Decode a line, logging and discarding malformed input
pub fn parse_line(line: &str) -> Option<LogEvent> {
    match LogEvent::from_json(line) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!("Skipping malformed log entry '{}': {}", line, e);
            None
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[quickcheck]
    fn prop_parser_never_panics(line: String) -> bool {
        let _ = parse_line(&line);
        true
    }

    #[quickcheck]
    fn prop_status_codes_detected(codes: Vec<u16>) -> bool {
        let codes: Vec<u16> = codes.into_iter().map(|code| 100 + code % 500).collect();
        let joined = codes
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let line = serde_json::json!({ "pool": "blue", "upstream_status": joined }).to_string();

        let expected = codes.iter().any(|code| (500..600).contains(code));
        parse_line(&line).map(|event| event.had_error) == Some(expected)
    }
}
