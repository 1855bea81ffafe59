//! Runtime parsing utilities for LSF run limits (`-W` / `-We`).

use std::time::Duration;
use thiserror::Error;

/// Largest minute count LSF accepts in the bare-minutes form.
pub const MAX_MINUTES: u64 = 59_999;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeParseError {
    #[error("runtime is empty")]
    Empty,
    #[error("runtime must be in format MM or HH:MM, got \"{0}\"")]
    Format(String),
    #[error("minutes in HH:MM must be below 60, got {0}")]
    MinutesOutOfRange(u64),
    #[error("minutes cannot exceed 59999, got {0}")]
    TooLong(u64),
}

/// Parse an LSF runtime limit.
///
/// Supports:
/// - HH:MM (one to three hour digits, two minute digits)
/// - MM (bare minutes, up to five digits)
pub fn parse_runtime(s: &str) -> Result<Duration, RuntimeParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(RuntimeParseError::Empty);
    }

    if let Some((hours, minutes)) = s.split_once(':') {
        let hours =
            parse_digits(hours, 1, 3).ok_or_else(|| RuntimeParseError::Format(s.to_string()))?;
        let minutes =
            parse_digits(minutes, 2, 2).ok_or_else(|| RuntimeParseError::Format(s.to_string()))?;
        if minutes >= 60 {
            return Err(RuntimeParseError::MinutesOutOfRange(minutes));
        }
        return Ok(Duration::from_secs(hours * 3600 + minutes * 60));
    }

    let minutes = parse_digits(s, 1, 5).ok_or_else(|| RuntimeParseError::Format(s.to_string()))?;
    if minutes > MAX_MINUTES {
        return Err(RuntimeParseError::TooLong(minutes));
    }
    Ok(Duration::from_secs(minutes * 60))
}

/// Parse a run of ASCII digits whose length is within `min..=max`.
fn parse_digits(s: &str, min: usize, max: usize) -> Option<u64> {
    if s.len() < min || s.len() > max || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Format seconds as LSF duration format (H:MM for resource limits).
pub fn format_duration_lsf(seconds: u64) -> String {
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    format!("{}:{:02}", hours, mins)
}

/// Normalized `-W` rendering of a parsed runtime.
pub fn format_runtime(runtime: Duration) -> String {
    format_duration_lsf(runtime.as_secs())
}

/// Runtime as fractional hours, for cost arithmetic.
pub fn runtime_hours(runtime: Duration) -> f64 {
    runtime.as_secs() as f64 / 3600.0
}

/// Human-readable runtime (e.g., "48 hours", "1h 30m", "45 minutes").
pub fn describe_runtime(runtime: Duration) -> String {
    let total_minutes = runtime.as_secs() / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    match (hours, minutes) {
        (0, m) => format!("{} minutes", m),
        (1, 0) => "1 hour".to_string(),
        (h, 0) => format!("{} hours", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_runtime_hhmm() {
        assert_eq!(parse_runtime("4:00"), Ok(Duration::from_secs(4 * 3600)));
        assert_eq!(parse_runtime("1:30"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_runtime("720:00"), Ok(Duration::from_secs(720 * 3600)));
        assert_eq!(parse_runtime(" 0:45 "), Ok(Duration::from_secs(2700)));
    }

    #[test]
    fn test_parse_runtime_minutes() {
        assert_eq!(parse_runtime("90"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_runtime("59999"), Ok(Duration::from_secs(59_999 * 60)));
        assert_eq!(parse_runtime("60000"), Err(RuntimeParseError::TooLong(60_000)));
    }

    #[test]
    fn test_parse_runtime_rejects_malformed() {
        assert_eq!(parse_runtime(""), Err(RuntimeParseError::Empty));
        assert!(matches!(parse_runtime("4h"), Err(RuntimeParseError::Format(_))));
        assert!(matches!(parse_runtime("1:5"), Err(RuntimeParseError::Format(_))));
        assert!(matches!(parse_runtime("1:00:00"), Err(RuntimeParseError::Format(_))));
        assert!(matches!(parse_runtime("1000:00"), Err(RuntimeParseError::Format(_))));
        assert_eq!(parse_runtime("2:75"), Err(RuntimeParseError::MinutesOutOfRange(75)));
    }

    #[test]
    fn test_format_runtime() {
        assert_eq!(format_runtime(Duration::from_secs(4 * 3600)), "4:00");
        assert_eq!(format_runtime(Duration::from_secs(5400)), "1:30");
        assert_eq!(format_duration_lsf(300), "0:05");
    }

    #[test]
    fn test_describe_runtime() {
        assert_eq!(describe_runtime(Duration::from_secs(48 * 3600)), "48 hours");
        assert_eq!(describe_runtime(Duration::from_secs(3600)), "1 hour");
        assert_eq!(describe_runtime(Duration::from_secs(5400)), "1h 30m");
        assert_eq!(describe_runtime(Duration::from_secs(45 * 60)), "45 minutes");
    }
}
