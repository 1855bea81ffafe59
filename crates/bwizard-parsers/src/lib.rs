//! Shared parsing and formatting utilities for bsub command synthesis.
//!
//! Runtime limits, LSF memory strings and shell quoting are needed by the
//! validation engine, the synthesizer and the portable record alike, so
//! they live here rather than in any one of them.

pub mod memory;
pub mod quote;
pub mod time;

pub use memory::parse_memory_mb;
pub use quote::{double_quote, shell_word, single_quote};
pub use time::{
    describe_runtime, format_duration_lsf, format_runtime, parse_runtime, runtime_hours,
    RuntimeParseError,
};

/// Filter helper for optional string fields.
/// Returns None if the string is empty or whitespace only.
pub fn non_empty_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_string() {
        assert_eq!(non_empty_string("hello"), Some("hello".to_string()));
        assert_eq!(non_empty_string("  hello  "), Some("hello".to_string()));
        assert_eq!(non_empty_string(""), None);
        assert_eq!(non_empty_string("   "), None);
    }
}
