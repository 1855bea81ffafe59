//! Validation issues.

use std::fmt;

/// How serious an issue is. Errors block command generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Configuration field an issue refers to.
///
/// Declaration order is the order issues are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    /// The saved record itself (restored from disk)
    Record,
    JobKind,
    JobName,
    Command,
    Slots,
    Queue,
    ApplicationProfile,
    RuntimeLimit,
    RuntimeEstimate,
    OutputFile,
    ErrorFile,
    WorkingDirectory,
    Gpu,
    Array,
    Environment,
    Architecture,
    Licenses,
    Resources,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::JobKind => "job_type",
            Self::JobName => "job_name",
            Self::Command => "command",
            Self::Slots => "slots",
            Self::Queue => "queue",
            Self::ApplicationProfile => "application_profile",
            Self::RuntimeLimit => "runtime_limit",
            Self::RuntimeEstimate => "runtime_estimate",
            Self::OutputFile => "output_file",
            Self::ErrorFile => "error_file",
            Self::WorkingDirectory => "working_directory",
            Self::Gpu => "gpu_config",
            Self::Array => "array_config",
            Self::Environment => "environment_vars",
            Self::Architecture => "architecture_requirements",
            Self::Licenses => "license_requirements",
            Self::Resources => "custom_resources",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem found in a job configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Issue {
    pub severity: Severity,
    pub field: Field,
    pub message: String,
}

impl Issue {
    pub fn error(field: Field, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            field,
            message: message.into(),
        }
    }

    pub fn warning(field: Field, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            field,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity.as_str(), self.field, self.message)
    }
}

/// Whether any issue blocks command generation.
pub fn has_errors(issues: &[Issue]) -> bool {
    issues.iter().any(Issue::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_display() {
        let issue = Issue::error(Field::Queue, "Unknown queue: foo");
        assert_eq!(issue.to_string(), "error [queue]: Unknown queue: foo");
    }

    #[test]
    fn test_field_precedence() {
        assert!(Field::JobKind < Field::JobName);
        assert!(Field::Slots < Field::Queue);
        assert!(Field::RuntimeLimit < Field::OutputFile);
        assert!(Field::Gpu < Field::Array);
        assert!(Field::Array < Field::Environment);
    }

    #[test]
    fn test_has_errors() {
        let warnings = vec![Issue::warning(Field::RuntimeLimit, "no limit")];
        assert!(!has_errors(&warnings));
        let mixed = vec![
            Issue::warning(Field::RuntimeLimit, "no limit"),
            Issue::error(Field::Command, "empty"),
        ];
        assert!(has_errors(&mixed));
    }
}
