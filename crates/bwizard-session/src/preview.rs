use bwizard_config::Issue;
use std::fmt;

/// What the presentation layer shows in place of the final command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPreview {
    /// The configuration is valid; this is the exact command
    Ready(String),
    /// Error-level issues prevent generation
    Blocked { errors: Vec<Issue> },
}

impl CommandPreview {
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::Ready(cmd) => Some(cmd),
            Self::Blocked { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl fmt::Display for CommandPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(cmd) => f.write_str(cmd),
            Self::Blocked { errors } => {
                write!(f, "# Fix {} error(s) to generate the command", errors.len())?;
                for issue in errors {
                    write!(f, "\n#   {}: {}", issue.field, issue.message)?;
                }
                Ok(())
            }
        }
    }
}
