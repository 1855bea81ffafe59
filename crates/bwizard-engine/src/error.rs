use bwizard_catalog::CatalogError;
use bwizard_config::Issue;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Synthesis was requested while error-level issues are outstanding.
    #[error("invalid configuration: {}", summarize(.issues))]
    InvalidConfiguration { issues: Vec<Issue> },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

fn summarize(issues: &[Issue]) -> String {
    match issues {
        [] => "no details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}
