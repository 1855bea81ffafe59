use crate::preview::CommandPreview;
use bwizard_catalog::ClusterCatalog;
use bwizard_config::{has_errors, Issue, JobConfiguration, PortableRecord};
use bwizard_engine::{estimate, synthesize, synthesize_script, validate, CostEstimate, EngineError};
use once_cell::unsync::OnceCell;
use std::sync::Arc;

/// One user's in-progress job configuration.
///
/// Every mutation goes through [`Session::update`] (or a load), after which
/// issues and cost are recomputed before control returns. The command
/// preview is synthesized lazily and cached until the next mutation.
#[derive(Debug)]
pub struct Session {
    catalog: Arc<ClusterCatalog>,
    config: JobConfiguration,
    /// Problems found while restoring the last loaded record
    record_issues: Vec<Issue>,
    /// Record issues followed by validation issues
    issues: Vec<Issue>,
    cost: Option<CostEstimate>,
    preview: OnceCell<CommandPreview>,
}

impl Session {
    /// Start a session with an empty configuration.
    pub fn new(catalog: Arc<ClusterCatalog>) -> Self {
        let mut session = Self {
            catalog,
            config: JobConfiguration::default(),
            record_issues: Vec::new(),
            issues: Vec::new(),
            cost: None,
            preview: OnceCell::new(),
        };
        session.refresh();
        session
    }

    /// Start a session from a saved record.
    pub fn from_record(catalog: Arc<ClusterCatalog>, record: &PortableRecord) -> Self {
        let mut session = Self::new(catalog);
        session.load_record(record);
        session
    }

    /// Apply one edit to the configuration, then revalidate.
    ///
    /// Returns whatever the closure returns, so fallible setters such as
    /// [`JobConfiguration::set_gpu`] can report back to the caller.
    pub fn update<R>(&mut self, edit: impl FnOnce(&mut JobConfiguration) -> R) -> R {
        let result = edit(&mut self.config);
        self.refresh();
        result
    }

    /// Replace the configuration with one restored from a record.
    ///
    /// Parts of the record that cannot be restored are dropped and reported
    /// as record issues; the rest is validated like any live edit.
    pub fn load_record(&mut self, record: &PortableRecord) {
        self.restore(record, Vec::new());
    }

    /// Replace the configuration with one parsed from record JSON.
    ///
    /// Unparseable text yields a default configuration plus a record issue.
    pub fn load_json(&mut self, text: &str) {
        let (record, parse_issues) = PortableRecord::from_json_lenient(text);
        self.restore(&record, parse_issues);
    }

    /// Discard the configuration and any record issues.
    pub fn reset(&mut self) {
        self.config = JobConfiguration::default();
        self.record_issues.clear();
        self.refresh();
    }

    pub fn config(&self) -> &JobConfiguration {
        &self.config
    }

    pub fn catalog(&self) -> &ClusterCatalog {
        &self.catalog
    }

    /// Record issues, then validation issues in field order.
    pub fn current_issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn record_issues(&self) -> &[Issue] {
        &self.record_issues
    }

    pub fn has_errors(&self) -> bool {
        has_errors(&self.issues)
    }

    pub fn current_cost_estimate(&self) -> Option<CostEstimate> {
        self.cost
    }

    /// The command if the configuration is valid, otherwise why not.
    pub fn preview_command(&self) -> &CommandPreview {
        self.preview.get_or_init(|| {
            if self.has_errors() {
                CommandPreview::Blocked {
                    errors: self.issues.iter().filter(|i| i.is_error()).cloned().collect(),
                }
            } else {
                match synthesize(&self.config, &self.catalog) {
                    Ok(cmd) => CommandPreview::Ready(cmd),
                    Err(EngineError::InvalidConfiguration { issues }) => {
                        CommandPreview::Blocked { errors: issues }
                    }
                    Err(e) => {
                        tracing::warn!("command preview failed: {}", e);
                        CommandPreview::Blocked { errors: Vec::new() }
                    }
                }
            }
        })
    }

    /// Synthesize the final command.
    pub fn generate(&self) -> Result<String, EngineError> {
        synthesize(&self.config, &self.catalog)
    }

    /// Synthesize a submission script.
    pub fn generate_script(&self) -> Result<String, EngineError> {
        synthesize_script(&self.config, &self.catalog)
    }

    pub fn to_portable_record(&self) -> PortableRecord {
        self.config.to_record()
    }

    fn restore(&mut self, record: &PortableRecord, mut record_issues: Vec<Issue>) {
        let restored = JobConfiguration::from_record(record);
        record_issues.extend(restored.issues);
        self.config = restored.config;
        self.record_issues = record_issues;
        tracing::debug!(
            dropped = self.record_issues.len(),
            "loaded job configuration from record"
        );
        self.refresh();
    }

    fn refresh(&mut self) {
        let mut issues = self.record_issues.clone();
        issues.extend(validate(&self.config, &self.catalog));
        self.issues = issues;
        self.cost = estimate(&self.config, &self.catalog);
        self.preview = OnceCell::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bwizard_catalog::JobKind;
    use bwizard_config::Field;

    fn session() -> Session {
        Session::new(Arc::new(ClusterCatalog::reference()))
    }

    #[test]
    fn test_new_session_is_blocked() {
        let session = session();
        assert!(session.has_errors());
        assert!(!session.preview_command().is_ready());
        assert!(session.current_cost_estimate().is_none());
        assert!(session.record_issues().is_empty());
    }

    #[test]
    fn test_update_revalidates_and_invalidates_preview() {
        let mut session = session();
        session.update(|c| {
            c.set_kind(JobKind::Cpu);
            c.name = "analysis".to_string();
            c.slots = 8;
            c.queue = Some("local".to_string());
            c.runtime_limit = Some("4:00".to_string());
            c.command = "python run.py".to_string();
        });
        assert!(session.current_issues().is_empty());
        assert_eq!(
            session.preview_command().command(),
            Some(r#"bsub -J "analysis" -n 8 -q local -W 4:00 'python run.py'"#)
        );

        session.update(|c| c.slots = 16);
        assert!(session.preview_command().to_string().contains("-n 16"));
    }

    #[test]
    fn test_update_passes_through_result() {
        let mut session = session();
        session.update(|c| c.set_kind(JobKind::Cpu));
        let result = session.update(|c| c.set_x11_forwarding(true));
        assert!(result.is_err());
        assert!(!session.config().x11_forwarding());
    }

    #[test]
    fn test_garbage_json_yields_record_issue() {
        let mut session = session();
        session.load_json("{not json");
        assert_eq!(session.record_issues().len(), 1);
        assert_eq!(session.current_issues()[0].field, Field::Record);
        assert_eq!(session.config(), &JobConfiguration::default());
    }

    #[test]
    fn test_reset_clears_record_issues() {
        let mut session = session();
        session.load_json("[]");
        assert!(!session.record_issues().is_empty());
        session.reset();
        assert!(session.record_issues().is_empty());
        assert!(session.current_issues().iter().all(|i| i.field != Field::Record));
    }
}
