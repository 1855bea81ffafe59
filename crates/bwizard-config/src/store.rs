use crate::record::PortableRecord;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use std::fs;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// File storage for saved job configurations.
pub struct RecordStore {
    path: Utf8PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for a named job inside `dir`: `{dir}/{job_name}.json`, or
    /// `job_config.json` while the job is still unnamed.
    pub fn for_job(dir: &Utf8Path, job_name: &str) -> Self {
        let stem = match job_name.trim() {
            "" => "job_config",
            name => name,
        };
        Self::new(dir.join(format!("{}.json", stem)))
    }

    /// Get the path to the record file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Read the raw record text.
    ///
    /// Parsing is left to the caller so a damaged file can still be
    /// salvaged with [`PortableRecord::from_json_lenient`].
    pub fn load_text(&self) -> Result<String, StoreError> {
        Ok(fs::read_to_string(&self.path)?)
    }

    /// Load and strictly parse a record.
    pub fn load(&self) -> Result<PortableRecord, StoreError> {
        Ok(PortableRecord::from_json(&self.load_text()?)?)
    }

    /// Save a record, stamping `saved_at`.
    ///
    /// Creates parent directories if needed.
    pub fn save(&self, record: &PortableRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let stamped = PortableRecord {
            saved_at: Some(Utc::now()),
            ..record.clone()
        };
        fs::write(&self.path, stamped.to_json()?)?;
        tracing::debug!("Saved job configuration to {}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobConfiguration;
    use bwizard_catalog::JobKind;
    use tempfile::TempDir;

    #[test]
    fn test_store_load_nonexistent() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(temp.path()).unwrap();
        let store = RecordStore::for_job(dir, "missing");
        assert!(matches!(store.load(), Err(StoreError::Io(_))));
    }

    #[test]
    fn test_store_save_and_load() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(temp.path()).unwrap().join("nested");
        let mut config = JobConfiguration::new(JobKind::Cpu);
        config.name = "analysis".to_string();
        let store = RecordStore::for_job(&dir, &config.name);

        store.save(&config.to_record()).unwrap();
        assert!(store.path().exists());
        assert!(store.path().as_str().ends_with("analysis.json"));

        let loaded = store.load().unwrap();
        assert!(loaded.saved_at.is_some());
        let restored = JobConfiguration::from_record(&loaded);
        assert_eq!(restored.config, config);
    }

    #[test]
    fn test_for_job_unnamed() {
        let store = RecordStore::for_job(Utf8Path::new("/tmp"), "  ");
        assert_eq!(store.path(), Utf8Path::new("/tmp/job_config.json"));
    }
}
