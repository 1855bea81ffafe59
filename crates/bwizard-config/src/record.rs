//! Portable save/load record of a job configuration.
//!
//! The record is a flat key-value structure mirroring
//! [`JobConfiguration`] field by field, with nested blocks for the GPU
//! and array settings. Restoring never fails: anything that cannot be
//! mapped back is dropped and reported as a warning-level [`Issue`].

use crate::issue::{Field, Issue};
use crate::job::{
    ArraySpec, EnvVars, GpuConfiguration, GpuMode, JobConfiguration, KindSettings, LicenseRequest,
};
use bwizard_catalog::JobKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_slots() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_step() -> u32 {
    1
}

fn default_gpu_count() -> u32 {
    1
}

fn default_gpu_mode() -> String {
    GpuMode::default().as_str().to_string()
}

/// Saved job configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortableRecord {
    /// When the record was written (metadata only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub job_type: Option<String>,

    #[serde(default)]
    pub job_name: String,

    #[serde(default)]
    pub command: String,

    #[serde(default = "default_slots")]
    pub slots: u32,

    #[serde(default)]
    pub queue: Option<String>,

    #[serde(default)]
    pub runtime_limit: Option<String>,

    #[serde(default)]
    pub runtime_estimate: Option<String>,

    #[serde(default)]
    pub output_file: Option<String>,

    #[serde(default)]
    pub error_file: Option<String>,

    #[serde(default)]
    pub working_directory: Option<String>,

    #[serde(default)]
    pub email_on_start: bool,

    #[serde(default)]
    pub email_on_completion: bool,

    #[serde(default)]
    pub x11_forwarding: bool,

    #[serde(default)]
    pub application_profile: Option<String>,

    #[serde(default)]
    pub environment_vars: Vec<EnvEntry>,

    #[serde(default)]
    pub architecture_requirements: Vec<String>,

    #[serde(default)]
    pub license_requirements: Vec<LicenseEntry>,

    #[serde(default)]
    pub custom_resources: Vec<String>,

    #[serde(default)]
    pub gpu_config: Option<GpuRecord>,

    #[serde(default)]
    pub array_config: Option<ArrayRecord>,
}

impl Default for PortableRecord {
    fn default() -> Self {
        JobConfiguration::default().to_record()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvEntry {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseEntry {
    pub name: String,
    #[serde(default = "default_slots")]
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuRecord {
    #[serde(default)]
    pub gpu_type: String,
    #[serde(default = "default_gpu_count")]
    pub num_gpus: u32,
    #[serde(default = "default_gpu_mode")]
    pub gpu_mode: String,
    #[serde(default)]
    pub mps: bool,
    #[serde(default)]
    pub nvlink: bool,
    #[serde(default)]
    pub min_memory: Option<String>,
    #[serde(default = "default_true")]
    pub j_exclusive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayRecord {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub start_index: u32,
    pub end_index: u32,
    #[serde(default = "default_step")]
    pub step: u32,
    #[serde(default)]
    pub max_parallel: Option<u32>,
}

/// A configuration restored from a record, plus what could not be restored.
#[derive(Debug, Clone, PartialEq)]
pub struct Restored {
    pub config: JobConfiguration,
    pub issues: Vec<Issue>,
}

impl PortableRecord {
    /// Strict parse; any malformed field fails the whole record.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Parse as much of a saved record as possible.
    ///
    /// Fields that fail to deserialize are dropped (falling back to their
    /// defaults) and reported. Text that is not a JSON object at all yields
    /// the default record.
    pub fn from_json_lenient(text: &str) -> (Self, Vec<Issue>) {
        if let Ok(record) = Self::from_json(text) {
            return (record, Vec::new());
        }

        let object = match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return (
                    Self::default(),
                    vec![Issue::warning(
                        Field::Record,
                        "Saved configuration is not a JSON object; starting from defaults",
                    )],
                );
            }
            Err(e) => {
                tracing::warn!("Failed to parse saved configuration: {}", e);
                return (
                    Self::default(),
                    vec![Issue::warning(
                        Field::Record,
                        format!("Saved configuration could not be read ({}); starting from defaults", e),
                    )],
                );
            }
        };

        let mut issues = Vec::new();
        let mut kept = Map::new();
        for (key, value) in object {
            let mut single = Map::new();
            single.insert(key.clone(), value.clone());
            match serde_json::from_value::<Self>(Value::Object(single)) {
                Ok(_) => {
                    kept.insert(key, value);
                }
                Err(e) => {
                    tracing::warn!("Dropping saved field {}: {}", key, e);
                    issues.push(Issue::warning(
                        Field::Record,
                        format!("Saved field \"{}\" could not be read and was reset: {}", key, e),
                    ));
                }
            }
        }

        // Every kept field deserializes on its own, so the merge does too.
        let record = serde_json::from_value(Value::Object(kept)).unwrap_or_default();
        (record, issues)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl JobConfiguration {
    /// Flatten into a portable record.
    pub fn to_record(&self) -> PortableRecord {
        let (x11_forwarding, application_profile, gpu_config) = match &self.kind {
            Some(KindSettings::Interactive { x11_forwarding }) => (*x11_forwarding, None, None),
            Some(KindSettings::Mpi {
                application_profile,
            }) => (false, application_profile.clone(), None),
            Some(KindSettings::Gpu { gpu }) => (false, None, gpu.as_ref().map(GpuRecord::from)),
            Some(KindSettings::Cpu) | None => (false, None, None),
        };

        PortableRecord {
            saved_at: None,
            job_type: self.kind().map(|k| k.as_str().to_string()),
            job_name: self.name.clone(),
            command: self.command.clone(),
            slots: self.slots,
            queue: self.queue.clone(),
            runtime_limit: self.runtime_limit.clone(),
            runtime_estimate: self.runtime_estimate.clone(),
            output_file: self.output_file.clone(),
            error_file: self.error_file.clone(),
            working_directory: self.working_directory.clone(),
            email_on_start: self.notify_on_start,
            email_on_completion: self.notify_on_completion,
            x11_forwarding,
            application_profile,
            environment_vars: self
                .env
                .iter()
                .map(|(name, value)| EnvEntry {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
            architecture_requirements: self.architectures.clone(),
            license_requirements: self
                .licenses
                .iter()
                .map(|l| LicenseEntry {
                    name: l.name.clone(),
                    count: l.count,
                })
                .collect(),
            custom_resources: self.resources.clone(),
            gpu_config,
            array_config: self.array.map(|a| ArrayRecord {
                enabled: true,
                start_index: a.start,
                end_index: a.end,
                step: a.step,
                max_parallel: a.throttle,
            }),
        }
    }

    /// Rebuild a configuration from a record.
    ///
    /// Never fails. Values that do not fit the configuration model (an
    /// unknown job type, a GPU block on a CPU job, ...) are dropped and
    /// reported; the result still has to go through validation.
    pub fn from_record(record: &PortableRecord) -> Restored {
        let mut issues = Vec::new();

        let kind = match record.job_type.as_deref().map(str::parse::<JobKind>) {
            None => None,
            Some(Ok(kind)) => Some(kind),
            Some(Err(e)) => {
                issues.push(Issue::warning(Field::Record, format!("Saved {}; job type reset", e)));
                None
            }
        };

        let settings = kind.map(|kind| match kind {
            JobKind::Cpu => KindSettings::Cpu,
            JobKind::Gpu => KindSettings::Gpu {
                gpu: record
                    .gpu_config
                    .as_ref()
                    .map(|g| g.to_configuration(&mut issues)),
            },
            JobKind::Interactive => KindSettings::Interactive {
                x11_forwarding: record.x11_forwarding,
            },
            JobKind::Mpi => KindSettings::Mpi {
                application_profile: record.application_profile.clone(),
            },
        });

        if record.gpu_config.is_some() && kind != Some(JobKind::Gpu) {
            issues.push(Issue::warning(
                Field::Record,
                "Saved GPU configuration ignored because the job type is not gpu",
            ));
        }
        if record.x11_forwarding && kind != Some(JobKind::Interactive) {
            issues.push(Issue::warning(
                Field::Record,
                "Saved X11 forwarding ignored because the job type is not interactive",
            ));
        }
        if record.application_profile.is_some() && kind != Some(JobKind::Mpi) {
            issues.push(Issue::warning(
                Field::Record,
                "Saved application profile ignored because the job type is not mpi",
            ));
        }

        let mut env = EnvVars::new();
        for entry in &record.environment_vars {
            if env.contains(&entry.name) {
                issues.push(Issue::warning(
                    Field::Record,
                    format!(
                        "Saved environment variable {} appears more than once; last value kept",
                        entry.name
                    ),
                ));
            }
            env.set(entry.name.clone(), entry.value.clone());
        }

        let array = record
            .array_config
            .as_ref()
            .filter(|a| a.enabled)
            .map(|a| ArraySpec {
                start: a.start_index,
                end: a.end_index,
                step: a.step,
                throttle: a.max_parallel,
            });

        let config = JobConfiguration {
            kind: settings,
            name: record.job_name.clone(),
            command: record.command.clone(),
            slots: record.slots,
            queue: record.queue.clone(),
            runtime_limit: record.runtime_limit.clone(),
            runtime_estimate: record.runtime_estimate.clone(),
            array,
            output_file: record.output_file.clone(),
            error_file: record.error_file.clone(),
            working_directory: record.working_directory.clone(),
            notify_on_start: record.email_on_start,
            notify_on_completion: record.email_on_completion,
            env,
            architectures: record.architecture_requirements.clone(),
            licenses: record
                .license_requirements
                .iter()
                .map(|l| LicenseRequest {
                    name: l.name.clone(),
                    count: l.count,
                })
                .collect(),
            resources: record.custom_resources.clone(),
        };

        Restored { config, issues }
    }
}

impl From<&GpuConfiguration> for GpuRecord {
    fn from(gpu: &GpuConfiguration) -> Self {
        Self {
            gpu_type: gpu.gpu_type.clone(),
            num_gpus: gpu.count,
            gpu_mode: gpu.mode.as_str().to_string(),
            mps: gpu.mps,
            nvlink: gpu.nvlink,
            min_memory: gpu.min_vram.clone(),
            j_exclusive: gpu.exclusive_job,
        }
    }
}

impl GpuRecord {
    fn to_configuration(&self, issues: &mut Vec<Issue>) -> GpuConfiguration {
        let mode = self.gpu_mode.parse().unwrap_or_else(|e| {
            issues.push(Issue::warning(
                Field::Record,
                format!("Saved {}; using exclusive_process", e),
            ));
            GpuMode::default()
        });

        GpuConfiguration {
            gpu_type: self.gpu_type.clone(),
            count: self.num_gpus,
            mode,
            nvlink: self.nvlink,
            mps: self.mps,
            exclusive_job: self.j_exclusive,
            min_vram: self.min_memory.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpu_job() -> JobConfiguration {
        let mut config = JobConfiguration::new(JobKind::Gpu);
        config.name = "train".to_string();
        config.command = "python train.py --lr 'a b'".to_string();
        config.slots = 24;
        config.queue = Some("gpu_a100".to_string());
        config.runtime_limit = Some("12:00".to_string());
        config.array = Some(ArraySpec::new(1, 10).with_throttle(2));
        config.env.set("OMP_NUM_THREADS", "12");
        config.env.set("DATA", "/nrs/lab");
        config.licenses.push(LicenseRequest {
            name: "matlab".to_string(),
            count: 1,
        });
        let mut gpu = GpuConfiguration::new("a100", 2);
        gpu.mode = GpuMode::Shared;
        gpu.min_vram = Some("40G".to_string());
        config.set_gpu(Some(gpu)).unwrap();
        config
    }

    #[test]
    fn test_record_round_trip() {
        let config = gpu_job();
        let json = config.to_record().to_json().unwrap();
        let record = PortableRecord::from_json(&json).unwrap();
        let restored = JobConfiguration::from_record(&record);
        assert!(restored.issues.is_empty());
        assert_eq!(restored.config, config);
    }

    #[test]
    fn test_record_round_trip_interactive() {
        let mut config = JobConfiguration::new(JobKind::Interactive);
        config.set_x11_forwarding(true).unwrap();
        let restored = JobConfiguration::from_record(&config.to_record());
        assert_eq!(restored.config, config);
    }

    #[test]
    fn test_record_keeps_env_order() {
        let record = gpu_job().to_record();
        let names: Vec<&str> = record
            .environment_vars
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["OMP_NUM_THREADS", "DATA"]);
    }

    #[test]
    fn test_unknown_job_type_is_reported() {
        let record = PortableRecord {
            job_type: Some("batch".to_string()),
            ..PortableRecord::default()
        };
        let restored = JobConfiguration::from_record(&record);
        assert!(restored.config.kind.is_none());
        assert_eq!(restored.issues.len(), 1);
        assert!(!restored.issues[0].is_error());
    }

    #[test]
    fn test_gpu_block_on_cpu_job_is_dropped() {
        let mut record = gpu_job().to_record();
        record.job_type = Some("cpu".to_string());
        let restored = JobConfiguration::from_record(&record);
        assert_eq!(restored.config.kind, Some(KindSettings::Cpu));
        assert!(restored.issues.iter().any(|i| i.message.contains("GPU")));
    }

    #[test]
    fn test_bad_gpu_mode_falls_back() {
        let mut record = gpu_job().to_record();
        if let Some(gpu) = record.gpu_config.as_mut() {
            gpu.gpu_mode = "turbo".to_string();
        }
        let restored = JobConfiguration::from_record(&record);
        assert_eq!(restored.config.gpu().unwrap().mode, GpuMode::ExclusiveProcess);
        assert_eq!(restored.issues.len(), 1);
    }

    #[test]
    fn test_disabled_array_block_is_ignored() {
        let json = r#"{"job_type":"cpu","array_config":{"enabled":false,"start_index":1,"end_index":5}}"#;
        let record = PortableRecord::from_json(json).unwrap();
        let restored = JobConfiguration::from_record(&record);
        assert!(restored.config.array.is_none());
    }

    #[test]
    fn test_lenient_parse_drops_bad_fields() {
        let json = r#"{"job_type":"cpu","job_name":"ok","slots":-4,"queue":"local"}"#;
        assert!(PortableRecord::from_json(json).is_err());

        let (record, issues) = PortableRecord::from_json_lenient(json);
        assert_eq!(record.job_name, "ok");
        assert_eq!(record.queue.as_deref(), Some("local"));
        assert_eq!(record.slots, 1);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("slots"));
    }

    #[test]
    fn test_lenient_parse_of_garbage() {
        let (record, issues) = PortableRecord::from_json_lenient("not json at all");
        assert_eq!(record, PortableRecord::default());
        assert_eq!(issues.len(), 1);

        let (_, issues) = PortableRecord::from_json_lenient("[1, 2]");
        assert_eq!(issues.len(), 1);
    }
}
