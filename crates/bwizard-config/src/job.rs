//! The job configuration aggregate.

use bwizard_catalog::JobKind;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How processes share a GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuMode {
    /// One process per GPU
    #[default]
    ExclusiveProcess,
    /// Any number of processes per GPU
    Shared,
}

impl GpuMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExclusiveProcess => "exclusive_process",
            Self::Shared => "shared",
        }
    }
}

impl fmt::Display for GpuMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown GPU mode \"{0}\" (expected exclusive_process or shared)")]
pub struct UnknownGpuMode(pub String);

impl FromStr for GpuMode {
    type Err = UnknownGpuMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exclusive_process" => Ok(Self::ExclusiveProcess),
            "shared" => Ok(Self::Shared),
            other => Err(UnknownGpuMode(other.to_string())),
        }
    }
}

/// GPU request of a GPU job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuConfiguration {
    /// Catalog GPU type id
    pub gpu_type: String,

    /// Number of GPUs requested
    pub count: u32,

    pub mode: GpuMode,

    /// NVLink-connected GPUs requested
    pub nvlink: bool,

    /// CUDA Multi-Process Service requested
    pub mps: bool,

    /// Keep the GPUs exclusive to this job (`j_exclusive`)
    pub exclusive_job: bool,

    /// Minimum VRAM per GPU (e.g. "40G")
    pub min_vram: Option<String>,
}

impl GpuConfiguration {
    pub fn new(gpu_type: impl Into<String>, count: u32) -> Self {
        Self {
            gpu_type: gpu_type.into(),
            count,
            mode: GpuMode::default(),
            nvlink: false,
            mps: false,
            exclusive_job: true,
            min_vram: None,
        }
    }
}

/// Kind discriminant plus the fields only that kind may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindSettings {
    Cpu,
    Gpu {
        /// None until the GPU step has been filled in
        gpu: Option<GpuConfiguration>,
    },
    Interactive {
        x11_forwarding: bool,
    },
    Mpi {
        /// LSF application profile (`-app`)
        application_profile: Option<String>,
    },
}

impl KindSettings {
    /// Settings for a freshly selected kind.
    pub fn new(kind: JobKind) -> Self {
        match kind {
            JobKind::Cpu => Self::Cpu,
            JobKind::Gpu => Self::Gpu { gpu: None },
            JobKind::Interactive => Self::Interactive {
                x11_forwarding: false,
            },
            JobKind::Mpi => Self::Mpi {
                application_profile: None,
            },
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            Self::Cpu => JobKind::Cpu,
            Self::Gpu { .. } => JobKind::Gpu,
            Self::Interactive { .. } => JobKind::Interactive,
            Self::Mpi { .. } => JobKind::Mpi,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field} only applies to {expected} jobs (job kind is {})", .actual.map(|k| k.as_str()).unwrap_or("unset"))]
pub struct KindMismatch {
    pub field: &'static str,
    pub expected: JobKind,
    pub actual: Option<JobKind>,
}

/// Array job range `[start-end:step]%throttle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArraySpec {
    pub start: u32,
    pub end: u32,
    pub step: u32,
    /// Maximum elements running at once
    pub throttle: Option<u32>,
}

impl ArraySpec {
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start,
            end,
            step: 1,
            throttle: None,
        }
    }

    pub fn with_throttle(mut self, throttle: u32) -> Self {
        self.throttle = Some(throttle);
        self
    }

    pub fn with_step(mut self, step: u32) -> Self {
        self.step = step;
        self
    }

    /// Number of array elements, or None if the range is malformed.
    pub fn element_count(&self) -> Option<u32> {
        if self.start > self.end || self.step == 0 {
            return None;
        }
        Some((self.end - self.start) / self.step + 1)
    }
}

/// A license reservation, rendered as `rusage[name=count]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseRequest {
    pub name: String,
    pub count: u32,
}

/// Environment variables in insertion order, unique by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars(Vec<(String, String)>);

impl EnvVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable. An existing name keeps its position.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.0.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.0.iter().position(|(n, _)| n == name)?;
        Some(self.0.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = Self::new();
        for (k, v) in iter {
            vars.set(k, v);
        }
        vars
    }
}

/// Everything needed to render one `bsub` invocation.
///
/// Built incrementally by the presentation layer through a session; every
/// field may be incomplete or invalid at any time, which the validation
/// engine reports rather than rejects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfiguration {
    /// Kind and kind-specific fields (None until chosen)
    pub kind: Option<KindSettings>,

    /// Job name (`-J`)
    pub name: String,

    /// Payload command, run by the job
    pub command: String,

    /// Requested slots (`-n`)
    pub slots: u32,

    /// Queue name (`-q`)
    pub queue: Option<String>,

    /// Run limit as entered (MM or HH:MM)
    pub runtime_limit: Option<String>,

    /// Runtime estimate as entered (MM or HH:MM)
    pub runtime_estimate: Option<String>,

    pub array: Option<ArraySpec>,

    pub output_file: Option<String>,
    pub error_file: Option<String>,
    pub working_directory: Option<String>,

    /// Mail when the job starts (`-B`)
    pub notify_on_start: bool,

    /// Mail the job report on completion (`-N`)
    pub notify_on_completion: bool,

    pub env: EnvVars,

    /// ISA tags every host must offer (`select[...]`)
    pub architectures: Vec<String>,

    pub licenses: Vec<LicenseRequest>,

    /// Free-form resource requirement strings (`-R`)
    pub resources: Vec<String>,
}

impl Default for JobConfiguration {
    fn default() -> Self {
        Self {
            kind: None,
            name: String::new(),
            command: String::new(),
            slots: 1,
            queue: None,
            runtime_limit: None,
            runtime_estimate: None,
            array: None,
            output_file: None,
            error_file: None,
            working_directory: None,
            notify_on_start: false,
            notify_on_completion: false,
            env: EnvVars::new(),
            architectures: Vec::new(),
            licenses: Vec::new(),
            resources: Vec::new(),
        }
    }
}

impl JobConfiguration {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind: Some(KindSettings::new(kind)),
            ..Self::default()
        }
    }

    pub fn kind(&self) -> Option<JobKind> {
        self.kind.as_ref().map(KindSettings::kind)
    }

    /// Select a kind. Re-selecting the current kind keeps its settings;
    /// switching drops the previous kind's fields.
    pub fn set_kind(&mut self, kind: JobKind) {
        if self.kind() != Some(kind) {
            self.kind = Some(KindSettings::new(kind));
        }
    }

    pub fn gpu(&self) -> Option<&GpuConfiguration> {
        match &self.kind {
            Some(KindSettings::Gpu { gpu }) => gpu.as_ref(),
            _ => None,
        }
    }

    pub fn set_gpu(&mut self, config: Option<GpuConfiguration>) -> Result<(), KindMismatch> {
        match &mut self.kind {
            Some(KindSettings::Gpu { gpu }) => {
                *gpu = config;
                Ok(())
            }
            other => Err(KindMismatch {
                field: "GPU configuration",
                expected: JobKind::Gpu,
                actual: other.as_ref().map(KindSettings::kind),
            }),
        }
    }

    pub fn x11_forwarding(&self) -> bool {
        matches!(
            self.kind,
            Some(KindSettings::Interactive {
                x11_forwarding: true
            })
        )
    }

    pub fn set_x11_forwarding(&mut self, enabled: bool) -> Result<(), KindMismatch> {
        match &mut self.kind {
            Some(KindSettings::Interactive { x11_forwarding }) => {
                *x11_forwarding = enabled;
                Ok(())
            }
            other => Err(KindMismatch {
                field: "X11 forwarding",
                expected: JobKind::Interactive,
                actual: other.as_ref().map(KindSettings::kind),
            }),
        }
    }

    pub fn application_profile(&self) -> Option<&str> {
        match &self.kind {
            Some(KindSettings::Mpi {
                application_profile,
            }) => application_profile.as_deref(),
            _ => None,
        }
    }

    pub fn set_application_profile(&mut self, profile: Option<String>) -> Result<(), KindMismatch> {
        match &mut self.kind {
            Some(KindSettings::Mpi {
                application_profile,
            }) => {
                *application_profile = profile;
                Ok(())
            }
            other => Err(KindMismatch {
                field: "Application profile",
                expected: JobKind::Mpi,
                actual: other.as_ref().map(KindSettings::kind),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_one_slot_and_no_kind() {
        let config = JobConfiguration::default();
        assert_eq!(config.slots, 1);
        assert!(config.kind().is_none());
        assert!(config.gpu().is_none());
    }

    #[test]
    fn test_set_kind_keeps_settings_when_unchanged() {
        let mut config = JobConfiguration::new(JobKind::Gpu);
        config.set_gpu(Some(GpuConfiguration::new("a100", 1))).unwrap();
        config.set_kind(JobKind::Gpu);
        assert_eq!(config.gpu().unwrap().gpu_type, "a100");

        config.set_kind(JobKind::Cpu);
        assert!(config.gpu().is_none());
        assert_eq!(config.kind, Some(KindSettings::Cpu));
    }

    #[test]
    fn test_gpu_rejected_for_other_kinds() {
        let mut config = JobConfiguration::new(JobKind::Cpu);
        let err = config
            .set_gpu(Some(GpuConfiguration::new("a100", 1)))
            .unwrap_err();
        assert_eq!(err.expected, JobKind::Gpu);
        assert_eq!(err.actual, Some(JobKind::Cpu));
        assert!(err.to_string().contains("job kind is cpu"));
    }

    #[test]
    fn test_x11_only_for_interactive() {
        let mut config = JobConfiguration::new(JobKind::Interactive);
        config.set_x11_forwarding(true).unwrap();
        assert!(config.x11_forwarding());

        let mut batch = JobConfiguration::default();
        assert!(batch.set_x11_forwarding(true).is_err());
    }

    #[test]
    fn test_array_element_count() {
        assert_eq!(ArraySpec::new(1, 100).element_count(), Some(100));
        assert_eq!(ArraySpec::new(1, 100).with_step(2).element_count(), Some(50));
        assert_eq!(ArraySpec::new(5, 5).element_count(), Some(1));
        assert_eq!(ArraySpec::new(10, 1).element_count(), None);
        assert_eq!(ArraySpec::new(1, 10).with_step(0).element_count(), None);
    }

    #[test]
    fn test_env_vars_keep_insertion_order() {
        let mut env = EnvVars::new();
        env.set("B", "1");
        env.set("A", "2");
        env.set("B", "3");
        let pairs: Vec<_> = env.iter().collect();
        assert_eq!(pairs, vec![("B", "3"), ("A", "2")]);
        assert_eq!(env.remove("B"), Some("3".to_string()));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn test_gpu_mode_parse() {
        assert_eq!("shared".parse::<GpuMode>(), Ok(GpuMode::Shared));
        assert_eq!(
            "exclusive_process".parse::<GpuMode>(),
            Ok(GpuMode::ExclusiveProcess)
        );
        assert!("exclusive".parse::<GpuMode>().is_err());
    }
}
