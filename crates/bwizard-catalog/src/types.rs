//! Catalog entry types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Kind of job being configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Batch job on CPU nodes
    Cpu,
    /// Batch job with one or more GPUs
    Gpu,
    /// Interactive session (`-Is`)
    Interactive,
    /// Parallel job spanning whole nodes
    Mpi,
}

impl JobKind {
    pub const ALL: [JobKind; 4] = [JobKind::Cpu, JobKind::Gpu, JobKind::Interactive, JobKind::Mpi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
            Self::Interactive => "interactive",
            Self::Mpi => "mpi",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown job kind \"{0}\" (expected cpu, gpu, interactive or mpi)")]
pub struct UnknownJobKind(pub String);

impl FromStr for JobKind {
    type Err = UnknownJobKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Gpu),
            "interactive" => Ok(Self::Interactive),
            "mpi" => Ok(Self::Mpi),
            other => Err(UnknownJobKind(other.to_string())),
        }
    }
}

/// A class of compute node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeType {
    /// Node type identifier
    pub id: String,

    /// CPU model, for display
    #[serde(default)]
    pub cpu_model: String,

    /// Cores per node (one slot per core)
    pub cores: u32,

    /// Total memory per node (GB)
    pub memory_gb: u32,

    /// Number of nodes of this type
    #[serde(default)]
    pub node_count: u32,

    /// Instruction-set architecture tags (e.g. avx2, avx512, amx)
    #[serde(default)]
    pub features: Vec<String>,
}

impl NodeType {
    /// Whether this node type offers the given ISA tag.
    pub fn supports(&self, tag: &str) -> bool {
        self.features.iter().any(|f| f.eq_ignore_ascii_case(tag))
    }
}

/// A GPU model available on the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuType {
    /// GPU type identifier
    pub id: String,

    /// Model name, for display
    pub model: String,

    /// Memory per GPU (GB)
    pub vram_gb: u32,

    /// Slots that must accompany each GPU
    pub slots_per_gpu: u32,

    /// GPUs installed per host
    pub gpus_per_node: u32,

    /// Hourly rate per GPU
    pub hourly_rate: f64,

    /// Value of the `gmodel=` clause in the `-gpu` resource string
    pub model_fragment: String,

    /// Feature tags (e.g. nvlink, tensor_cores)
    #[serde(default)]
    pub features: Vec<String>,
}

impl GpuType {
    /// Human-readable GPU name.
    pub fn display_name(&self) -> String {
        format!("{} ({}GB VRAM)", self.model, self.vram_gb)
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f.eq_ignore_ascii_case(feature))
    }
}

/// An LSF queue and its limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueDefinition {
    /// Queue name as passed to `-q`
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Job kinds this queue accepts
    pub allowed_kinds: Vec<JobKind>,

    /// Run limit applied when the job sets none
    #[serde(default, with = "runtime_serde")]
    pub default_runtime: Option<Duration>,

    /// Largest run limit the queue accepts (None = unlimited)
    #[serde(default, with = "runtime_serde")]
    pub max_runtime: Option<Duration>,

    /// Per-job slot cap, on top of the node size
    #[serde(default)]
    pub max_slots_per_job: Option<u32>,

    /// Node types the queue dispatches to (empty = all)
    #[serde(default)]
    pub node_types: Vec<String>,

    /// GPU types the queue offers (empty for CPU queues)
    #[serde(default)]
    pub gpu_types: Vec<String>,

    /// Application profiles accepted via `-app`
    #[serde(default)]
    pub application_profiles: Vec<String>,

    /// Free-form billing notes
    #[serde(default)]
    pub cost_notes: String,
}

impl QueueDefinition {
    pub fn accepts(&self, kind: JobKind) -> bool {
        self.allowed_kinds.contains(&kind)
    }

    pub fn offers_gpu(&self, gpu_id: &str) -> bool {
        self.gpu_types.iter().any(|g| g == gpu_id)
    }
}

/// Cluster-wide policy values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterPolicy {
    /// Longest accepted job name
    pub max_job_name_len: usize,

    /// Job names the cluster reserves (compared case-insensitively)
    pub reserved_job_names: Vec<String>,

    /// Environment variables that should not be overridden
    pub reserved_env_vars: Vec<String>,

    /// Longest accepted environment variable value
    pub max_env_value_len: usize,

    /// Root of the high-throughput scratch file system
    pub scratch_root: String,

    /// Duration assumed by the cost estimator when no limit is set
    #[serde(with = "runtime_serde::required")]
    pub default_estimate: Duration,

    /// Memory granted per slot (GB)
    pub memory_per_slot_gb: u32,

    /// Largest accepted array job
    pub max_array_elements: u32,

    /// License resources known to the scheduler
    pub license_types: Vec<String>,
}

impl Default for ClusterPolicy {
    fn default() -> Self {
        Self {
            max_job_name_len: 100,
            reserved_job_names: ["spark", "janelia", "master", "int", "admin", "root", "system"]
                .map(String::from)
                .to_vec(),
            reserved_env_vars: ["PATH", "HOME", "USER", "PWD", "SHELL", "LSB_JOBID", "LSB_JOBINDEX"]
                .map(String::from)
                .to_vec(),
            max_env_value_len: 1000,
            scratch_root: "/scratch".to_string(),
            default_estimate: Duration::from_secs(3600),
            memory_per_slot_gb: 15,
            max_array_elements: 10_000,
            license_types: ["idl", "matlab"].map(String::from).to_vec(),
        }
    }
}

/// Serialize runtimes the way users write them (`H:MM`).
mod runtime_serde {
    use bwizard_parsers::{format_runtime, parse_runtime};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&format_runtime(*d)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|raw| parse_runtime(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }

    pub mod required {
        use super::*;

        pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_str(&format_runtime(*value))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
            let raw = String::deserialize(d)?;
            parse_runtime(&raw).map_err(serde::de::Error::custom)
        }
    }
}
