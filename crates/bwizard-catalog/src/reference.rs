//! Built-in tables for the reference cluster.

use crate::catalog::ClusterCatalog;
use crate::types::{ClusterPolicy, GpuType, JobKind, NodeType, QueueDefinition};
use std::time::Duration;

const HOUR: u64 = 3600;
const SLOT_HOUR_NOTE: &str = "$0.05 per slot-hour";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn node(
    id: &str,
    cpu_model: &str,
    cores: u32,
    memory_gb: u32,
    node_count: u32,
    features: &[&str],
) -> NodeType {
    NodeType {
        id: id.to_string(),
        cpu_model: cpu_model.to_string(),
        cores,
        memory_gb,
        node_count,
        features: strings(features),
    }
}

#[allow(clippy::too_many_arguments)]
fn gpu(
    id: &str,
    model: &str,
    vram_gb: u32,
    slots_per_gpu: u32,
    gpus_per_node: u32,
    hourly_rate: f64,
    model_fragment: &str,
    features: &[&str],
) -> GpuType {
    GpuType {
        id: id.to_string(),
        model: model.to_string(),
        vram_gb,
        slots_per_gpu,
        gpus_per_node,
        hourly_rate,
        model_fragment: model_fragment.to_string(),
        features: strings(features),
    }
}

fn queue(name: &str, description: &str, kinds: &[JobKind], nodes: &[&str]) -> QueueDefinition {
    QueueDefinition {
        name: name.to_string(),
        description: description.to_string(),
        allowed_kinds: kinds.to_vec(),
        default_runtime: None,
        max_runtime: None,
        max_slots_per_job: None,
        node_types: strings(nodes),
        gpu_types: vec![],
        application_profiles: vec![],
        cost_notes: SLOT_HOUR_NOTE.to_string(),
    }
}

fn gpu_queue(name: &str, description: &str, nodes: &[&str], gpus: &[&str]) -> QueueDefinition {
    QueueDefinition {
        gpu_types: strings(gpus),
        cost_notes: format!("{}, plus the per-GPU hourly rate", SLOT_HOUR_NOTE),
        ..queue(name, description, &[JobKind::Gpu], nodes)
    }
}

fn limited(mut q: QueueDefinition, default_hours: u64, max_hours: u64) -> QueueDefinition {
    q.default_runtime = Some(Duration::from_secs(default_hours * HOUR));
    q.max_runtime = Some(Duration::from_secs(max_hours * HOUR));
    q
}

const CPU_NODES: &[&str] = &["sky_lake", "cascade_lake", "sapphire_rapids"];

impl ClusterCatalog {
    /// Catalog of the reference cluster: three CPU racks, six GPU models
    /// and the standard queue set.
    pub fn reference() -> Self {
        let node_types = vec![
            node("sky_lake", "2.7 GHz Intel Platinum 8168", 48, 768, 32, &["avx2", "avx512"]),
            node("cascade_lake", "3.0 GHz Intel Gold 6248R", 48, 768, 32, &["avx2", "avx512"]),
            node(
                "sapphire_rapids",
                "2.8 GHz Intel Platinum 8462Y+",
                64,
                1024,
                32,
                &["avx2", "avx512", "amx"],
            ),
            node("gh200", "NVIDIA Grace 72-core", 72, 480, 1, &["neon", "sve2"]),
            node("gpu_h200", "Intel Platinum 8480+", 96, 2048, 8, &["avx2", "avx512", "amx"]),
            node("gpu_h100", "Intel Platinum 8480+", 96, 1024, 10, &["avx2", "avx512", "amx"]),
            node("gpu_a100", "AMD EPYC 7763", 48, 512, 19, &["avx2"]),
            node("gpu_l4_dense", "AMD EPYC 9354", 64, 512, 18, &["avx2", "avx512"]),
            node("gpu_l4_large", "AMD EPYC 9554", 64, 1024, 31, &["avx2", "avx512"]),
            node("gpu_t4", "Intel Gold 6248R", 48, 768, 62, &["avx2", "avx512"]),
        ];

        let gpu_types = vec![
            gpu(
                "gh200",
                "GH200 Super Chip",
                96,
                72,
                1,
                0.80,
                "NVIDIAGH200_96GB",
                &["grace_cpu", "nvlink", "tensor_cores"],
            ),
            gpu(
                "h200",
                "H200 SXM5",
                141,
                12,
                8,
                0.80,
                "NVIDIAH200_141GB",
                &["nvlink", "tensor_cores", "transformer_engine"],
            ),
            gpu(
                "h100",
                "H100 SXM5",
                80,
                12,
                8,
                0.50,
                "NVIDIAH100_80GB",
                &["nvlink", "tensor_cores", "transformer_engine"],
            ),
            gpu(
                "a100",
                "A100 SXM4",
                80,
                12,
                4,
                0.20,
                "NVIDIAA100_SXM4_80GB",
                &["nvlink", "tensor_cores"],
            ),
            gpu("l4", "Tesla L4", 24, 8, 8, 0.10, "TeslaL4_24GB", &["tensor_cores", "rt_cores"]),
            gpu("t4", "Tesla T4", 16, 48, 1, 0.10, "TeslaT4_16GB", &["tensor_cores"]),
        ];

        let mut mpi = queue(
            "mpi",
            "Parallel/MPI jobs in whole-node (48-slot) increments",
            &[JobKind::Mpi],
            &["sky_lake", "cascade_lake"],
        );
        mpi.application_profiles = strings(&["parallel-48"]);

        let queues = vec![
            limited(
                queue(
                    "interactive",
                    "Interactive sessions for GUI applications and testing",
                    &[JobKind::Cpu, JobKind::Interactive],
                    CPU_NODES,
                ),
                8,
                48,
            ),
            queue("local", "Default CPU queue for long-running jobs", &[JobKind::Cpu], CPU_NODES),
            limited(
                queue("short", "Quick jobs under 1 hour", &[JobKind::Cpu], CPU_NODES),
                1,
                1,
            ),
            gpu_queue("gpu_gh200", "GH200 Super Chip, GPU/CPU combo", &["gh200"], &["gh200"]),
            gpu_queue("gpu_h200", "H200, high-memory AI/ML workloads", &["gpu_h200"], &["h200"]),
            gpu_queue(
                "gpu_h100",
                "H100,
                high-performance AI/ML training",
                &["gpu_h100"],
                &["h100"],
            ),
            gpu_queue("gpu_a100", "A100, training and inference", &["gpu_a100"], &["a100"]),
            gpu_queue("gpu_l4", "L4, inference and light training", &["gpu_l4_dense"], &["l4"]),
            gpu_queue(
                "gpu_l4_large",
                "L4, one GPU per node for memory-intensive tasks",
                &["gpu_l4_large"],
                &["l4"],
            ),
            gpu_queue("gpu_t4", "T4, development and testing", &["gpu_t4"], &["t4"]),
            limited(
                gpu_queue(
                    "gpu_short",
                    "Mixed GPU types for short jobs (1 hour limit)",
                    &["gpu_t4", "gpu_l4_dense", "gpu_a100"],
                    &["t4", "l4", "a100"],
                ),
                1,
                1,
            ),
            mpi,
        ];

        ClusterCatalog::new(node_types, gpu_types, queues, ClusterPolicy::default())
            .unwrap_or_else(|e| panic!("reference catalog is inconsistent: {}", e))
    }
}
