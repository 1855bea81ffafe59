//! Values derived from a configuration at read time.
//!
//! None of these write back into the configuration; the stored
//! configuration stays the single source of truth.

use bwizard_catalog::{ClusterCatalog, GpuType, JobKind, QueueDefinition};
use bwizard_config::{GpuConfiguration, JobConfiguration};
use bwizard_parsers::parse_runtime;
use std::time::Duration;

/// Parsed run limit; None when absent or malformed.
pub fn runtime_limit(config: &JobConfiguration) -> Option<Duration> {
    config
        .runtime_limit
        .as_deref()
        .and_then(|raw| parse_runtime(raw).ok())
}

/// Parsed runtime estimate; None when absent or malformed.
pub fn runtime_estimate(config: &JobConfiguration) -> Option<Duration> {
    config
        .runtime_estimate
        .as_deref()
        .and_then(|raw| parse_runtime(raw).ok())
}

/// Queue definition the configuration points at, if it exists.
pub fn queue<'c>(
    config: &JobConfiguration,
    catalog: &'c ClusterCatalog,
) -> Option<&'c QueueDefinition> {
    config.queue.as_deref().and_then(|name| catalog.queue(name))
}

/// Run limit the scheduler will enforce: the job's own, else the queue default.
pub fn effective_runtime(config: &JobConfiguration, catalog: &ClusterCatalog) -> Option<Duration> {
    runtime_limit(config).or_else(|| queue(config, catalog).and_then(|q| q.default_runtime))
}

/// Number of array elements; 1 for plain jobs or a malformed range.
pub fn array_elements(config: &JobConfiguration) -> u32 {
    config
        .array
        .and_then(|a| a.element_count())
        .unwrap_or(1)
}

/// Slots a GPU request needs: GPU count times the type's slots per GPU.
pub fn minimum_slots_for_gpu(gpu: &GpuConfiguration, gpu_type: &GpuType) -> u64 {
    u64::from(gpu.count) * u64::from(gpu_type.slots_per_gpu)
}

/// Memory granted to the job (GB): slots times the per-slot allowance.
pub fn memory_estimate_gb(config: &JobConfiguration, catalog: &ClusterCatalog) -> u64 {
    u64::from(config.slots) * u64::from(catalog.policy().memory_per_slot_gb)
}

/// Queues suited to a kind and expected runtime, tightest limit first.
///
/// Queues whose maximum runtime is below `runtime` are left out; queues
/// without a limit come last.
pub fn suggested_queues<'c>(
    kind: JobKind,
    runtime: Option<Duration>,
    catalog: &'c ClusterCatalog,
) -> Vec<&'c QueueDefinition> {
    let mut queues: Vec<&QueueDefinition> = catalog
        .queues_for_kind(kind)
        .into_iter()
        .filter(|q| match (runtime, q.max_runtime) {
            (Some(needed), Some(max)) => needed <= max,
            _ => true,
        })
        .collect();

    if runtime.is_some() {
        // Stable sort keeps catalog order among equal limits.
        queues.sort_by_key(|q| q.max_runtime.unwrap_or(Duration::MAX));
    }
    queues
}

/// Whether `path` lies on the fast-scratch file system.
pub fn is_on_scratch(path: &str, catalog: &ClusterCatalog) -> bool {
    let root = catalog.policy().scratch_root.trim_end_matches('/');
    if root.is_empty() {
        return false;
    }
    path == root || path.strip_prefix(root).is_some_and(|rest| rest.starts_with('/'))
}

/// Whether any of the job's files use fast scratch storage.
pub fn uses_fast_scratch(config: &JobConfiguration, catalog: &ClusterCatalog) -> bool {
    [
        &config.output_file,
        &config.error_file,
        &config.working_directory,
    ]
    .into_iter()
    .flatten()
    .any(|p| is_on_scratch(p, catalog))
}
