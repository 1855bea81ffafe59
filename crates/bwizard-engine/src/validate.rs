//! Validation engine.
//!
//! Every rule inspects the configuration independently and pushes zero or
//! more issues. The combined list is stable-sorted by field so output order
//! never depends on rule order.

use crate::derive;
use bwizard_catalog::{ClusterCatalog, JobKind, QueueDefinition};
use bwizard_config::{Field, GpuMode, Issue, JobConfiguration, Severity};
use bwizard_parsers::{describe_runtime, parse_memory_mb, parse_runtime};
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};

static JOB_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-]+$").unwrap());

static ENV_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

static RESOURCE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap());

static DESTRUCTIVE: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"rm\s+-rf\s+/(\s|\*|$)",
        r":\(\)\s*\{.*\|.*&.*\}\s*;\s*:",
        r">\s*/dev/sd[a-z]",
        r"sudo\s+rm\b",
    ])
    .unwrap()
});

/// Check a configuration against the catalog.
///
/// Never fails: malformed input always comes back as issues.
pub fn validate(config: &JobConfiguration, catalog: &ClusterCatalog) -> Vec<Issue> {
    let queue = derive::queue(config, catalog);
    let mut issues = Vec::new();

    check_kind(config, &mut issues);
    check_name(config, catalog, &mut issues);
    check_command(config, &mut issues);
    check_slots(config, catalog, queue, &mut issues);
    check_queue(config, catalog, queue, &mut issues);
    check_runtime(config, queue, &mut issues);
    check_files(config, &mut issues);
    check_gpu(config, catalog, queue, &mut issues);
    check_array(config, catalog, &mut issues);
    check_environment(config, catalog, &mut issues);
    check_architectures(config, catalog, queue, &mut issues);
    check_licenses(config, catalog, &mut issues);
    check_resources(config, &mut issues);

    issues.sort_by_key(|issue| issue.field);

    tracing::debug!(
        errors = issues.iter().filter(|i| i.severity == Severity::Error).count(),
        warnings = issues.iter().filter(|i| i.severity == Severity::Warning).count(),
        "validated job configuration"
    );
    issues
}

fn check_kind(config: &JobConfiguration, issues: &mut Vec<Issue>) {
    if config.kind.is_none() {
        let kinds: Vec<&str> = JobKind::ALL.iter().map(JobKind::as_str).collect();
        issues.push(Issue::error(
            Field::JobKind,
            format!("Select a job type ({})", kinds.join(", ")),
        ));
    }
}

fn check_name(config: &JobConfiguration, catalog: &ClusterCatalog, issues: &mut Vec<Issue>) {
    let policy = catalog.policy();
    let name = config.name.as_str();

    let problem = if name.trim().is_empty() {
        Some("Job name is required".to_string())
    } else if name.chars().any(char::is_whitespace) {
        Some("Job name cannot contain spaces".to_string())
    } else if name.chars().count() > policy.max_job_name_len {
        Some(format!(
            "Job name must be {} characters or less",
            policy.max_job_name_len
        ))
    } else if !JOB_NAME.is_match(name) {
        Some("Job name can only contain letters, numbers, underscores, and hyphens".to_string())
    } else if policy
        .reserved_job_names
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        Some(format!("Job name \"{}\" is reserved by the scheduler", name))
    } else {
        None
    };

    if let Some(message) = problem {
        issues.push(Issue::error(Field::JobName, message));
    }
}

fn check_command(config: &JobConfiguration, issues: &mut Vec<Issue>) {
    if config.command.trim().is_empty() {
        issues.push(Issue::error(Field::Command, "Command is required"));
    } else if DESTRUCTIVE.is_match(&config.command) {
        issues.push(Issue::warning(
            Field::Command,
            "Command contains a potentially destructive pattern",
        ));
    }
}

fn check_slots(
    config: &JobConfiguration,
    catalog: &ClusterCatalog,
    queue: Option<&QueueDefinition>,
    issues: &mut Vec<Issue>,
) {
    let slots = config.slots;
    if slots == 0 {
        issues.push(Issue::error(Field::Slots, "Number of slots must be at least 1"));
        return;
    }

    if let Some(ceiling) = catalog.slot_ceiling(queue)
        && slots > ceiling
    {
        let scope = match queue {
            Some(q) => format!("in queue {}", q.name),
            None => "on any node".to_string(),
        };
        issues.push(Issue::error(
            Field::Slots,
            format!("Number of slots cannot exceed {} {}", ceiling, scope),
        ));
    }

    if config.kind() == Some(JobKind::Mpi) {
        let mut node_cores: Vec<u32> = catalog
            .assignable_node_types(queue)
            .iter()
            .map(|n| n.cores)
            .filter(|&c| c > 0)
            .collect();
        node_cores.sort_unstable();
        node_cores.dedup();

        if !node_cores.is_empty() && !node_cores.iter().any(|c| slots % c == 0) {
            let sizes: Vec<String> = node_cores.iter().map(u32::to_string).collect();
            issues.push(Issue::warning(
                Field::Slots,
                format!(
                    "{} slots do not fill whole nodes; MPI jobs run best with a multiple of {}",
                    slots,
                    sizes.join(" or ")
                ),
            ));
        }
    }
}

fn check_queue(
    config: &JobConfiguration,
    catalog: &ClusterCatalog,
    queue: Option<&QueueDefinition>,
    issues: &mut Vec<Issue>,
) {
    let Some(name) = config.queue.as_deref().filter(|n| !n.trim().is_empty()) else {
        issues.push(Issue::error(Field::Queue, "A queue must be selected"));
        return;
    };
    let Some(queue) = queue else {
        issues.push(Issue::error(Field::Queue, format!("Unknown queue \"{}\"", name)));
        return;
    };

    if let Some(kind) = config.kind()
        && !queue.accepts(kind)
    {
        let options: Vec<&str> = catalog
            .queues_for_kind(kind)
            .iter()
            .map(|q| q.name.as_str())
            .collect();
        issues.push(Issue::error(
            Field::Queue,
            format!(
                "Queue {} does not accept {} jobs (use one of: {})",
                queue.name,
                kind,
                options.join(", ")
            ),
        ));
    }

    if config.kind() == Some(JobKind::Mpi) {
        match config.application_profile() {
            Some(profile) if !queue.application_profiles.iter().any(|p| p == profile) => {
                let message = if queue.application_profiles.is_empty() {
                    format!("Queue {} offers no application profiles", queue.name)
                } else {
                    format!(
                        "Application profile \"{}\" is not offered by queue {} (available: {})",
                        profile,
                        queue.name,
                        queue.application_profiles.join(", ")
                    )
                };
                issues.push(Issue::error(Field::ApplicationProfile, message));
            }
            None if !queue.application_profiles.is_empty() => {
                issues.push(Issue::warning(
                    Field::ApplicationProfile,
                    format!(
                        "Queue {} expects an application profile such as {}",
                        queue.name, queue.application_profiles[0]
                    ),
                ));
            }
            _ => {}
        }
    }
}

fn check_runtime(
    config: &JobConfiguration,
    queue: Option<&QueueDefinition>,
    issues: &mut Vec<Issue>,
) {
    let limit = match config.runtime_limit.as_deref() {
        None => {
            if config.kind() != Some(JobKind::Interactive) {
                let message = match queue.and_then(|q| q.default_runtime) {
                    Some(default) => format!(
                        "No runtime limit set; the queue default of {} applies",
                        describe_runtime(default)
                    ),
                    None => "No runtime limit set; the queue default applies".to_string(),
                };
                issues.push(Issue::warning(Field::RuntimeLimit, message));
            }
            None
        }
        Some(raw) => match parse_runtime(raw) {
            Ok(limit) => Some(limit),
            Err(e) => {
                issues.push(Issue::error(Field::RuntimeLimit, format!("Runtime limit: {}", e)));
                None
            }
        },
    };

    if let (Some(limit), Some(queue)) = (limit, queue)
        && let Some(max) = queue.max_runtime
        && limit > max
    {
        issues.push(Issue::error(
            Field::RuntimeLimit,
            format!(
                "Runtime limit exceeds the {} maximum of queue {}",
                describe_runtime(max),
                queue.name
            ),
        ));
    }

    if let Some(raw) = config.runtime_estimate.as_deref() {
        match parse_runtime(raw) {
            Ok(estimate) if limit.is_some_and(|l| estimate > l) => {
                issues.push(Issue::warning(
                    Field::RuntimeEstimate,
                    "Runtime estimate is longer than the runtime limit",
                ));
            }
            Ok(_) => {}
            Err(e) => {
                issues.push(Issue::error(
                    Field::RuntimeEstimate,
                    format!("Runtime estimate: {}", e),
                ));
            }
        }
    }
}

fn check_files(config: &JobConfiguration, issues: &mut Vec<Issue>) {
    let paths = [
        (Field::OutputFile, "Output file", &config.output_file),
        (Field::ErrorFile, "Error file", &config.error_file),
        (Field::WorkingDirectory, "Working directory", &config.working_directory),
    ];
    for (field, label, path) in paths {
        if let Some(path) = path
            && !path.starts_with('/')
        {
            issues.push(Issue::error(
                field,
                format!("{} must be an absolute path (start with /)", label),
            ));
        }
    }

    if let (Some(out), Some(err)) = (&config.output_file, &config.error_file)
        && out == err
    {
        issues.push(Issue::warning(
            Field::ErrorFile,
            "Output and error files are the same; both streams will be interleaved",
        ));
    }

    if config.array.is_some() {
        let logs = [
            (Field::OutputFile, "Output file", &config.output_file),
            (Field::ErrorFile, "Error file", &config.error_file),
        ];
        for (field, label, path) in logs {
            if let Some(path) = path
                && !path.contains("%I")
            {
                issues.push(Issue::warning(
                    field,
                    format!("{} has no %I; array elements will overwrite each other", label),
                ));
            }
        }
    }
}

fn check_gpu(
    config: &JobConfiguration,
    catalog: &ClusterCatalog,
    queue: Option<&QueueDefinition>,
    issues: &mut Vec<Issue>,
) {
    if config.kind() != Some(JobKind::Gpu) {
        return;
    }
    let Some(gpu) = config.gpu() else {
        issues.push(Issue::error(Field::Gpu, "GPU configuration is required for GPU jobs"));
        return;
    };

    if gpu.count == 0 {
        issues.push(Issue::error(Field::Gpu, "Number of GPUs must be at least 1"));
    }
    if gpu.mode == GpuMode::Shared && gpu.nvlink {
        issues.push(Issue::warning(
            Field::Gpu,
            "NVLink implies exclusive GPU use; shared mode may not take effect",
        ));
    }

    if gpu.gpu_type.trim().is_empty() {
        issues.push(Issue::error(Field::Gpu, "GPU type selection is required"));
        return;
    }
    let Some(gpu_type) = catalog.gpu_type(&gpu.gpu_type) else {
        issues.push(Issue::error(
            Field::Gpu,
            format!("Unknown GPU type \"{}\"", gpu.gpu_type),
        ));
        return;
    };

    if let Some(queue) = queue
        && !queue.offers_gpu(&gpu_type.id)
    {
        let available: Vec<String> = catalog
            .gpu_types_compatible_with(&queue.name)
            .iter()
            .map(|g| g.display_name())
            .collect();
        let message = if available.is_empty() {
            format!("Queue {} has no GPUs", queue.name)
        } else {
            format!(
                "{} is not available in queue {} (available: {})",
                gpu_type.display_name(),
                queue.name,
                available.join(", ")
            )
        };
        issues.push(Issue::error(Field::Gpu, message));
    }

    if gpu.count > gpu_type.gpus_per_node {
        issues.push(Issue::warning(
            Field::Gpu,
            format!(
                "{} nodes hold {} GPU(s); {} GPUs will span several hosts",
                gpu_type.model, gpu_type.gpus_per_node, gpu.count
            ),
        ));
    }

    let required = derive::minimum_slots_for_gpu(gpu, gpu_type);
    if u64::from(config.slots) < required {
        issues.push(Issue::error(
            Field::Gpu,
            format!(
                "{} x {} needs at least {} slots ({} per GPU), but {} requested",
                gpu.count, gpu_type.model, required, gpu_type.slots_per_gpu, config.slots
            ),
        ));
    }

    if gpu.nvlink && !gpu_type.has_feature("nvlink") {
        issues.push(Issue::error(
            Field::Gpu,
            format!("{} has no NVLink", gpu_type.model),
        ));
    }

    if let Some(raw) = gpu.min_vram.as_deref() {
        match parse_memory_mb(raw) {
            Some(_) if raw.chars().any(char::is_whitespace) => issues.push(Issue::error(
                Field::Gpu,
                format!("Minimum GPU memory \"{}\" must not contain spaces", raw),
            )),
            None => issues.push(Issue::error(
                Field::Gpu,
                format!("Cannot parse minimum GPU memory \"{}\"", raw),
            )),
            Some(mb) if mb > u64::from(gpu_type.vram_gb) * 1024 => issues.push(Issue::error(
                Field::Gpu,
                format!(
                    "Minimum GPU memory {} exceeds the {}GB of {}",
                    raw, gpu_type.vram_gb, gpu_type.model
                ),
            )),
            Some(_) => {}
        }
    }
}

fn check_array(config: &JobConfiguration, catalog: &ClusterCatalog, issues: &mut Vec<Issue>) {
    let Some(array) = config.array else {
        return;
    };

    if config.kind() == Some(JobKind::Interactive) {
        issues.push(Issue::error(Field::Array, "Array jobs cannot be interactive"));
    }
    if array.start < 1 {
        issues.push(Issue::error(Field::Array, "Array start index must be at least 1"));
    }
    if array.start > array.end {
        issues.push(Issue::error(
            Field::Array,
            format!(
                "Array start index ({}) must not exceed end index ({})",
                array.start, array.end
            ),
        ));
    }
    if array.step == 0 {
        issues.push(Issue::error(Field::Array, "Array step must be at least 1"));
    }

    let count = array.element_count();
    let max = catalog.policy().max_array_elements;
    if let Some(count) = count
        && count > max
    {
        issues.push(Issue::error(
            Field::Array,
            format!("Array has {} elements; the maximum is {}", count, max),
        ));
    }

    match (array.throttle, count) {
        (Some(0), _) => {
            issues.push(Issue::error(Field::Array, "Array throttle must be at least 1"))
        }
        (Some(throttle), Some(count)) if throttle > count => issues.push(Issue::error(
            Field::Array,
            format!(
                "Array throttle ({}) exceeds the {} array elements",
                throttle, count
            ),
        )),
        _ => {}
    }
}

fn check_environment(config: &JobConfiguration, catalog: &ClusterCatalog, issues: &mut Vec<Issue>) {
    let policy = catalog.policy();
    for (name, value) in config.env.iter() {
        if !ENV_NAME.is_match(name) {
            issues.push(Issue::error(
                Field::Environment,
                format!(
                    "Invalid environment variable name \"{}\": use letters, digits and underscores, not starting with a digit",
                    name
                ),
            ));
            continue;
        }
        if policy.reserved_env_vars.iter().any(|r| r == name) {
            issues.push(Issue::warning(
                Field::Environment,
                format!("Overriding {} may break the job environment", name),
            ));
        }
        if value.len() > policy.max_env_value_len {
            issues.push(Issue::error(
                Field::Environment,
                format!(
                    "Value of {} is longer than {} characters",
                    name, policy.max_env_value_len
                ),
            ));
        }
    }
}

fn check_architectures(
    config: &JobConfiguration,
    catalog: &ClusterCatalog,
    queue: Option<&QueueDefinition>,
    issues: &mut Vec<Issue>,
) {
    let nodes = catalog.assignable_node_types(queue);
    for tag in &config.architectures {
        if tag.trim().is_empty() {
            issues.push(Issue::error(Field::Architecture, "Architecture requirement is empty"));
        } else if !nodes.iter().any(|n| n.supports(tag)) {
            let scope = match queue {
                Some(q) => format!("queue {}", q.name),
                None => "the cluster".to_string(),
            };
            issues.push(Issue::error(
                Field::Architecture,
                format!("No node in {} supports {}", scope, tag),
            ));
        }
    }
}

fn check_licenses(config: &JobConfiguration, catalog: &ClusterCatalog, issues: &mut Vec<Issue>) {
    let known = &catalog.policy().license_types;
    for license in &config.licenses {
        if license.name.trim().is_empty() {
            issues.push(Issue::error(Field::Licenses, "License name is empty"));
            continue;
        }
        if !RESOURCE_NAME.is_match(&license.name) {
            issues.push(Issue::error(
                Field::Licenses,
                format!(
                    "Invalid license name \"{}\": use letters, digits, '.', '_' and '-'",
                    license.name
                ),
            ));
            continue;
        }
        if license.count == 0 {
            issues.push(Issue::error(
                Field::Licenses,
                format!("License {} must request at least 1 seat", license.name),
            ));
        }
        if !known.iter().any(|k| k.eq_ignore_ascii_case(&license.name)) {
            issues.push(Issue::warning(
                Field::Licenses,
                format!("Unknown license type \"{}\"", license.name),
            ));
        }
    }
}

fn check_resources(config: &JobConfiguration, issues: &mut Vec<Issue>) {
    for (i, resource) in config.resources.iter().enumerate() {
        if resource.trim().is_empty() {
            issues.push(Issue::error(
                Field::Resources,
                format!("Resource requirement #{} is empty", i + 1),
            ));
        }
    }
}
