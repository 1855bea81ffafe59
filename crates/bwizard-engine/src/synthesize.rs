//! Command synthesizer.
//!
//! Renders a validated configuration into one `bsub` command line. Token
//! order is fixed and fields absent from the configuration are simply not
//! rendered:
//!
//! ```text
//! bsub -J "name[s-e:step]%t" -n N -q QUEUE [-app P] [-gpu "..."]
//!      [-W H:MM] [-We H:MM] [-o OUT] [-e ERR] [-cwd DIR] [-B] [-N]
//!      [-Is] [-XF] [-env "K=V"]... [-R "..."]... 'payload'
//! ```

use crate::derive;
use crate::error::EngineError;
use crate::validate::validate;
use bwizard_catalog::{ClusterCatalog, GpuType};
use bwizard_config::{GpuConfiguration, Issue, JobConfiguration, KindSettings};
use bwizard_parsers::{double_quote, format_runtime, shell_word, single_quote};
use std::fmt::Write;

/// Render the `bsub` command for a configuration.
///
/// Fails with [`EngineError::InvalidConfiguration`] while validation
/// reports any error.
pub fn synthesize(
    config: &JobConfiguration,
    catalog: &ClusterCatalog,
) -> Result<String, EngineError> {
    ensure_valid(config, catalog)?;
    let args = build_args(config, catalog)?;
    tracing::debug!(tokens = args.len(), "synthesized bsub command");
    Ok(args.join(" "))
}

/// Render a bash script that exports the environment and submits the job.
pub fn synthesize_script(
    config: &JobConfiguration,
    catalog: &ClusterCatalog,
) -> Result<String, EngineError> {
    let command = synthesize(config, catalog)?;
    let kind = config.kind().map(|k| k.as_str()).unwrap_or("unset");

    let mut script = String::new();
    script.push_str("#!/bin/bash\n\n");
    script.push_str("# Generated by bwizard\n");
    let _ = writeln!(script, "# Job: {}", config.name);
    let _ = writeln!(script, "# Type: {}", kind);
    script.push('\n');

    if !config.env.is_empty() {
        script.push_str("# Environment variables\n");
        for (name, value) in config.env.iter() {
            let _ = writeln!(script, "export {}={}", name, single_quote(value));
        }
        script.push('\n');
    }

    script.push_str("# Submit job\n");
    script.push_str(&command);
    script.push('\n');
    Ok(script)
}

fn ensure_valid(config: &JobConfiguration, catalog: &ClusterCatalog) -> Result<(), EngineError> {
    let errors: Vec<Issue> = validate(config, catalog)
        .into_iter()
        .filter(Issue::is_error)
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(EngineError::InvalidConfiguration { issues: errors })
    }
}

/// The `-gpu` resource string, e.g.
/// `num=2:mode=exclusive_process:gmodel=NVIDIAH100_80GB:nvlink=yes`.
pub fn gpu_resource_string(gpu: &GpuConfiguration, gpu_type: &GpuType) -> String {
    let mut clauses = vec![
        format!("num={}", gpu.count),
        format!("mode={}", gpu.mode),
    ];
    if gpu.mps {
        clauses.push("mps=yes".to_string());
    }
    if !gpu.exclusive_job {
        clauses.push("j_exclusive=no".to_string());
    }
    clauses.push(format!("gmodel={}", gpu_type.model_fragment));
    if let Some(vram) = gpu.min_vram.as_deref() {
        clauses.push(format!("gmem={}", vram));
    }
    if gpu.nvlink {
        clauses.push("nvlink=yes".to_string());
    }
    clauses.join(":")
}

fn job_name_arg(config: &JobConfiguration) -> String {
    let mut name = config.name.clone();
    if let Some(array) = config.array {
        if array.step > 1 {
            let _ = write!(name, "[{}-{}:{}]", array.start, array.end, array.step);
        } else {
            let _ = write!(name, "[{}-{}]", array.start, array.end);
        }
        if let Some(throttle) = array.throttle {
            let _ = write!(name, "%{}", throttle);
        }
    }
    double_quote(&name)
}

fn build_args(
    config: &JobConfiguration,
    catalog: &ClusterCatalog,
) -> Result<Vec<String>, EngineError> {
    let mut args = vec!["bsub".to_string()];

    args.push("-J".to_string());
    args.push(job_name_arg(config));

    args.push("-n".to_string());
    args.push(config.slots.to_string());

    if let Some(queue) = &config.queue {
        args.push("-q".to_string());
        args.push(shell_word(queue));
    }
    if let Some(profile) = config.application_profile() {
        args.push("-app".to_string());
        args.push(shell_word(profile));
    }

    if let Some(gpu) = config.gpu() {
        let gpu_type = catalog.require_gpu_type(&gpu.gpu_type)?;
        args.push("-gpu".to_string());
        args.push(double_quote(&gpu_resource_string(gpu, gpu_type)));
    }

    if let Some(limit) = derive::runtime_limit(config) {
        args.push("-W".to_string());
        args.push(format_runtime(limit));
    }
    if let Some(estimate) = derive::runtime_estimate(config) {
        args.push("-We".to_string());
        args.push(format_runtime(estimate));
    }

    let paths = [
        ("-o", &config.output_file),
        ("-e", &config.error_file),
        ("-cwd", &config.working_directory),
    ];
    for (flag, path) in paths {
        if let Some(path) = path {
            args.push(flag.to_string());
            args.push(shell_word(path));
        }
    }

    if config.notify_on_start {
        args.push("-B".to_string());
    }
    if config.notify_on_completion {
        args.push("-N".to_string());
    }

    if let Some(KindSettings::Interactive { x11_forwarding }) = &config.kind {
        args.push("-Is".to_string());
        if *x11_forwarding {
            args.push("-XF".to_string());
        }
    }

    for (name, value) in config.env.iter() {
        args.push("-env".to_string());
        args.push(double_quote(&format!("{}={}", name, value)));
    }

    for tag in &config.architectures {
        args.push("-R".to_string());
        args.push(double_quote(&format!("select[{}]", tag)));
    }
    for license in &config.licenses {
        args.push("-R".to_string());
        args.push(double_quote(&format!(
            "rusage[{}={}]",
            license.name, license.count
        )));
    }
    for resource in &config.resources {
        args.push("-R".to_string());
        args.push(double_quote(resource));
    }

    args.push(single_quote(&config.command));
    Ok(args)
}
