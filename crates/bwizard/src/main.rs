//! bwizard - build, check and price LSF bsub commands.

use bwizard_catalog::{ClusterCatalog, JobKind};
use bwizard_cli::{Args, Command};
use bwizard_config::{JobConfiguration, RecordStore};
use bwizard_engine::derive;
use bwizard_parsers::{describe_runtime, non_empty_string, parse_runtime};
use bwizard_session::Session;
use camino::Utf8Path;
use clap::Parser;
use miette::{miette, IntoDiagnostic, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let catalog = Arc::new(load_catalog(args.catalog.as_deref())?);

    match args.command {
        Command::Check { record } => check(catalog, &record),
        Command::Cost { record } => cost(catalog, &record),
        Command::Generate { record, script } => generate(catalog, &record, script),
        Command::Queues { kind, runtime } => list_queues(&catalog, kind, runtime.as_deref()),
        Command::Template { kind, name } => template(kind, name.as_deref()),
    }
}

/// Log to stderr so generated commands can be piped straight to a shell.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_catalog(path: Option<&Utf8Path>) -> Result<ClusterCatalog> {
    let Some(path) = path else {
        return Ok(ClusterCatalog::reference());
    };
    let text = std::fs::read_to_string(path).into_diagnostic()?;
    let catalog: ClusterCatalog = serde_json::from_str(&text).into_diagnostic()?;
    tracing::debug!(
        queues = catalog.queues().len(),
        "Loaded cluster catalog from {}",
        path
    );
    Ok(catalog)
}

fn open_session(catalog: Arc<ClusterCatalog>, path: &Utf8Path) -> Result<Session> {
    let text = RecordStore::new(path).load_text().into_diagnostic()?;
    let mut session = Session::new(catalog);
    session.load_json(&text);
    Ok(session)
}

fn check(catalog: Arc<ClusterCatalog>, path: &Utf8Path) -> Result<()> {
    let session = open_session(catalog, path)?;
    let config = session.config();

    for issue in session.current_issues() {
        println!("{}", issue);
    }

    if config.kind().is_some() {
        println!(
            "note: {} slot(s) grant about {} GB of memory",
            config.slots,
            derive::memory_estimate_gb(config, session.catalog())
        );
    }
    if let Some(limit) = derive::effective_runtime(config, session.catalog()) {
        println!("note: the job may run for up to {}", describe_runtime(limit));
    }
    if derive::uses_fast_scratch(config, session.catalog()) {
        println!("note: job files are on fast scratch storage");
    }

    if session.has_errors() {
        return Err(miette!("{} has blocking errors", path));
    }
    println!("{}: ok", path);
    Ok(())
}

fn cost(catalog: Arc<ClusterCatalog>, path: &Utf8Path) -> Result<()> {
    let session = open_session(catalog, path)?;
    let Some(cost) = session.current_cost_estimate() else {
        println!("No metered resources: only GPU time is billed");
        return Ok(());
    };

    println!("Hourly rate:    ${:.2}", cost.hourly_rate);
    if cost.runtime_assumed {
        println!("Hours:          {:.2} (no runtime limit set, assumed)", cost.hours);
    } else {
        println!("Hours:          {:.2}", cost.hours);
    }
    if cost.array_elements > 1 {
        println!("Array elements: {}", cost.array_elements);
    }
    println!("Estimated cost: ${:.2}", cost.total);
    if cost.throttled {
        println!("(throttled array: wall-clock spend may be lower)");
    }
    Ok(())
}

fn generate(catalog: Arc<ClusterCatalog>, path: &Utf8Path, script: bool) -> Result<()> {
    let session = open_session(catalog, path)?;
    for issue in session.current_issues().iter().filter(|i| !i.is_error()) {
        tracing::warn!("{}", issue);
    }

    let output = if script {
        session.generate_script()
    } else {
        session.generate()
    }
    .into_diagnostic()?;

    if script {
        print!("{}", output);
    } else {
        println!("{}", output);
    }
    Ok(())
}

fn list_queues(
    catalog: &ClusterCatalog,
    kind: Option<JobKind>,
    runtime: Option<&str>,
) -> Result<()> {
    let runtime = runtime.map(parse_runtime).transpose().into_diagnostic()?;
    let queues = match kind {
        Some(kind) => derive::suggested_queues(kind, runtime, catalog),
        None => catalog.queues().iter().collect(),
    };
    if queues.is_empty() {
        println!("No queue accepts that runtime");
    }

    for queue in queues {
        let kinds: Vec<&str> = queue.allowed_kinds.iter().map(JobKind::as_str).collect();
        let limit = queue
            .max_runtime
            .map(describe_runtime)
            .unwrap_or_else(|| "no limit".to_string());
        println!("{:<14} {:<20} {:<12} {}", queue.name, kinds.join(","), limit, queue.description);

        let gpus = catalog.gpu_types_compatible_with(&queue.name);
        if !gpus.is_empty() {
            let names: Vec<String> = gpus.iter().map(|g| g.display_name()).collect();
            println!("{:<14} GPUs: {}", "", names.join(", "));
        }
    }
    Ok(())
}

fn template(kind: JobKind, name: Option<&str>) -> Result<()> {
    let mut config = JobConfiguration::new(kind);
    if let Some(name) = name.and_then(non_empty_string) {
        config.name = name;
    }
    println!("{}", config.to_record().to_json().into_diagnostic()?);
    Ok(())
}
