use bwizard_catalog::{ClusterCatalog, JobKind};
use bwizard_config::{
    ArraySpec, Field, GpuConfiguration, GpuMode, JobConfiguration, LicenseRequest, RecordStore,
    Severity,
};
use bwizard_session::Session;
use camino::Utf8Path;
use std::sync::Arc;
use tempfile::TempDir;

fn catalog() -> Arc<ClusterCatalog> {
    Arc::new(ClusterCatalog::reference())
}

fn gpu_session() -> Session {
    let mut session = Session::new(catalog());
    session
        .update(|c| {
            c.set_kind(JobKind::Gpu);
            c.name = "train".to_string();
            c.command = "python train.py --epochs 10".to_string();
            c.slots = 24;
            c.queue = Some("gpu_h100".to_string());
            c.runtime_limit = Some("12:00".to_string());
            c.output_file = Some("/groups/lab/train.%J.out".to_string());
            c.env.set("WANDB_MODE", "offline");
            let mut gpu = GpuConfiguration::new("h100", 2);
            gpu.nvlink = true;
            gpu.min_vram = Some("60G".to_string());
            c.set_gpu(Some(gpu))
        })
        .unwrap();
    session
}

#[test]
fn round_trip_is_validation_equivalent() {
    let original = gpu_session();
    assert!(!original.has_errors(), "{:?}", original.current_issues());

    let json = original.to_portable_record().to_json().unwrap();
    let mut restored = Session::new(catalog());
    restored.load_json(&json);

    assert!(restored.record_issues().is_empty());
    assert_eq!(restored.config(), original.config());
    assert_eq!(restored.current_issues(), original.current_issues());
    assert_eq!(restored.generate().unwrap(), original.generate().unwrap());
}

#[test]
fn round_trip_keeps_invalid_configurations_invalid() {
    let mut session = Session::new(catalog());
    session.update(|c| {
        c.set_kind(JobKind::Interactive);
        c.name = "bad name".to_string();
        c.array = Some(ArraySpec::new(9, 2).with_throttle(3));
        c.licenses.push(LicenseRequest {
            name: "matlab".to_string(),
            count: 0,
        });
    });

    let restored = Session::from_record(catalog(), &session.to_portable_record());
    assert_eq!(restored.current_issues(), session.current_issues());
    assert!(restored.generate().is_err());
}

#[test]
fn gpu_cost_is_tracked_across_edits() {
    let mut session = gpu_session();
    let cost = session.current_cost_estimate().unwrap();
    assert!((cost.total - 12.0).abs() < 1e-9);
    assert!(!cost.runtime_assumed);

    session.update(|c| c.runtime_limit = None);
    let cost = session.current_cost_estimate().unwrap();
    assert!(cost.runtime_assumed);
    assert!((cost.total - 1.0).abs() < 1e-9);
}

#[test]
fn interactive_on_local_queue_is_blocked() {
    let mut session = Session::new(catalog());
    session.update(|c| {
        c.set_kind(JobKind::Interactive);
        c.name = "explore".to_string();
        c.command = "bash".to_string();
        c.queue = Some("local".to_string());
    });

    assert!(
        session
            .current_issues()
            .iter()
            .any(|i| i.field == Field::Queue && i.severity == Severity::Error)
    );
    // Only GPU time is metered.
    assert!(session.current_cost_estimate().is_none());
    assert!(!session.preview_command().is_ready());
    assert!(session.generate().is_err());

    session.update(|c| c.queue = Some("interactive".to_string()));
    assert_eq!(
        session.generate().unwrap(),
        r#"bsub -J "explore" -n 1 -q interactive -Is 'bash'"#
    );
}

#[test]
fn switching_kind_drops_gpu_settings() {
    let mut session = gpu_session();
    session.update(|c| {
        c.set_kind(JobKind::Cpu);
        c.queue = Some("local".to_string());
    });
    assert!(session.config().gpu().is_none());
    assert!(session.current_cost_estimate().is_none());
    assert!(!session.generate().unwrap().contains("-gpu"));
}

#[test]
fn half_corrupt_file_is_salvaged() {
    let temp = TempDir::new().unwrap();
    let dir = Utf8Path::from_path(temp.path()).unwrap();
    let store = RecordStore::for_job(dir, "train");

    std::fs::write(
        store.path(),
        r#"{
            "job_type": "gpu",
            "job_name": "train",
            "command": "python train.py",
            "slots": "lots",
            "queue": "gpu_a100",
            "runtime_limit": "2:00",
            "gpu_config": {"gpu_type": "a100", "num_gpus": 1, "gpu_mode": "exclusive_process"}
        }"#,
    )
    .unwrap();

    assert!(store.load().is_err());

    let mut session = Session::new(catalog());
    session.load_json(&store.load_text().unwrap());

    let record_issues = session.record_issues();
    assert_eq!(record_issues.len(), 1);
    assert!(record_issues[0].message.contains("slots"));
    assert_eq!(record_issues[0].severity, Severity::Warning);

    // slots fell back to 1, which is too few for an A100.
    assert_eq!(session.config().slots, 1);
    assert!(session.has_errors());
    assert_eq!(session.config().gpu().map(|g| g.mode), Some(GpuMode::ExclusiveProcess));

    session.update(|c| c.slots = 12);
    assert_eq!(
        session.generate().unwrap(),
        concat!(
            r#"bsub -J "train" -n 12 -q gpu_a100 "#,
            r#"-gpu "num=1:mode=exclusive_process:gmodel=NVIDIAA100_SXM4_80GB" "#,
            r#"-W 2:00 'python train.py'"#
        )
    );
    assert_eq!(session.record_issues().len(), 1);

    session.reset();
    assert!(session.record_issues().is_empty());
}

#[test]
fn saved_session_reloads() {
    let temp = TempDir::new().unwrap();
    let dir = Utf8Path::from_path(temp.path()).unwrap();
    let session = gpu_session();
    let store = RecordStore::for_job(dir, &session.config().name);
    store.save(&session.to_portable_record()).unwrap();

    let loaded = Session::from_record(catalog(), &store.load().unwrap());
    assert_eq!(loaded.config(), session.config());
    assert_eq!(
        loaded.generate_script().unwrap(),
        session.generate_script().unwrap()
    );
}

#[test]
fn unchanged_defaults_round_trip() {
    let session = Session::new(catalog());
    let restored = Session::from_record(catalog(), &session.to_portable_record());
    assert_eq!(restored.config(), &JobConfiguration::default());
    assert_eq!(restored.current_issues(), session.current_issues());
}
