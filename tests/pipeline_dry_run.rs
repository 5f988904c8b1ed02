//! End-to-end driver runs with scheduler and workflow doubles.

mod common;

use std::fs;
use std::time::Duration;

use common::{fake_database, fixture_dir, RecordingEngine, RecordingScheduler, WaitBehaviour};
use juno_blast::pipeline::JOB_PREFIX;
use juno_blast::samples::BuildManifest;
use juno_blast::{
    ErrorKind, ExecutionMode, InputMode, PipelineDriver, PipelineError, RunSettings,
    SampleManifestBuilder, Stage,
};

fn settings(input: &std::path::Path, work: &std::path::Path) -> RunSettings {
    RunSettings::new(input, work.join("output")).with_config_dir(work.join("config"))
}

#[test]
fn workflow_dry_run_writes_sheet_and_parameters_without_submitting() {
    let input = fixture_dir(&["sample1.fasta", "sample2.fasta"]);
    let work = fixture_dir(&[]);
    let settings = settings(input.path(), work.path())
        .with_db_dir("fake_db")
        .with_dry_run(true);

    let driver = PipelineDriver::new(
        settings,
        SampleManifestBuilder::new(),
        RecordingScheduler::accepting(),
        RecordingEngine::default(),
    );
    let report = driver.run().expect("dry run succeeds");

    assert_eq!(report.manifest.len(), 2);
    assert!(driver.scheduler().submissions().is_empty());

    let sheet: serde_yaml::Value =
        serde_yaml::from_str(&fs::read_to_string(&report.sample_sheet).unwrap()).unwrap();
    assert!(sheet["sample1"]["assembly"].as_str().unwrap().ends_with("sample1.fasta"));
    assert!(sheet["sample2"]["assembly"].as_str().unwrap().ends_with("sample2.fasta"));

    let params: serde_yaml::Value =
        serde_yaml::from_str(&fs::read_to_string(&report.user_parameters).unwrap()).unwrap();
    assert_eq!(params["blast_db"].as_str(), Some("fake_db"));
}

#[test]
fn workflow_engine_receives_written_files() {
    let input = fixture_dir(&["sample1.fasta"]);
    let work = fixture_dir(&[]);
    let engine = RecordingEngine::default();
    let driver = PipelineDriver::new(
        settings(input.path(), work.path()).with_queue("highmem"),
        SampleManifestBuilder::new(),
        RecordingScheduler::accepting(),
        &engine,
    );
    driver.run().expect("run succeeds");

    let invocations = engine.invocations.lock().unwrap();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].sample_sheet, work.path().join("config/sample_sheet.yaml"));
    assert_eq!(invocations[0].queue, "highmem");
    assert!(work.path().join("output/log/cluster").is_dir());
}

#[test]
fn local_workflow_run_needs_no_cluster_logs() {
    let input = fixture_dir(&["sample1.fasta"]);
    let work = fixture_dir(&[]);
    let driver = PipelineDriver::new(
        settings(input.path(), work.path()).with_local(true),
        SampleManifestBuilder::new(),
        RecordingScheduler::accepting(),
        RecordingEngine::default(),
    );
    driver.run().expect("run succeeds");
    assert!(!work.path().join("output/log/cluster").exists());
}

#[test]
fn direct_dry_run_plans_one_job_per_assembly() {
    let input = fixture_dir(&["sample1.fasta", "sample2.fasta"]);
    let work = fixture_dir(&[]);
    let db = fake_database();
    let settings = settings(input.path(), work.path())
        .with_db_dir(db.path())
        .with_execution(ExecutionMode::Direct)
        .with_dry_run(true);

    let driver = PipelineDriver::new(
        settings,
        SampleManifestBuilder::new(),
        RecordingScheduler::accepting(),
        RecordingEngine::default(),
    );
    let report = driver.run().expect("dry run succeeds");

    assert_eq!(report.planned.len(), 2);
    assert!(report.completed.is_empty());
    assert!(driver.scheduler().submissions().is_empty());
    assert_eq!(driver.scheduler().wait_calls(), 0);
    assert!(report.planned[0].job.as_str().starts_with(JOB_PREFIX));
    assert!(report.planned[0].command.contains("sample1_blastresults.asn"));
}

#[test]
fn direct_run_submits_and_waits_per_sample() {
    let input = fixture_dir(&["sample1.fasta", "sample2.fasta"]);
    let work = fixture_dir(&[]);
    let db = fake_database();
    let settings = settings(input.path(), work.path())
        .with_db_dir(db.path())
        .with_execution(ExecutionMode::Direct)
        .with_resources(8, 4);

    let driver = PipelineDriver::new(
        settings,
        SampleManifestBuilder::new(),
        RecordingScheduler::accepting(),
        RecordingEngine::default(),
    );
    let report = driver.run().expect("run succeeds");

    let submitted = driver.scheduler().submissions();
    assert_eq!(submitted.len(), 2);
    assert_ne!(submitted[0].name(), submitted[1].name());
    assert!(submitted.iter().all(|r| r.threads() == 4 && r.queue() == "bio"));
    assert_eq!(report.completed.len(), 2);
    assert!(work.path().join("output/log").is_dir());
}

#[test]
fn empty_input_aborts_before_any_submission() {
    let input = fixture_dir(&["notes.txt"]);
    let work = fixture_dir(&[]);
    let db = fake_database();
    let driver = PipelineDriver::new(
        settings(input.path(), work.path())
            .with_db_dir(db.path())
            .with_execution(ExecutionMode::Direct),
        SampleManifestBuilder::new(),
        RecordingScheduler::accepting(),
        RecordingEngine::default(),
    );

    let err = driver.run().unwrap_err();
    assert_eq!(err.stage(), Stage::Discovery);
    assert_eq!(err.kind(), ErrorKind::EmptyManifest);
    assert!(driver.scheduler().submissions().is_empty());
    assert!(!work.path().join("config/sample_sheet.yaml").exists());
}

#[test]
fn direct_run_without_assemblies_is_a_hard_stop() {
    let input = fixture_dir(&["s1_R1.fastq.gz", "s1_R2.fastq.gz"]);
    let work = fixture_dir(&[]);
    let db = fake_database();
    let driver = PipelineDriver::new(
        settings(input.path(), work.path())
            .with_db_dir(db.path())
            .with_input_mode(InputMode::ReadsOnly)
            .with_execution(ExecutionMode::Direct),
        SampleManifestBuilder::new(),
        RecordingScheduler::accepting(),
        RecordingEngine::default(),
    );

    let err = driver.run().unwrap_err();
    assert_eq!(err.stage(), Stage::Preflight);
    assert_eq!(err.kind(), ErrorKind::EmptyManifest);
    assert!(driver.scheduler().submissions().is_empty());
    assert!(!work.path().join("output/log").exists());
}

#[test]
fn incomplete_database_fails_preflight() {
    let input = fixture_dir(&["sample1.fasta"]);
    let work = fixture_dir(&[]);
    let driver = PipelineDriver::new(
        settings(input.path(), work.path())
            .with_db_dir(work.path())
            .with_execution(ExecutionMode::Direct),
        SampleManifestBuilder::new(),
        RecordingScheduler::accepting(),
        RecordingEngine::default(),
    );

    let err = driver.run().unwrap_err();
    assert_eq!(err.stage(), Stage::Preflight);
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(driver.scheduler().submissions().is_empty());
}

#[test]
fn first_rejection_stops_the_batch() {
    let input = fixture_dir(&["sample1.fasta", "sample2.fasta"]);
    let work = fixture_dir(&[]);
    let db = fake_database();
    let driver = PipelineDriver::new(
        settings(input.path(), work.path())
            .with_db_dir(db.path())
            .with_execution(ExecutionMode::Direct),
        SampleManifestBuilder::new(),
        RecordingScheduler::rejecting(),
        RecordingEngine::default(),
    );

    let err = driver.run().unwrap_err();
    assert_eq!(err.stage(), Stage::Submission);
    assert!(err.to_string().starts_with("submission failed"));
    assert_eq!(driver.scheduler().submissions().len(), 1);
    assert_eq!(driver.scheduler().wait_calls(), 0);
}

#[test]
fn wait_timeout_surfaces_as_wait_stage() {
    let input = fixture_dir(&["sample1.fasta"]);
    let work = fixture_dir(&[]);
    let db = fake_database();
    let driver = PipelineDriver::new(
        settings(input.path(), work.path())
            .with_db_dir(db.path())
            .with_execution(ExecutionMode::Direct)
            .with_wait_timeout(Some(Duration::from_millis(10))),
        SampleManifestBuilder::new(),
        RecordingScheduler::with_wait(WaitBehaviour::Hang),
        RecordingEngine::default(),
    );

    let err = driver.run().unwrap_err();
    assert_eq!(err.stage(), Stage::Wait);
    assert!(matches!(err, PipelineError::Job(_)));
}

#[test]
fn workflow_failure_is_reported() {
    let input = fixture_dir(&["sample1.fasta"]);
    let work = fixture_dir(&[]);
    let driver = PipelineDriver::new(
        settings(input.path(), work.path()),
        SampleManifestBuilder::new(),
        RecordingScheduler::accepting(),
        RecordingEngine {
            fail: true,
            ..Default::default()
        },
    );
    assert_eq!(driver.run().unwrap_err().stage(), Stage::Workflow);
}

#[test]
fn custom_discovery_can_be_injected() {
    struct Failing;
    impl BuildManifest for Failing {
        fn build_manifest(
            &self,
            directory: &std::path::Path,
            _mode: juno_blast::InputMode,
        ) -> Result<juno_blast::Manifest, juno_blast::DiscoveryError> {
            Err(juno_blast::DiscoveryError::InvalidInput {
                path: directory.to_path_buf(),
                reason: "rejected by test",
            })
        }
    }

    let work = fixture_dir(&[]);
    let driver = PipelineDriver::new(
        settings(work.path(), work.path()),
        Failing,
        RecordingScheduler::accepting(),
        RecordingEngine::default(),
    );
    let err = driver.run().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}
