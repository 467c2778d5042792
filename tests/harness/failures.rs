use std::time::{Duration, Instant};

use assert_fs::prelude::*;
use hostrig::{HarnessError, LifecycleRegistry, Readiness};
use predicates::prelude::*;

use crate::common::*;

#[tokio::test]
async fn launch_failure_surfaces_error_log_and_cleans_up() {
    let sandbox = Sandbox::new();
    let mut config = sandbox.config("fail");
    config
        .extra_sections
        .get_mut("stub")
        .unwrap()
        .insert("message".into(), "ImportError: no module foo".into());
    let registry = LifecycleRegistry::new(config);

    let err = registry.start().await.unwrap_err();
    match &err {
        HarnessError::Launch {
            code, error_log, ..
        } => {
            assert_eq!(*code, Some(1));
            assert!(error_log.contains("ImportError: no module foo"), "log: {error_log}");
        }
        other => panic!("expected Launch, got {other:?}"),
    }

    let instance = registry.instance();
    assert_eq!(instance.readiness, Readiness::Failed);
    assert_eq!(instance.pid, None);
    assert!(sandbox.runs().is_empty());
}

#[tokio::test]
async fn clean_exit_without_pid_file() {
    let sandbox = Sandbox::new();
    let registry = LifecycleRegistry::new(sandbox.config("no-pid"));

    let err = registry.start().await.unwrap_err();
    assert!(matches!(err, HarnessError::PidFileMissing { .. }), "got {err:?}");
    assert!(sandbox.runs().is_empty());
}

#[tokio::test]
async fn dead_pid_is_rejected() {
    let sandbox = Sandbox::new();
    let registry = LifecycleRegistry::new(sandbox.config("dead-pid"));

    let err = registry.start().await.unwrap_err();
    assert!(matches!(err, HarnessError::ProcessNotAlive { .. }), "got {err:?}");
    assert_eq!(registry.instance().pid, None);
    assert!(sandbox.runs().is_empty());
}

#[tokio::test]
async fn silent_host_times_out_and_is_killed() {
    let sandbox = Sandbox::new();
    let mut config = sandbox.config("silent");
    config.ready_timeout = Duration::from_secs(1);
    // Keep the directory so the daemon's PID can be checked afterwards.
    config.retain_on_exit = true;
    let registry = LifecycleRegistry::new(config);

    let started = Instant::now();
    let err = registry.start().await.unwrap_err();
    let elapsed = started.elapsed();
    assert!(matches!(err, HarnessError::ReadinessTimeout { .. }), "got {err:?}");
    assert!(elapsed < Duration::from_secs(10), "start took {elapsed:?}");
    assert_eq!(registry.instance().readiness, Readiness::Failed);

    let runs = sandbox.runs();
    assert_eq!(runs.len(), 1);
    let pid: u32 = std::fs::read_to_string(runs[0].join("logs/host.pid"))
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert!(
        wait_for_exit(pid, Duration::from_secs(10)).await,
        "daemon {pid} should not outlive a failed start"
    );
}

#[tokio::test]
async fn retained_directory_survives_failure() {
    let sandbox = Sandbox::new();
    let mut config = sandbox.config("fail");
    config.retain_on_exit = true;
    let registry = LifecycleRegistry::new(config);

    registry.start().await.unwrap_err();
    registry.stop();

    let runs = sandbox.runs();
    assert_eq!(runs.len(), 1);
    let run = sandbox
        .dir
        .child("runs")
        .child(runs[0].file_name().unwrap());
    run.child("host.toml").assert(predicate::path::is_file());
    run.child("logs/error.log")
        .assert(predicate::str::contains("stub host refused to start"));
}

#[tokio::test]
async fn failed_start_can_be_retried() {
    let sandbox = Sandbox::new();
    let registry = LifecycleRegistry::new(sandbox.config("no-pid"));
    registry.start().await.unwrap_err();

    // Same registry, still Failed; a second attempt runs the full sequence.
    let err = registry.start().await.unwrap_err();
    assert!(matches!(err, HarnessError::PidFileMissing { .. }));
    assert!(sandbox.runs().is_empty());
}

#[tokio::test]
async fn abandoned_start_releases_everything() {
    let sandbox = Sandbox::new();
    let mut config = sandbox.config("silent");
    config.ready_timeout = Duration::from_secs(30);
    // Keep the directory so the daemon's PID can be checked afterwards.
    config.retain_on_exit = true;
    let registry = LifecycleRegistry::new(config);

    let outcome = tokio::time::timeout(Duration::from_secs(2), registry.start()).await;
    assert!(outcome.is_err(), "start should still be waiting for readiness");

    let instance = registry.instance();
    assert_eq!(instance.readiness, Readiness::Failed);
    assert_eq!(instance.pid, None);
    assert_eq!(instance.root_dir, None);

    let runs = sandbox.runs();
    assert_eq!(runs.len(), 1);
    let pid: u32 = std::fs::read_to_string(runs[0].join("logs/host.pid"))
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert!(
        wait_for_exit(pid, Duration::from_secs(10)).await,
        "daemon {pid} should not outlive an abandoned start"
    );
}

#[tokio::test]
async fn abandoned_start_does_not_block_the_next_one() {
    let sandbox = Sandbox::new();
    let mut config = sandbox.config("silent");
    config.ready_timeout = Duration::from_secs(30);
    let registry = LifecycleRegistry::new(config);

    let _ = tokio::time::timeout(Duration::from_secs(2), registry.start()).await;
    assert!(sandbox.runs().is_empty());

    // A fresh attempt runs its own sequence instead of hitting AlreadyStarted.
    let outcome = tokio::time::timeout(Duration::from_secs(2), registry.start()).await;
    assert!(outcome.is_err(), "second start should be waiting, not rejected");
    assert!(sandbox.runs().is_empty());
    assert_eq!(registry.instance().readiness, Readiness::Failed);
}
