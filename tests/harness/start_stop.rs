use std::time::Duration;

use hostrig::{HarnessError, LifecycleRegistry, Readiness};

use crate::common::*;

#[tokio::test]
async fn start_reaches_ready_and_stop_tears_down() {
    let sandbox = Sandbox::new();
    let registry = LifecycleRegistry::new(sandbox.config("serve"));

    let port = registry.start().await.expect("stub host should start");
    let instance = registry.instance();
    assert_eq!(instance.readiness, Readiness::Ready);
    assert_eq!(instance.port, Some(port));
    assert_eq!(
        instance.base_uri.as_deref(),
        Some(format!("http://localhost:{port}/").as_str())
    );
    let pid = instance.pid.expect("pid recorded once confirmed alive");
    let root = instance.root_dir.clone().expect("runtime directory recorded");
    assert!(root.join("host.toml").is_file());
    assert!(root.join("logs").is_dir());

    let body = reqwest::get(format!("http://localhost:{port}/"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body.trim(), "modules: markup, static");

    registry.stop();
    assert!(
        wait_for_exit(pid, Duration::from_secs(10)).await,
        "server process {pid} should be gone after stop"
    );
    assert!(!root.exists(), "runtime directory should be removed");
    assert_eq!(registry.instance().readiness, Readiness::Unstarted);
    assert!(sandbox.runs().is_empty());
}

#[tokio::test]
async fn repeated_stop_is_a_no_op() {
    let sandbox = Sandbox::new();
    let registry = LifecycleRegistry::new(sandbox.config("serve"));
    registry.start().await.unwrap();

    registry.stop();
    let after_first = registry.instance();
    registry.stop();
    registry.stop();
    assert_eq!(registry.instance(), after_first);
    assert!(sandbox.runs().is_empty());
}

#[tokio::test]
async fn second_start_is_rejected_without_spawning() {
    let sandbox = Sandbox::new();
    let registry = LifecycleRegistry::new(sandbox.config("serve"));
    registry.start().await.unwrap();
    let before = registry.instance();

    let err = registry.start().await.unwrap_err();
    assert!(
        matches!(err, HarnessError::AlreadyStarted { readiness: Readiness::Ready }),
        "got {err:?}"
    );
    assert_eq!(registry.instance(), before);
    assert_eq!(sandbox.runs().len(), 1);

    registry.stop();
}

#[tokio::test]
async fn concurrent_callers_share_one_server() {
    let sandbox = Sandbox::new();
    let registry = LifecycleRegistry::new(sandbox.config("serve"));

    let (a, b, c) = tokio::join!(
        registry.server_uri(),
        registry.server_uri(),
        registry.server_uri()
    );
    let a = a.unwrap();
    assert_eq!(a, b.unwrap());
    assert_eq!(a, c.unwrap());
    assert_eq!(sandbox.runs().len(), 1);

    let address = registry.server_address().await.unwrap();
    assert_eq!(address.host, "localhost");
    assert_eq!(Some(address.port), registry.instance().port);

    registry.stop();
}

#[tokio::test]
async fn overlapping_starts_spawn_one_server() {
    let sandbox = Sandbox::new();
    let registry = LifecycleRegistry::new(sandbox.config("serve"));

    let (first, second) = tokio::join!(registry.start(), registry.start());
    let (port, rejected) = match (first, second) {
        (Ok(port), Err(err)) | (Err(err), Ok(port)) => (port, err),
        other => panic!("expected one start to win, got {other:?}"),
    };
    assert!(
        matches!(rejected, HarnessError::AlreadyStarted { readiness: Readiness::Ready }),
        "got {rejected:?}"
    );
    assert_eq!(registry.instance().port, Some(port));
    assert_eq!(sandbox.runs().len(), 1);

    registry.stop();
    assert!(sandbox.runs().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_works_on_a_multi_threaded_runtime() {
    let sandbox = Sandbox::new();
    let registry = LifecycleRegistry::new(sandbox.config("serve"));
    registry.start().await.unwrap();
    let pid = registry.instance().pid.unwrap();

    registry.stop();
    assert!(wait_for_exit(pid, Duration::from_secs(10)).await);
    assert!(sandbox.runs().is_empty());
}

#[tokio::test]
async fn stopped_registry_starts_fresh() {
    let sandbox = Sandbox::new();
    let registry = LifecycleRegistry::new(sandbox.config("serve"));

    registry.start().await.unwrap();
    let first = registry.instance();
    registry.stop();

    registry.start().await.unwrap();
    let second = registry.instance();
    assert_ne!(first.root_dir, second.root_dir);
    assert_ne!(first.pid, second.pid);
    assert_eq!(sandbox.runs().len(), 1);

    registry.stop();
}

#[tokio::test]
async fn dropping_the_registry_tears_down() {
    let sandbox = Sandbox::new();
    let registry = LifecycleRegistry::new(sandbox.config("serve"));
    registry.start().await.unwrap();
    let pid = registry.instance().pid.unwrap();

    drop(registry);
    assert!(wait_for_exit(pid, Duration::from_secs(10)).await);
    assert!(sandbox.runs().is_empty());
}
