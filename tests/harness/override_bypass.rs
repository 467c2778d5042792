use hostrig::registry::OverrideAddress;
use hostrig::{LifecycleRegistry, Readiness};

use crate::common::*;

#[tokio::test]
async fn override_never_spawns_or_deletes() {
    let sandbox = Sandbox::new();
    let mut config = sandbox.config("fail");
    config.override_address = Some(OverrideAddress::parse("localhost:9999").unwrap());
    let registry = LifecycleRegistry::new(config);

    assert_eq!(registry.server_uri().await.unwrap(), "http://localhost:9999/");
    assert_eq!(registry.start().await.unwrap(), 9999);
    registry.stop();
    registry.stop();
    assert_eq!(registry.server_uri().await.unwrap(), "http://localhost:9999/");

    let instance = registry.instance();
    assert!(!instance.owns_process);
    assert_eq!(instance.readiness, Readiness::Ready);
    assert_eq!(instance.pid, None);
    assert!(sandbox.runs().is_empty());
}
