use super::*;

#[test]
fn parses_bare_gvk() {
    let reg = Registration::parse("example.org/v1/XDatabase").unwrap();
    assert_eq!(reg.composite.group, "example.org");
    assert_eq!(reg.composite.version, "v1");
    assert_eq!(reg.composite.kind, "XDatabase");
    assert!(reg.claim.is_none());
}

#[test]
fn parses_paired_gvk() {
    let reg = Registration::parse("example.org/v1/XDatabase=example.org/v1/Database").unwrap();
    assert_eq!(reg.composite.kind, "XDatabase");
    let claim = reg.claim.unwrap();
    assert_eq!(claim.kind, "Database");
}

#[test]
fn rejects_malformed_entry() {
    assert!(Registration::parse("not-a-gvk").is_err());
    assert!(Registration::parse("group/version").is_err());
}

#[test]
fn requeue_after_wraps_action() {
    let _action = requeue_after(Duration::from_secs(5));
}

#[test]
fn engine_config_defaults_without_env() {
    // SAFETY: test runs single-threaded within this process's test harness.
    unsafe {
        std::env::remove_var("XRM_COMPOSITE_KINDS");
        std::env::remove_var("XRM_ENABLE_LEADER_ELECTION");
    }
    let config = EngineConfig::from_env().unwrap();
    assert!(config.registrations.is_empty());
    assert!(config.leader_election.enabled);
    assert_eq!(config.leader_election.lease_name, "xrm-engine-leader");
}
