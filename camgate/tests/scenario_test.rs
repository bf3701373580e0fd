//! End-to-end permission scenarios through the lifecycle adapter

use std::sync::Arc;

use camgate::{
    Action, CapabilityRequest, CoordinatorState, MemoryPermissionOracle, MemoryReadinessSink,
    Notice, PermissionConfig, PermissionLifecycle, PermissionLifecycleBuilder, RecordingHost,
    WatchReadinessSink,
};
use camgate_api::{Capability, GrantStatus, Outcome, RequestToken};

const T1: RequestToken = RequestToken(100);
const SETTINGS: RequestToken = RequestToken(101);

struct Harness {
    oracle: Arc<MemoryPermissionOracle>,
    host: Arc<RecordingHost>,
    readiness: Arc<MemoryReadinessSink>,
    lifecycle: PermissionLifecycle,
}

fn harness() -> Harness {
    let oracle = Arc::new(MemoryPermissionOracle::new());
    let host = Arc::new(RecordingHost::new());
    let readiness = Arc::new(MemoryReadinessSink::new());
    let lifecycle = PermissionLifecycleBuilder::new()
        .config(PermissionConfig::new("app.example.scanner").with_retry_after_rationale(false))
        .oracle_arc(oracle.clone())
        .host_arc(host.clone())
        .readiness_arc(readiness.clone())
        .build()
        .expect("Failed to build lifecycle");
    Harness {
        oracle,
        host,
        readiness,
        lifecycle,
    }
}

#[test]
fn test_first_launch_grant() {
    let mut h = harness();

    let action = h.lifecycle.on_start();
    assert_eq!(
        action,
        Action::Request(CapabilityRequest::new(T1, [Capability::Camera]))
    );
    assert_eq!(h.host.requests().len(), 1);

    h.oracle.grant(Capability::Camera);
    h.lifecycle
        .on_permission_result(T1, &[Capability::Camera], &[GrantStatus::Granted]);

    assert_eq!(
        h.lifecycle.state(),
        &CoordinatorState::Resolved(Outcome::AllGranted)
    );
    assert_eq!(h.readiness.count(), 1);
    assert!(h.readiness.events()[0].is_ready());
}

#[test]
fn test_denial_with_rationale_returns_to_idle() {
    let mut h = harness();
    h.lifecycle.on_start();

    h.oracle.deny(Capability::Camera);
    h.lifecycle
        .on_permission_result(T1, &[Capability::Camera], &[GrantStatus::Denied]);
    assert_eq!(
        h.lifecycle.state(),
        &CoordinatorState::ExplainingRationale {
            denied: vec![Capability::Camera]
        }
    );
    assert_eq!(h.host.rationales(), 1);

    h.lifecycle.on_rationale_acknowledged();
    assert_eq!(h.lifecycle.state(), &CoordinatorState::Idle);
    assert_eq!(h.readiness.count(), 0);
}

#[test]
fn test_permanent_denial_recovered_in_settings() {
    let mut h = harness();
    h.lifecycle.on_start();

    h.oracle.deny_permanently(Capability::Camera);
    h.lifecycle
        .on_permission_result(T1, &[Capability::Camera], &[GrantStatus::Denied]);
    assert!(matches!(
        h.lifecycle.state(),
        CoordinatorState::AwaitingSettingsReturn { .. }
    ));
    assert_eq!(h.host.settings_launches(), 1);

    // The user flips the switch in system settings
    h.oracle.grant(Capability::Camera);
    let action = h.lifecycle.on_settings_return(SETTINGS);

    assert_eq!(action, Action::Proceed(Outcome::AllGranted));
    assert_eq!(h.readiness.count_outcome(Outcome::AllGranted), 1);
    assert!(h.host.notices().contains(&Notice::AccessGranted));
}

#[test]
fn test_resume_while_granted_shows_no_dialog() {
    let mut h = harness();
    h.lifecycle.on_start();
    h.oracle.grant(Capability::Camera);
    h.lifecycle
        .on_permission_result(T1, &[Capability::Camera], &[GrantStatus::Granted]);
    h.host.clear();

    for _ in 0..3 {
        assert_eq!(h.lifecycle.on_resume(), Action::NoOp);
    }
    assert!(h.host.requests().is_empty());
    assert_eq!(h.readiness.count(), 1);
}

#[test]
fn test_mismatched_callback_never_grants() {
    let mut h = harness();
    h.lifecycle.on_start();
    h.oracle.deny(Capability::Camera);

    h.lifecycle.on_permission_result(
        T1,
        &[Capability::Camera],
        &[GrantStatus::Granted, GrantStatus::Granted],
    );
    assert_ne!(
        h.lifecycle.state(),
        &CoordinatorState::Resolved(Outcome::AllGranted)
    );
    assert_eq!(h.readiness.count(), 0);
}

#[test]
fn test_stale_callback_ignored() {
    let mut h = harness();
    h.lifecycle.on_start();

    let action = h.lifecycle.on_permission_result(
        RequestToken(42),
        &[Capability::Camera],
        &[GrantStatus::Granted],
    );
    assert_eq!(action, Action::NoOp);
    assert!(matches!(
        h.lifecycle.state(),
        CoordinatorState::AwaitingOsResponse { .. }
    ));
}

#[test]
fn test_permanent_denial_ends_partially_denied() {
    let mut h = harness();
    h.lifecycle.on_start();
    h.oracle.deny_permanently(Capability::Camera);
    h.lifecycle
        .on_permission_result(T1, &[Capability::Camera], &[GrantStatus::Denied]);

    let action = h.lifecycle.on_settings_return(SETTINGS);
    assert_eq!(action, Action::Proceed(Outcome::PartiallyDenied));
    assert!(h.host.notices().contains(&Notice::FeatureUnavailable));

    // Later resumes do not escalate again
    h.host.clear();
    assert_eq!(h.lifecycle.on_resume(), Action::NoOp);
    assert!(h.host.calls().is_empty());

    // Granting outside the app is picked up on the next resume
    h.oracle.grant(Capability::Camera);
    assert_eq!(
        h.lifecycle.on_resume(),
        Action::Proceed(Outcome::AllGranted)
    );
}

#[tokio::test]
async fn test_scanner_learns_readiness_after_the_fact() {
    let oracle = Arc::new(MemoryPermissionOracle::with_granted([Capability::Camera]));
    let readiness = Arc::new(WatchReadinessSink::new());
    let mut lifecycle = PermissionLifecycleBuilder::new()
        .config(PermissionConfig::new("app.example.scanner"))
        .oracle_arc(oracle)
        .host(RecordingHost::new())
        .readiness_arc(readiness.clone())
        .build()
        .expect("Failed to build lifecycle");

    // Announced before the scanner subscribes
    lifecycle.on_start();

    let rx = readiness.subscribe();
    let latest = *rx.borrow();
    assert!(latest.map(|r| r.is_ready()).unwrap_or(false));
}
