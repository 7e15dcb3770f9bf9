//! Architectural Contract Test: Idempotency
//!
//! This test verifies that converged resources produce no device writes.
//!
//! Constraints verified:
//! - A second commit with the same declaration and no external change is empty
//! - A fresh pass over a converged device reports every resource in sync
//! - Convergence survives a restart of the file-backed device
//!
//! If this test fails, every reconciliation pass will rewrite the device.

mod common;

use common::*;
use nxsync_core::device::{FileDevice, MemoryDevice};
use nxsync_core::engine::{CommitOutcome, Declared, ResourceProvider, ResourceStatus, run_pass};
use nxsync_core::entity::{Ace, AceKey, AceProperty, Afi, PortChannelGlobalProperty as Pc};
use nxsync_core::model::DesiredState;
use nxsync_core::SyncConfig;
use tempfile::tempdir;

fn full_declaration() -> DesiredState<Pc> {
    load_balance("src-dst", true, true, 4)
        .with(Pc::HashPoly, "CRC10c")
        .and_then(|d| d.with(Pc::Asymmetric, true))
        .and_then(|d| d.with(Pc::HashDistribution, "adaptive"))
        .and_then(|d| d.with(Pc::LoadDefer, 300))
        .and_then(|d| d.with(Pc::Resilient, true))
        .expect("well-typed declaration")
}

#[test]
fn second_commit_issues_no_writes() {
    let device = device_with_global();
    let mut controller = controller(&device, GLOBAL, full_declaration());

    let first = controller.commit().expect("first commit applies");
    assert!(matches!(first, CommitOutcome::Updated(ref s) if s.len() == 6));

    device.clear_writes();
    assert!(controller.plan().is_empty());

    let second = controller.commit().expect("second commit is empty");
    assert!(matches!(second, CommitOutcome::Updated(ref s) if s.is_empty()));
    assert!(device.writes().is_empty());
}

#[test]
fn fresh_pass_after_convergence_is_in_sync() {
    let device = device_with_global();
    controller(&device, GLOBAL, full_declaration())
        .commit()
        .expect("first commit applies");
    device.clear_writes();

    let again = controller(&device, GLOBAL, full_declaration());
    assert!(again.plan().is_empty());
}

#[test]
fn created_ace_is_in_sync_on_the_next_pass() {
    let key = AceKey::new(Afi::Ipv4, "web_in", 10);
    let desired = DesiredState::new()
        .with(AceProperty::Action, "permit")
        .and_then(|d| d.with(AceProperty::Proto, "tcp"))
        .and_then(|d| d.with(AceProperty::SrcAddr, "any"))
        .and_then(|d| d.with(AceProperty::DstAddr, "10.0.0.0/24"))
        .and_then(|d| d.with(AceProperty::DstPort, "eq 443"))
        .expect("well-typed declaration");
    let declared = vec![Declared::present(key.clone(), desired)];

    let device = MemoryDevice::new();
    let provider = ResourceProvider::<Ace, _>::new(&device);

    let first = provider.reconcile(declared.clone(), false).expect("pass runs");
    assert!(matches!(
        first.get(&key),
        Some(ResourceStatus::Applied(CommitOutcome::Created(_)))
    ));
    assert_eq!(write_labels(&device), vec!["create", "ace_set"]);

    device.clear_writes();
    let second = provider.reconcile(declared, false).expect("pass runs");
    assert!(matches!(second.get(&key), Some(ResourceStatus::InSync)));
    assert!(device.writes().is_empty());
}

#[test]
fn convergence_survives_device_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("device.json");

    let config = SyncConfig::from_json_str(
        r#"{
            "aces": [
                { "afi": "ipv6", "acl_name": "edge", "seqno": 20,
                  "action": "deny", "proto": "ipv6", "src_addr": "any", "dst_addr": "any" }
            ],
            "portchannel_globals": [
                { "bundle_hash": "ip-l4port", "bundle_select": "src-dst",
                  "hash_poly": "CRC10a", "load_defer": 90, "resilient": false }
            ]
        }"#,
    )
    .unwrap();
    config.validate().unwrap();

    {
        let device = FileDevice::open(&path).unwrap();
        let report = run_pass(&device, &config).unwrap();
        assert_eq!(report.changed(), 2);
        assert!(!report.has_failures());
    }

    let device = FileDevice::open(&path).unwrap();
    let report = run_pass(&device, &config).unwrap();
    assert_eq!(report.changed(), 0);
    assert!(device.memory().writes().is_empty());
}
