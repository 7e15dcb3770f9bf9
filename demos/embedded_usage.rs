//! Minimal embedding example for nxsync-core
//!
//! This example drives the reconciliation core from a custom application:
//! a lab device factory is registered with the registry, one resource is
//! reconciled by hand through its controller, and the manifest is then
//! applied with a full pass.

use nxsync_core::config::DeviceConfig;
use nxsync_core::device::MemoryDevice;
use nxsync_core::engine::{Declared, ResourceProvider, run_pass};
use nxsync_core::entity::{AceKey, AceProperty, Afi, PortChannelGlobal, PortChannelGlobalProperty};
use nxsync_core::model::{DesiredState, Value};
use nxsync_core::traits::{Device, DeviceFactory};
use nxsync_core::{DeviceRegistry, Error, Result, SyncConfig};
use tracing::info;

/// Builds a memory device pre-loaded with what a lab switch reports
struct LabDeviceFactory;

impl DeviceFactory for LabDeviceFactory {
    fn create(&self, config: &DeviceConfig) -> Result<Box<dyn Device>> {
        let DeviceConfig::Custom { config, .. } = config else {
            return Err(Error::config("lab factory only builds custom devices"));
        };
        let site = config
            .get("site")
            .and_then(|site| site.as_str())
            .ok_or_else(|| Error::config("lab device needs a 'site'"))?;
        info!("Building lab device for site {}", site);

        let device = MemoryDevice::new();
        device.seed_portchannel_global(
            "default",
            [
                (PortChannelGlobalProperty::BundleHash, Value::from("ip")),
                (PortChannelGlobalProperty::BundleSelect, Value::from("src-dst")),
                (PortChannelGlobalProperty::LoadDefer, Value::Int(120)),
                (PortChannelGlobalProperty::Resilient, Value::Bool(false)),
            ],
        );
        device.seed_ace(
            AceKey::new(Afi::Ipv4, "web_in", 30),
            [(AceProperty::Action, Value::from("deny"))],
        );
        Ok(Box::new(device))
    }
}

const MANIFEST: &str = r#"{
    "device": { "type": "custom", "factory": "lab", "config": { "site": "lab-1" } },
    "aces": [
        { "afi": "ipv4", "acl_name": "web_in", "seqno": 10,
          "action": "permit", "proto": "tcp", "src_addr": "any",
          "dst_addr": "10.0.0.0/24", "dst_port": "eq 443" },
        { "afi": "ipv4", "acl_name": "web_in", "seqno": 30, "ensure": "absent" }
    ],
    "portchannel_globals": [
        { "name": "default", "load_defer": 300, "resilient": true }
    ]
}"#;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let registry = DeviceRegistry::with_builtin();
    registry.register("lab", Box::new(LabDeviceFactory));

    let config = SyncConfig::from_json_str(MANIFEST)?;
    config.validate()?;
    let device = registry.create(&config.device)?;
    info!("Using {} device", device.device_name());

    // Reconcile the port-channel global by hand
    let provider = ResourceProvider::<PortChannelGlobal, _>::new(device.as_ref());
    let desired = DesiredState::new().with(PortChannelGlobalProperty::LoadDefer, 240)?;
    let mut resources = provider.prefetch(vec![Declared::present("default".to_string(), desired)])?;
    let controller = &mut resources[0].controller;

    info!("load_defer on device: {}", controller.property(PortChannelGlobalProperty::LoadDefer));
    info!("Planned changes: {:?}", controller.plan().properties());
    let outcome = controller.commit()?;
    info!("Commit outcome: {:?}", outcome);
    info!("load_defer after commit: {}", controller.property_by_name("load_defer")?);

    // Then converge the whole manifest
    let report = run_pass(device.as_ref(), &config)?;
    for (key, status) in report.aces.entries() {
        info!("ace {}: {:?}", key, status);
    }
    for (key, status) in report.portchannel_globals.entries() {
        info!("portchannel global {}: {:?}", key, status);
    }
    info!(
        "Pass finished: {} changed, {} failed",
        report.changed(),
        report.failed()
    );

    // A second pass finds nothing to do
    let again = run_pass(device.as_ref(), &config)?;
    info!("Second pass: {} changed", again.changed());

    Ok(())
}
