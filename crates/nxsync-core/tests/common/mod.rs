//! Test doubles and common utilities for reconciliation contract tests
//!
//! Most tests run against `MemoryDevice` and inspect its write log. The
//! `ReadFailingDevice` wrapper lets a test break reads after enumeration,
//! which is the only way to make the post-apply snapshot fail on its own.
#![allow(dead_code)]

use nxsync_core::device::{DeviceWrite, MemoryDevice};
use nxsync_core::engine::{LifecycleController, list_all, match_instances};
use nxsync_core::entity::{Entity, PortChannelGlobal, PortChannelGlobalProperty as Pc};
use nxsync_core::error::{Error, Result};
use nxsync_core::model::{CallParams, DesiredState, Value};
use nxsync_core::traits::{EntityHandle, EntityProvider};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const GLOBAL: &str = "default";

/// Declaration for the symmetry/concatenation/rotate call
pub fn load_balance(select: &str, symmetry: bool, concatenation: bool, rotate: i64) -> DesiredState<Pc> {
    DesiredState::new()
        .with(Pc::BundleHash, "ip")
        .and_then(|d| d.with(Pc::BundleSelect, select))
        .and_then(|d| d.with(Pc::Symmetry, symmetry))
        .and_then(|d| d.with(Pc::Concatenation, concatenation))
        .and_then(|d| d.with(Pc::Rotate, rotate))
        .expect("well-typed declaration")
}

/// A device holding one port-channel global in a known state
pub fn device_with_global() -> MemoryDevice {
    let device = MemoryDevice::new();
    device.seed_portchannel_global(
        GLOBAL,
        [
            (Pc::BundleHash, Value::from("ip")),
            (Pc::BundleSelect, Value::from("src-dst")),
            (Pc::HashDistribution, Value::from("fixed")),
            (Pc::HashPoly, Value::from("CRC10b")),
            (Pc::LoadDefer, Value::Int(120)),
            (Pc::Rotate, Value::Int(0)),
            (Pc::Asymmetric, Value::Bool(false)),
            (Pc::Concatenation, Value::Bool(false)),
            (Pc::Resilient, Value::Bool(false)),
            (Pc::Symmetry, Value::Bool(false)),
        ],
    );
    device
}

/// Enumerate, match and bind a controller, the way a pass does
pub fn controller<'p, P>(
    provider: &'p P,
    key: &str,
    desired: DesiredState<Pc>,
) -> LifecycleController<'p, PortChannelGlobal, P>
where
    P: EntityProvider<PortChannelGlobal> + ?Sized,
{
    let key = key.to_string();
    let instances = list_all::<PortChannelGlobal, P>(provider).expect("enumeration succeeds");
    let keys: BTreeSet<String> = [key.clone()].into();
    let mut matched = match_instances(&keys, instances);
    let instance = matched.remove(&key).flatten();
    LifecycleController::new(provider, key, desired, instance)
}

/// Labels of every write the device accepted, oldest first
pub fn write_labels(device: &MemoryDevice) -> Vec<String> {
    device.writes().iter().map(|w| w.label().to_string()).collect()
}

/// Labels of the combined calls the device accepted
pub fn combined_calls(device: &MemoryDevice) -> Vec<String> {
    device
        .writes()
        .iter()
        .filter(|w| matches!(w, DeviceWrite::Combined { .. }))
        .map(|w| w.label().to_string())
        .collect()
}

/// Parameters sent with the first combined call named `label`
pub fn combined_params(device: &MemoryDevice, label: &str) -> Option<Vec<(&'static str, Value)>> {
    device.writes().into_iter().find_map(|w| match w {
        DeviceWrite::Combined { call, params, .. } if call == label => Some(params),
        _ => None,
    })
}

/// Port-channel global provider whose reads can be switched off
pub struct ReadFailingDevice {
    pub inner: MemoryDevice,
    fail_reads: AtomicBool,
    read_count: AtomicUsize,
}

impl ReadFailingDevice {
    pub fn new(inner: MemoryDevice) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            read_count: AtomicUsize::new(0),
        }
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }
}

impl EntityProvider<PortChannelGlobal> for ReadFailingDevice {
    fn list(&self) -> Result<Vec<EntityHandle<PortChannelGlobal>>> {
        EntityProvider::<PortChannelGlobal>::list(&self.inner)
    }

    fn get(&self, handle: &EntityHandle<PortChannelGlobal>, property: Pc) -> Result<Option<Value>> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::device(PortChannelGlobal::KIND, "read timed out"));
        }
        self.inner.get(handle, property)
    }

    fn set(&self, handle: &EntityHandle<PortChannelGlobal>, property: Pc, value: &Value) -> Result<()> {
        self.inner.set(handle, property, value)
    }

    fn set_combined(
        &self,
        handle: &EntityHandle<PortChannelGlobal>,
        call: <PortChannelGlobal as Entity>::Call,
        params: &CallParams<Pc>,
    ) -> Result<()> {
        self.inner.set_combined(handle, call, params)
    }

    fn create(&self, key: &String) -> Result<EntityHandle<PortChannelGlobal>> {
        EntityProvider::<PortChannelGlobal>::create(&self.inner, key)
    }

    fn destroy(&self, handle: EntityHandle<PortChannelGlobal>) -> Result<()> {
        self.inner.destroy(handle)
    }
}
