// # Memory Device
//
// In-process model of a Nexus device implementing every EntityProvider.
//
// ## Purpose
//
// Stands in for the vendor transport wherever a real switch is not
// available: tests, offline planning, and the file-backed device.
//
// ## Behavior
//
// - Every successful write (create, destroy, set, combined call) is logged
// - Handles carry a token; a handle is stale once its entity is destroyed
// - Writes whose value kind does not match the property are rejected
// - Failures can be injected per write label, or for the whole device

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::DeviceConfig;
use crate::entity::{Ace, AceKey, AceProperty, Entity, PortChannelGlobal, PortChannelGlobalProperty};
use crate::error::{Error, Result};
use crate::model::{CallParams, Property, Value};
use crate::traits::{Device, DeviceFactory, EntityHandle, EntityProvider};

/// One write that reached the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceWrite {
    Create {
        entity: &'static str,
        key: String,
    },
    Destroy {
        entity: &'static str,
        key: String,
    },
    Set {
        entity: &'static str,
        key: String,
        property: &'static str,
        value: Value,
    },
    Combined {
        entity: &'static str,
        key: String,
        call: String,
        params: Vec<(&'static str, Value)>,
    },
}

impl DeviceWrite {
    pub fn entity(&self) -> &'static str {
        match self {
            DeviceWrite::Create { entity, .. }
            | DeviceWrite::Destroy { entity, .. }
            | DeviceWrite::Set { entity, .. }
            | DeviceWrite::Combined { entity, .. } => entity,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            DeviceWrite::Create { key, .. }
            | DeviceWrite::Destroy { key, .. }
            | DeviceWrite::Set { key, .. }
            | DeviceWrite::Combined { key, .. } => key,
        }
    }

    /// Property name for sets, call name for combined calls,
    /// `create`/`destroy` otherwise
    pub fn label(&self) -> &str {
        match self {
            DeviceWrite::Create { .. } => "create",
            DeviceWrite::Destroy { .. } => "destroy",
            DeviceWrite::Set { property, .. } => property,
            DeviceWrite::Combined { call, .. } => call,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot<P> {
    token: u64,
    properties: BTreeMap<P, Value>,
}

#[derive(Debug)]
struct Table<E: Entity> {
    slots: BTreeMap<E::Key, Slot<E::Property>>,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }
}

impl<E: Entity> Table<E> {
    fn handles(&self) -> Vec<EntityHandle<E>> {
        self.slots
            .iter()
            .map(|(key, slot)| EntityHandle::new(key.clone(), slot.token))
            .collect()
    }

    fn slot(&self, handle: &EntityHandle<E>) -> Result<&Slot<E::Property>> {
        match self.slots.get(handle.key()) {
            Some(slot) if slot.token == handle.token() => Ok(slot),
            Some(_) => Err(Self::stale(handle)),
            None => Err(Self::missing(handle)),
        }
    }

    fn slot_mut(&mut self, handle: &EntityHandle<E>) -> Result<&mut Slot<E::Property>> {
        match self.slots.get_mut(handle.key()) {
            Some(slot) if slot.token == handle.token() => Ok(slot),
            Some(_) => Err(Self::stale(handle)),
            None => Err(Self::missing(handle)),
        }
    }

    fn stale(handle: &EntityHandle<E>) -> Error {
        Error::device(E::KIND, format!("stale handle for {}", handle.key()))
    }

    fn missing(handle: &EntityHandle<E>) -> Error {
        Error::device(E::KIND, format!("{} does not exist", handle.key()))
    }
}

#[derive(Debug, Default)]
struct DeviceState {
    aces: Table<Ace>,
    globals: Table<PortChannelGlobal>,
    next_token: u64,
    offline: bool,
    failing: BTreeSet<String>,
    writes: Vec<DeviceWrite>,
}

impl DeviceState {
    fn reachable(&self, entity: &str) -> Result<()> {
        if self.offline {
            return Err(Error::device(entity, "device unreachable"));
        }
        Ok(())
    }

    /// Gate a write through the offline switch and injected failures
    fn admit_write(&self, entity: &str, label: &str) -> Result<()> {
        self.reachable(entity)?;
        if self.failing.contains(label) {
            return Err(Error::device(entity, format!("{label} rejected by device")));
        }
        Ok(())
    }

    fn issue_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }
}

/// Access to the table holding one entity kind
trait Stored: Entity {
    fn table(state: &DeviceState) -> &Table<Self>;
    fn table_mut(state: &mut DeviceState) -> &mut Table<Self>;
}

impl Stored for Ace {
    fn table(state: &DeviceState) -> &Table<Self> {
        &state.aces
    }

    fn table_mut(state: &mut DeviceState) -> &mut Table<Self> {
        &mut state.aces
    }
}

impl Stored for PortChannelGlobal {
    fn table(state: &DeviceState) -> &Table<Self> {
        &state.globals
    }

    fn table_mut(state: &mut DeviceState) -> &mut Table<Self> {
        &mut state.globals
    }
}

/// Serializable contents of a device, used by the file-backed device
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Inventory {
    #[serde(default)]
    pub aces: Vec<StoredEntity<Ace>>,
    #[serde(default)]
    pub portchannel_globals: Vec<StoredEntity<PortChannelGlobal>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub(crate) struct StoredEntity<E: Entity> {
    pub key: E::Key,
    #[serde(default)]
    pub properties: BTreeMap<E::Property, Value>,
}

/// In-memory device implementation
///
/// # Example
///
/// ```rust
/// use nxsync_core::device::MemoryDevice;
/// use nxsync_core::entity::{PortChannelGlobal, PortChannelGlobalProperty};
/// use nxsync_core::model::Value;
/// use nxsync_core::traits::EntityProvider;
///
/// let device = MemoryDevice::new();
/// device.seed_portchannel_global("default", [(PortChannelGlobalProperty::Rotate, Value::Int(0))]);
///
/// let handles = EntityProvider::<PortChannelGlobal>::list(&device).unwrap();
/// assert_eq!(handles.len(), 1);
/// let rotate = device.get(&handles[0], PortChannelGlobalProperty::Rotate).unwrap();
/// assert_eq!(rotate, Some(Value::Int(0)));
/// ```
#[derive(Debug, Default)]
pub struct MemoryDevice {
    inner: RwLock<DeviceState>,
}

impl MemoryDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an ACE directly, without logging a write
    pub fn seed_ace(&self, key: AceKey, properties: impl IntoIterator<Item = (AceProperty, Value)>) {
        self.seed::<Ace>(key, properties);
    }

    /// Add a port-channel global directly, without logging a write
    pub fn seed_portchannel_global(
        &self,
        name: impl Into<String>,
        properties: impl IntoIterator<Item = (PortChannelGlobalProperty, Value)>,
    ) {
        self.seed::<PortChannelGlobal>(name.into(), properties);
    }

    /// Every write accepted so far, oldest first
    pub fn writes(&self) -> Vec<DeviceWrite> {
        self.read_state().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.write_state().writes.clear();
    }

    /// Make every call fail as if the device were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.write_state().offline = offline;
    }

    /// Reject writes with this label (property name, call name,
    /// `create` or `destroy`)
    pub fn fail_writes_to(&self, label: impl Into<String>) {
        self.write_state().failing.insert(label.into());
    }

    pub fn clear_failures(&self) {
        self.write_state().failing.clear();
    }

    pub(crate) fn from_inventory(inventory: Inventory) -> Self {
        let device = Self::new();
        for entry in inventory.aces {
            device.seed::<Ace>(entry.key, entry.properties);
        }
        for entry in inventory.portchannel_globals {
            device.seed::<PortChannelGlobal>(entry.key, entry.properties);
        }
        device
    }

    pub(crate) fn inventory(&self) -> Inventory {
        let state = self.read_state();
        Inventory {
            aces: export(&state.aces),
            portchannel_globals: export(&state.globals),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, DeviceState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, DeviceState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn seed<E: Stored>(
        &self,
        key: E::Key,
        properties: impl IntoIterator<Item = (E::Property, Value)>,
    ) {
        let mut state = self.write_state();
        let token = state.issue_token();
        E::table_mut(&mut state).slots.insert(
            key,
            Slot {
                token,
                properties: properties.into_iter().collect(),
            },
        );
    }

    fn list_entities<E: Stored>(&self) -> Result<Vec<EntityHandle<E>>> {
        let state = self.read_state();
        state.reachable(E::KIND)?;
        Ok(E::table(&state).handles())
    }

    fn get_property<E: Stored>(
        &self,
        handle: &EntityHandle<E>,
        property: E::Property,
    ) -> Result<Option<Value>> {
        let state = self.read_state();
        state.reachable(E::KIND)?;
        let slot = E::table(&state).slot(handle)?;
        Ok(slot.properties.get(&property).cloned())
    }

    fn set_property<E: Stored>(
        &self,
        handle: &EntityHandle<E>,
        property: E::Property,
        value: &Value,
    ) -> Result<()> {
        let mut state = self.write_state();
        state.admit_write(E::KIND, property.name())?;
        check_kind::<E>(property, value)?;

        E::table_mut(&mut state)
            .slot_mut(handle)?
            .properties
            .insert(property, value.clone());

        state.writes.push(DeviceWrite::Set {
            entity: E::KIND,
            key: handle.key().to_string(),
            property: property.name(),
            value: value.clone(),
        });
        Ok(())
    }

    fn set_combined_properties<E: Stored>(
        &self,
        handle: &EntityHandle<E>,
        call: E::Call,
        params: &CallParams<E::Property>,
    ) -> Result<()> {
        let label = call.to_string();
        let mut state = self.write_state();
        state.admit_write(E::KIND, &label)?;
        for (property, value) in params.iter() {
            check_kind::<E>(property, value)?;
        }

        let slot = E::table_mut(&mut state).slot_mut(handle)?;
        for (property, value) in params.iter() {
            slot.properties.insert(property, value.clone());
        }

        state.writes.push(DeviceWrite::Combined {
            entity: E::KIND,
            key: handle.key().to_string(),
            call: label,
            params: params
                .iter()
                .map(|(property, value)| (property.name(), value.clone()))
                .collect(),
        });
        Ok(())
    }

    fn create_entity<E: Stored>(&self, key: &E::Key) -> Result<EntityHandle<E>> {
        let mut state = self.write_state();
        state.admit_write(E::KIND, "create")?;
        if E::table(&state).slots.contains_key(key) {
            return Err(Error::device(E::KIND, format!("{key} already exists")));
        }

        let token = state.issue_token();
        E::table_mut(&mut state).slots.insert(
            key.clone(),
            Slot {
                token,
                properties: BTreeMap::new(),
            },
        );
        state.writes.push(DeviceWrite::Create {
            entity: E::KIND,
            key: key.to_string(),
        });
        Ok(EntityHandle::new(key.clone(), token))
    }

    fn destroy_entity<E: Stored>(&self, handle: EntityHandle<E>) -> Result<()> {
        let mut state = self.write_state();
        state.admit_write(E::KIND, "destroy")?;
        let table = E::table_mut(&mut state);
        table.slot(&handle)?;
        table.slots.remove(handle.key());

        state.writes.push(DeviceWrite::Destroy {
            entity: E::KIND,
            key: handle.key().to_string(),
        });
        Ok(())
    }
}

fn check_kind<E: Entity>(property: E::Property, value: &Value) -> Result<()> {
    if value.kind() != property.kind() {
        return Err(Error::device(
            E::KIND,
            format!("{property} rejects {} value '{value}'", value.kind()),
        ));
    }
    Ok(())
}

fn export<E: Entity>(table: &Table<E>) -> Vec<StoredEntity<E>> {
    table
        .slots
        .iter()
        .map(|(key, slot)| StoredEntity {
            key: key.clone(),
            properties: slot.properties.clone(),
        })
        .collect()
}

impl EntityProvider<Ace> for MemoryDevice {
    fn list(&self) -> Result<Vec<EntityHandle<Ace>>> {
        self.list_entities()
    }

    fn get(&self, handle: &EntityHandle<Ace>, property: AceProperty) -> Result<Option<Value>> {
        self.get_property(handle, property)
    }

    fn set(&self, handle: &EntityHandle<Ace>, property: AceProperty, value: &Value) -> Result<()> {
        self.set_property(handle, property, value)
    }

    fn set_combined(
        &self,
        handle: &EntityHandle<Ace>,
        call: <Ace as Entity>::Call,
        params: &CallParams<AceProperty>,
    ) -> Result<()> {
        self.set_combined_properties(handle, call, params)
    }

    fn create(&self, key: &AceKey) -> Result<EntityHandle<Ace>> {
        self.create_entity(key)
    }

    fn destroy(&self, handle: EntityHandle<Ace>) -> Result<()> {
        self.destroy_entity(handle)
    }
}

impl EntityProvider<PortChannelGlobal> for MemoryDevice {
    fn list(&self) -> Result<Vec<EntityHandle<PortChannelGlobal>>> {
        self.list_entities()
    }

    fn get(
        &self,
        handle: &EntityHandle<PortChannelGlobal>,
        property: PortChannelGlobalProperty,
    ) -> Result<Option<Value>> {
        self.get_property(handle, property)
    }

    fn set(
        &self,
        handle: &EntityHandle<PortChannelGlobal>,
        property: PortChannelGlobalProperty,
        value: &Value,
    ) -> Result<()> {
        self.set_property(handle, property, value)
    }

    fn set_combined(
        &self,
        handle: &EntityHandle<PortChannelGlobal>,
        call: <PortChannelGlobal as Entity>::Call,
        params: &CallParams<PortChannelGlobalProperty>,
    ) -> Result<()> {
        self.set_combined_properties(handle, call, params)
    }

    fn create(&self, key: &String) -> Result<EntityHandle<PortChannelGlobal>> {
        self.create_entity(key)
    }

    fn destroy(&self, handle: EntityHandle<PortChannelGlobal>) -> Result<()> {
        self.destroy_entity(handle)
    }
}

impl Device for MemoryDevice {
    fn device_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for `DeviceConfig::Memory`
pub struct MemoryDeviceFactory;

impl DeviceFactory for MemoryDeviceFactory {
    fn create(&self, config: &DeviceConfig) -> Result<Box<dyn Device>> {
        match config {
            DeviceConfig::Memory => Ok(Box::new(MemoryDevice::new())),
            other => Err(Error::config(format!(
                "memory device factory cannot build a '{}' device",
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{AceCall, Afi, LoadBalanceCall};
    use PortChannelGlobalProperty as Pc;

    fn global_handle(device: &MemoryDevice) -> EntityHandle<PortChannelGlobal> {
        EntityProvider::<PortChannelGlobal>::list(device).unwrap().remove(0)
    }

    #[test]
    fn test_create_set_and_read_back() {
        let device = MemoryDevice::new();
        let key = AceKey::new(Afi::Ipv4, "web_in", 10);

        let handle = EntityProvider::<Ace>::create(&device, &key).unwrap();
        let mut params = CallParams::new();
        params.insert(AceProperty::Action, Value::from("permit"));
        params.insert(AceProperty::Proto, Value::from("tcp"));
        device.set_combined(&handle, AceCall::Rule, &params).unwrap();

        assert_eq!(
            device.get(&handle, AceProperty::Proto).unwrap(),
            Some(Value::from("tcp"))
        );
        assert_eq!(device.get(&handle, AceProperty::DstPort).unwrap(), None);

        let labels: Vec<String> = device.writes().iter().map(|w| w.label().to_string()).collect();
        assert_eq!(labels, vec!["create", "ace_set"]);
    }

    #[test]
    fn test_duplicate_create_is_rejected() {
        let device = MemoryDevice::new();
        device.seed_portchannel_global("default", []);
        let err = EntityProvider::<PortChannelGlobal>::create(&device, &"default".to_string())
            .unwrap_err();
        assert!(err.is_device());
    }

    #[test]
    fn test_stale_handle_after_destroy() {
        let device = MemoryDevice::new();
        device.seed_portchannel_global("default", []);
        let handle = global_handle(&device);

        EntityProvider::<PortChannelGlobal>::destroy(&device, handle.clone()).unwrap();
        EntityProvider::<PortChannelGlobal>::create(&device, &"default".to_string()).unwrap();

        let err = device.get(&handle, Pc::Rotate).unwrap_err();
        assert!(err.to_string().contains("stale handle"));
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let device = MemoryDevice::new();
        device.seed_portchannel_global("default", []);
        let handle = global_handle(&device);

        let err = device.set(&handle, Pc::LoadDefer, &Value::from("soon")).unwrap_err();
        assert!(err.is_device());
        assert!(device.writes().is_empty());
    }

    #[test]
    fn test_injected_failures_and_offline() {
        let device = MemoryDevice::new();
        device.seed_portchannel_global("default", []);
        let handle = global_handle(&device);

        device.fail_writes_to(LoadBalanceCall::HashPolynomial.to_string());
        let mut params = CallParams::new();
        params.insert(Pc::HashPoly, Value::from("CRC10b"));
        assert!(device
            .set_combined(&handle, LoadBalanceCall::HashPolynomial, &params)
            .is_err());
        assert!(device.set(&handle, Pc::LoadDefer, &Value::from(120)).is_ok());

        device.set_offline(true);
        assert!(EntityProvider::<PortChannelGlobal>::list(&device).is_err());
        device.set_offline(false);
        assert!(EntityProvider::<PortChannelGlobal>::list(&device).is_ok());
    }

    #[test]
    fn test_inventory_round_trip() {
        let device = MemoryDevice::new();
        device.seed_portchannel_global("default", [(Pc::Symmetry, Value::Bool(true))]);
        device.seed_ace(
            AceKey::new(Afi::Ipv6, "v6_edge", 20),
            [(AceProperty::Action, Value::from("deny"))],
        );

        let json = serde_json::to_string(&device.inventory()).unwrap();
        let restored = MemoryDevice::from_inventory(serde_json::from_str(&json).unwrap());

        let handle = global_handle(&restored);
        assert_eq!(restored.get(&handle, Pc::Symmetry).unwrap(), Some(Value::Bool(true)));
        assert_eq!(EntityProvider::<Ace>::list(&restored).unwrap().len(), 1);
    }
}
