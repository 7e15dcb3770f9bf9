// # Entity Provider Trait
//
// Defines the interface the reconciliation core consumes from the device
// automation layer: enumerate entities, read and write their properties,
// issue combined calls, create and destroy.
//
// ## Implementations
//
// - In-memory: `device::MemoryDevice`
// - File-backed snapshot: `device::FileDevice`
// - Vendor NXAPI transport: registered externally through `DeviceRegistry`
//
// ## Usage
//
// ```rust,ignore
// use nxsync_core::entity::{PortChannelGlobal, PortChannelGlobalProperty};
// use nxsync_core::traits::EntityProvider;
//
// let provider: &dyn EntityProvider<PortChannelGlobal> = /* ... */;
// for handle in provider.list()? {
//     let rotate = provider.get(&handle, PortChannelGlobalProperty::Rotate)?;
//     println!("{}: rotate = {:?}", handle.key(), rotate);
// }
// ```

use crate::config::DeviceConfig;
use crate::entity::{Ace, Entity, PortChannelGlobal};
use crate::error::Result;
use crate::model::{CallParams, Value};

/// Opaque reference to one live entity on the device
///
/// The token is assigned by the provider. Once the entity is destroyed the
/// handle is stale, even if an entity with the same key is created again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityHandle<E: Entity> {
    key: E::Key,
    token: u64,
}

impl<E: Entity> EntityHandle<E> {
    /// Create a handle
    ///
    /// Only providers should mint handles; the core treats them as opaque.
    pub fn new(key: E::Key, token: u64) -> Self {
        Self { key, token }
    }

    pub fn key(&self) -> &E::Key {
        &self.key
    }

    pub fn token(&self) -> u64 {
        self.token
    }
}

/// Device operations for one entity kind
///
/// # Trust Level: Untrusted
///
/// Providers are thin adapters over the device transport.
///
/// ## Allowed Capabilities
/// - ✅ Talk to the device and translate its responses
/// - ✅ Return success or failure for each call
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (callers surface the failure; the next pass converges)
/// - ❌ Decide whether a write is needed (owned by the reconciler)
/// - ❌ Validate combined-call preconditions (owned by the entity catalog)
///
/// Calls are issued serially from one thread; providers do not need to
/// support concurrent reconciliation of the same entity.
pub trait EntityProvider<E: Entity>: Send + Sync {
    /// Enumerate every live entity of this kind, in any order
    fn list(&self) -> Result<Vec<EntityHandle<E>>>;

    /// Read one property
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))`: The device reports a value
    /// - `Ok(None)`: The property is not configured
    /// - `Err(Error)`: The read failed
    fn get(&self, handle: &EntityHandle<E>, property: E::Property) -> Result<Option<Value>>;

    /// Write one independently settable property
    fn set(&self, handle: &EntityHandle<E>, property: E::Property, value: &Value) -> Result<()>;

    /// Issue one combined multi-parameter call
    ///
    /// `params` holds the effective value of every parameter the call
    /// carries; the provider sends them in a single device interaction.
    fn set_combined(
        &self,
        handle: &EntityHandle<E>,
        call: E::Call,
        params: &CallParams<E::Property>,
    ) -> Result<()>;

    /// Instantiate a new entity with device defaults
    fn create(&self, key: &E::Key) -> Result<EntityHandle<E>>;

    /// Remove an entity; the handle is consumed
    fn destroy(&self, handle: EntityHandle<E>) -> Result<()>;
}

/// A device exposing every entity kind nxsync manages
pub trait Device: EntityProvider<Ace> + EntityProvider<PortChannelGlobal> {
    /// Back-end name (for logging/debugging)
    fn device_name(&self) -> &'static str;
}

/// Helper trait for constructing devices from configuration
pub trait DeviceFactory: Send + Sync {
    /// Create a Device instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this back-end
    ///
    /// # Returns
    ///
    /// A boxed Device trait object
    fn create(&self, config: &DeviceConfig) -> Result<Box<dyn Device>>;
}
