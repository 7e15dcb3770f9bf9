//! Plugin-based device registry
//!
//! The registry maps device type names to factories, so the daemon can build
//! whichever back-end the manifest names without hardcoding transports.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nxsync_core::registry::DeviceRegistry;
//! use nxsync_core::config::DeviceConfig;
//!
//! let registry = DeviceRegistry::with_builtin();
//! registry.register("nxapi", Box::new(NxapiFactory));
//!
//! let device = registry.create(&DeviceConfig::Custom {
//!     factory: "nxapi".into(),
//!     config: serde_json::json!({ "host": "n9k-1" }),
//! })?;
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::config::DeviceConfig;
use crate::device::{FileDeviceFactory, MemoryDeviceFactory};
use crate::error::{Error, Result};
use crate::traits::{Device, DeviceFactory};

/// Registry of device factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct DeviceRegistry {
    factories: RwLock<HashMap<String, Box<dyn DeviceFactory>>>,
}

impl DeviceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the `memory` and `file` devices registered
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register("memory", Box::new(MemoryDeviceFactory));
        registry.register("file", Box::new(FileDeviceFactory));
        registry
    }

    /// Register a device factory, replacing any factory of the same name
    ///
    /// # Parameters
    ///
    /// - `name`: Device type name (e.g., "memory", "nxapi")
    /// - `factory`: Factory object for creating device instances
    pub fn register(&self, name: impl Into<String>, factory: Box<dyn DeviceFactory>) {
        let mut factories = self.factories.write().unwrap_or_else(PoisonError::into_inner);
        factories.insert(name.into(), factory);
    }

    /// Create a device from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn Device>)`: Created device instance
    /// - `Err(Error)`: If the device type is not registered or creation fails
    pub fn create(&self, config: &DeviceConfig) -> Result<Box<dyn Device>> {
        let device_type = config.type_name();
        let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);

        let factory = factories
            .get(device_type)
            .ok_or_else(|| Error::config(format!("Unknown device type: {}", device_type)))?;

        factory.create(config)
    }

    /// List all registered device types, sorted
    pub fn list(&self) -> Vec<String> {
        let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a device type is registered
    pub fn has(&self, name: &str) -> bool {
        let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
        factories.contains_key(name)
    }
}
