// # nxsync-core
//
// Desired-state reconciliation for Cisco Nexus access-control entries and
// port-channel load-balancing globals.
//
// ## Architecture Overview
//
// - **EntityProvider**: Trait the device automation layer implements per entity kind
// - **Entity**: Identity key, property table and combined calls of one kind
// - **engine**: Enumerator, Matcher, Reconciler, LifecycleController and the pass driver
// - **DeviceRegistry**: Plugin-based registry for device back-ends
//
// ## Design Principles
//
// 1. **Minimal writes**: Only properties that differ from the device are written
// 2. **Table-driven**: Property names, kinds and setters come from static tables
// 3. **Synchronous**: A pass runs to completion on one thread, one call at a time
// 4. **No retries**: Device errors surface; the next pass converges

pub mod config;
pub mod device;
pub mod engine;
pub mod entity;
pub mod error;
pub mod model;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use config::{DeviceConfig, EngineConfig, SyncConfig};
pub use device::{FileDevice, MemoryDevice};
pub use engine::{LifecycleController, ResourceProvider, SyncReport, run_pass};
pub use entity::{Ace, AceKey, PortChannelGlobal};
pub use error::{Error, Result};
pub use registry::DeviceRegistry;
pub use traits::{Device, EntityProvider};
