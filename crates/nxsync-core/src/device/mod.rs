// # Device Implementations
//
// Built-in implementations of the Device trait. Vendor transports live
// outside this crate and plug in through `DeviceRegistry`.

pub mod file;
pub mod memory;

pub use file::{FileDevice, FileDeviceFactory};
pub use memory::{DeviceWrite, MemoryDevice, MemoryDeviceFactory};
