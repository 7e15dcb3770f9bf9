//! Core traits for nxsync
//!
//! This module defines the abstract interfaces that device back-ends must follow.
//!
//! - [`EntityProvider`]: Enumerate, read and write one entity kind
//! - [`Device`]: A back-end serving every entity kind
//! - [`DeviceFactory`]: Construct a device from configuration

pub mod entity_provider;

pub use entity_provider::{Device, DeviceFactory, EntityHandle, EntityProvider};
