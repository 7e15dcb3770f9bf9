//! Data model shared by every entity kind
//!
//! - [`Value`] / [`Observed`] / [`TriState`]: property values
//! - [`Property`]: table-driven property enums
//! - [`DesiredState`], [`CurrentState`], [`ChangeSet`], [`CallParams`]: records

pub mod property;
pub mod record;
pub mod value;

pub use property::{Property, PropertySpec, WriteMode};
pub use record::{CallParams, ChangeSet, CurrentState, DesiredState, Ensure};
pub use value::{Observed, TriState, Value, ValueKind};
