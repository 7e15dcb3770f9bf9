//! Property tables
//!
//! Every entity kind declares its properties once, as an enum plus a static
//! table of [`PropertySpec`] rows. Name lookup, enumeration of current state
//! and the per-property accessors all iterate that table.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::{Debug, Display};
use std::hash::Hash;

use super::value::ValueKind;

/// How the device accepts writes for a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteMode {
    /// Has its own single-property setter
    Simple,
    /// Can only be written as part of a combined call
    CombinedOnly,
}

/// One row of a property table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySpec<P: 'static> {
    pub property: P,
    pub name: &'static str,
    pub kind: ValueKind,
    pub write: WriteMode,
}

/// A property of some entity kind
///
/// `TABLE` must list every variant, in discriminant order, so that
/// `TABLE[p.index()]` describes `p`.
pub trait Property:
    Copy + Ord + Eq + Hash + Debug + Display + Send + Sync + Serialize + DeserializeOwned + 'static
{
    const TABLE: &'static [PropertySpec<Self>];

    /// Position of this property in `TABLE`
    fn index(self) -> usize;

    fn spec(self) -> &'static PropertySpec<Self> {
        &Self::TABLE[self.index()]
    }

    fn name(self) -> &'static str {
        self.spec().name
    }

    fn kind(self) -> ValueKind {
        self.spec().kind
    }

    fn write_mode(self) -> WriteMode {
        self.spec().write
    }

    /// Every property, in table order
    fn all() -> impl Iterator<Item = Self> {
        Self::TABLE.iter().map(|spec| spec.property)
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.property)
    }
}

/// Check that a property table is consistent with its enum
///
/// Used by the entity unit tests.
#[cfg(test)]
pub(crate) fn assert_table_consistent<P: Property>() {
    for (position, spec) in P::TABLE.iter().enumerate() {
        assert_eq!(
            spec.property.index(),
            position,
            "{} is out of order in its table",
            spec.name
        );
        assert_eq!(P::from_name(spec.name), Some(spec.property));
        assert_eq!(spec.property.to_string(), spec.name);
    }
}
