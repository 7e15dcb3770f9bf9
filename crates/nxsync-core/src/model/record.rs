// # State Records
//
// - `DesiredState`: sparse, only what the operator declared
// - `CurrentState`: every property as read from the device, plus presence
// - `ChangeSet`: desired entries that differ from current; only built by
//   `engine::diff` and consumed within one apply
// - `CallParams`: merged parameters for one combined call

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::property::Property;
use super::value::{Observed, Value};
use crate::error::{Error, Result};

/// Whether a declared resource should exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ensure::Present => f.write_str("present"),
            Ensure::Absent => f.write_str("absent"),
        }
    }
}

/// Properties the operator asked for; absent keys are "don't care"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredState<P: Property> {
    values: BTreeMap<P, Value>,
}

impl<P: Property> DesiredState<P> {
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Builder form of [`DesiredState::set`]
    pub fn with(mut self, property: P, value: impl Into<Value>) -> Result<Self> {
        self.set(property, value.into())?;
        Ok(self)
    }

    /// Declare a value, rejecting values of the wrong kind
    pub fn set(&mut self, property: P, value: Value) -> Result<()> {
        if value.kind() != property.kind() {
            return Err(Error::invalid_input(format!(
                "{} expects a {} value, got {} '{}'",
                property,
                property.kind(),
                value.kind(),
                value
            )));
        }
        self.values.insert(property, value);
        Ok(())
    }

    pub fn remove(&mut self, property: P) -> Option<Value> {
        self.values.remove(&property)
    }

    pub fn get(&self, property: P) -> Option<&Value> {
        self.values.get(&property)
    }

    pub fn contains(&self, property: P) -> bool {
        self.values.contains_key(&property)
    }

    pub fn contains_all(&self, properties: &[P]) -> bool {
        properties.iter().all(|p| self.values.contains_key(p))
    }

    pub fn iter(&self) -> impl Iterator<Item = (P, &Value)> {
        self.values.iter().map(|(p, v)| (*p, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse declared fields for the entity kind `entity`
    ///
    /// `null` fields are skipped. Unknown names and ill-typed values are
    /// rejected.
    pub fn from_json(
        entity: &str,
        fields: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self> {
        let mut desired = Self::new();
        for (name, raw) in fields {
            if raw.is_null() {
                continue;
            }
            let property =
                P::from_name(name).ok_or_else(|| Error::unknown_property(entity, name.as_str()))?;
            let value = Value::from_json(property.kind(), raw).ok_or_else(|| {
                Error::invalid_input(format!(
                    "{} {} expects a {} value, got {}",
                    entity,
                    property,
                    property.kind(),
                    raw
                ))
            })?;
            desired.values.insert(property, value);
        }
        Ok(desired)
    }
}

impl<P: Property> Default for DesiredState<P> {
    fn default() -> Self {
        Self::new()
    }
}

static UNSET: Observed = Observed::Unset;

/// A read-only snapshot of one entity on the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentState<P: Property> {
    present: bool,
    values: BTreeMap<P, Observed>,
}

impl<P: Property> CurrentState<P> {
    /// The entity does not exist
    pub fn absent() -> Self {
        Self {
            present: false,
            values: BTreeMap::new(),
        }
    }

    /// The entity exists with the given values
    pub fn present(values: BTreeMap<P, Observed>) -> Self {
        Self {
            present: true,
            values,
        }
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    /// The observed value; properties never read are `Unset`
    pub fn get(&self, property: P) -> &Observed {
        self.values.get(&property).unwrap_or(&UNSET)
    }

    pub fn iter(&self) -> impl Iterator<Item = (P, &Observed)> {
        self.values.iter().map(|(p, v)| (*p, v))
    }
}

/// Desired values that differ from the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet<P: Property> {
    changes: BTreeMap<P, Value>,
}

impl<P: Property> ChangeSet<P> {
    pub(crate) fn new() -> Self {
        Self {
            changes: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, property: P, value: Value) {
        self.changes.insert(property, value);
    }

    pub fn get(&self, property: P) -> Option<&Value> {
        self.changes.get(&property)
    }

    pub fn contains(&self, property: P) -> bool {
        self.changes.contains_key(&property)
    }

    /// Whether any of `properties` changed
    pub fn touches(&self, properties: impl IntoIterator<Item = P>) -> bool {
        properties.into_iter().any(|p| self.changes.contains_key(&p))
    }

    pub fn properties(&self) -> Vec<P> {
        self.changes.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (P, &Value)> {
        self.changes.iter().map(|(p, v)| (*p, v))
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Effective parameters for one combined call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallParams<P: Property> {
    values: BTreeMap<P, Value>,
}

impl<P: Property> CallParams<P> {
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, property: P, value: Value) {
        self.values.insert(property, value);
    }

    pub fn get(&self, property: P) -> Option<&Value> {
        self.values.get(&property)
    }

    pub fn iter(&self) -> impl Iterator<Item = (P, &Value)> {
        self.values.iter().map(|(p, v)| (*p, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn string(&self, property: P) -> Result<&str> {
        self.get(property)
            .and_then(Value::as_str)
            .ok_or_else(|| Self::missing(property))
    }

    pub fn integer(&self, property: P) -> Result<i64> {
        self.get(property)
            .and_then(Value::as_int)
            .ok_or_else(|| Self::missing(property))
    }

    pub fn flag(&self, property: P) -> Result<bool> {
        self.get(property)
            .and_then(Value::as_bool)
            .ok_or_else(|| Self::missing(property))
    }

    fn missing(property: P) -> Error {
        Error::invalid_input(format!(
            "combined call parameter {} is missing or not a {}",
            property,
            property.kind()
        ))
    }
}

impl<P: Property> Default for CallParams<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::portchannel_global::PortChannelGlobalProperty as Pc;
    use serde_json::json;

    #[test]
    fn test_desired_rejects_wrong_kind() {
        let mut desired = DesiredState::<Pc>::new();
        assert!(desired.set(Pc::Rotate, Value::Str("4".into())).is_err());
        assert!(desired.set(Pc::Rotate, Value::Int(4)).is_ok());
        assert_eq!(desired.get(Pc::Rotate), Some(&Value::Int(4)));
    }

    #[test]
    fn test_desired_from_json() {
        let fields = json!({
            "bundle_select": "src-dst",
            "rotate": "4",
            "symmetry": true,
            "hash_poly": null,
        });
        let desired =
            DesiredState::<Pc>::from_json("cisco_portchannel_global", fields.as_object().unwrap())
                .unwrap();

        assert_eq!(desired.len(), 3);
        assert_eq!(desired.get(Pc::Rotate), Some(&Value::Int(4)));
        assert!(!desired.contains(Pc::HashPoly));
    }

    #[test]
    fn test_desired_from_json_rejects_unknown_property() {
        let fields = json!({ "bundle_colour": "blue" });
        let err =
            DesiredState::<Pc>::from_json("cisco_portchannel_global", fields.as_object().unwrap())
                .unwrap_err();
        assert!(matches!(err, Error::UnknownProperty { .. }));
    }

    #[test]
    fn test_current_state_defaults_to_unset() {
        let current = CurrentState::<Pc>::absent();
        assert!(!current.is_present());
        assert_eq!(current.get(Pc::BundleHash), &Observed::Unset);
    }

    #[test]
    fn test_call_params_typed_access() {
        let mut params = CallParams::new();
        params.insert(Pc::Rotate, Value::Int(3));
        params.insert(Pc::Symmetry, Value::Bool(true));

        assert_eq!(params.integer(Pc::Rotate).unwrap(), 3);
        assert!(params.flag(Pc::Symmetry).unwrap());
        assert!(params.string(Pc::BundleSelect).is_err());
    }
}
