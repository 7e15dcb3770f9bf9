//! Instance Enumerator
//!
//! Lists every live entity of one kind and reads each of its properties into
//! a normalized [`CurrentState`]. Read-only; provider errors propagate
//! unchanged.

use std::collections::BTreeMap;
use tracing::debug;

use crate::entity::Entity;
use crate::error::Result;
use crate::model::{CurrentState, Observed, Property};
use crate::traits::{EntityHandle, EntityProvider};

/// One entity found on the device
#[derive(Debug, Clone, PartialEq)]
pub struct Instance<E: Entity> {
    pub handle: EntityHandle<E>,
    pub state: CurrentState<E::Property>,
}

impl<E: Entity> Instance<E> {
    pub fn key(&self) -> &E::Key {
        self.handle.key()
    }
}

/// Enumerate and read every entity of kind `E`, in provider order
pub fn list_all<E, P>(provider: &P) -> Result<Vec<Instance<E>>>
where
    E: Entity,
    P: EntityProvider<E> + ?Sized,
{
    let handles = provider.list()?;
    debug!("{}: enumerated {} instance(s)", E::KIND, handles.len());

    handles
        .into_iter()
        .map(|handle| {
            let state = read_state(provider, &handle)?;
            Ok(Instance { handle, state })
        })
        .collect()
}

/// Read every property of one entity
pub fn read_state<E, P>(provider: &P, handle: &EntityHandle<E>) -> Result<CurrentState<E::Property>>
where
    E: Entity,
    P: EntityProvider<E> + ?Sized,
{
    let mut values = BTreeMap::new();
    for property in <E::Property as Property>::all() {
        let raw = provider.get(handle, property)?;
        values.insert(property, Observed::normalize(property.kind(), raw));
    }
    Ok(CurrentState::present(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemoryDevice;
    use crate::entity::{PortChannelGlobal, PortChannelGlobalProperty as Pc};
    use crate::model::{TriState, Value};

    #[test]
    fn test_enumeration_normalizes_reads() {
        let device = MemoryDevice::new();
        device.seed_portchannel_global(
            "default",
            [
                (Pc::BundleSelect, Value::from("src-dst")),
                (Pc::Symmetry, Value::Bool(true)),
            ],
        );

        let instances: Vec<Instance<PortChannelGlobal>> = list_all(&device).unwrap();
        assert_eq!(instances.len(), 1);

        let state = &instances[0].state;
        assert!(state.is_present());
        assert_eq!(state.get(Pc::BundleSelect), &Observed::Str("src-dst".into()));
        assert_eq!(state.get(Pc::Symmetry), &Observed::Flag(TriState::True));
        assert_eq!(state.get(Pc::Concatenation), &Observed::Flag(TriState::Unknown));
        assert_eq!(state.get(Pc::Rotate), &Observed::Unset);
    }

    #[test]
    fn test_enumeration_propagates_transport_errors() {
        let device = MemoryDevice::new();
        device.seed_portchannel_global("default", []);
        device.set_offline(true);

        let err = list_all::<PortChannelGlobal, _>(&device).unwrap_err();
        assert!(err.is_device());
    }
}
