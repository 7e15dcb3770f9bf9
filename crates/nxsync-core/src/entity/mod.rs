//! Entity kinds managed on the device
//!
//! An [`Entity`] ties together an identity key, a property table and the
//! combined calls the device requires for properties that cannot be set one
//! at a time.
//!
//! - [`Ace`]: one access-control entry (`cisco_ace`)
//! - [`PortChannelGlobal`]: port-channel load-balancing globals
//!   (`cisco_portchannel_global`)

pub mod ace;
pub mod portchannel_global;

pub use ace::{Ace, AceCall, AceKey, AceProperty, Afi};
pub use portchannel_global::{LoadBalanceCall, PortChannelGlobal, PortChannelGlobalProperty};

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::{Debug, Display};
use std::hash::Hash;

use crate::error::Result;
use crate::model::{CallParams, Property};

/// A kind of device entity
pub trait Entity: Sized + Copy + Debug + PartialEq + Eq + Send + Sync + 'static {
    /// Identity of one entity; immutable once the entity exists
    type Key: Clone
        + Ord
        + Eq
        + Hash
        + Debug
        + Display
        + Send
        + Sync
        + Serialize
        + DeserializeOwned;

    type Property: Property;

    /// Identifies one combined multi-parameter call
    type Call: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static;

    /// Resource type name, used in logs and errors
    const KIND: &'static str;

    /// Combined calls, in the order the reconciler issues them
    const COMBINED_CALLS: &'static [CombinedCall<Self>];
}

/// A device call that writes several properties atomically
pub struct CombinedCall<E: Entity> {
    pub call: E::Call,
    /// The call only fires when every one of these is declared
    pub required: &'static [E::Property],
    /// Sent when an effective value exists, never required
    pub optional: &'static [E::Property],
    /// Precondition checked on the merged parameters before the call
    pub validate: fn(&CallParams<E::Property>) -> Result<()>,
}

impl<E: Entity> CombinedCall<E> {
    /// Required then optional parameters
    pub fn parameters(&self) -> impl Iterator<Item = E::Property> + '_ {
        self.required.iter().chain(self.optional).copied()
    }

    /// Find the descriptor for `call`
    pub fn find(call: E::Call) -> Option<&'static CombinedCall<E>> {
        E::COMBINED_CALLS.iter().find(|c| c.call == call)
    }
}

impl<E: Entity> Debug for CombinedCall<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinedCall")
            .field("call", &self.call)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .finish()
    }
}
