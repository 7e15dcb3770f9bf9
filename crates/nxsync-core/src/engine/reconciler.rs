//! Reconciler
//!
//! Computes the change-set between desired and current state and turns it
//! into the fewest device writes:
//!
//! 1. Every changed `Simple` property gets its own setter call
//! 2. Each combined call in the entity's table fires at most once, when all
//!    of its required properties are declared and one of its parameters
//!    changed (or the entity is new)
//!
//! Combined-call parameters take the changed value when there is one and
//! fall back to the last observed device value otherwise. That fallback
//! trusts the snapshot taken at enumeration: an external edit made since
//! then is overwritten with the stale value.
//!
//! A changed combined-only property whose call is not fully declared is
//! left unwritten and reported as stranded.
//!
//! A failed combined-call precondition skips that call only. The remaining
//! setters and calls still run and the first rejection is returned at the
//! end. Device errors abort the apply immediately; writes already sent stay
//! on the device.

use tracing::{debug, warn};

use crate::entity::{CombinedCall, Entity};
use crate::error::{Error, Result};
use crate::model::{CallParams, ChangeSet, CurrentState, DesiredState, Property, Value, WriteMode};
use crate::traits::{EntityHandle, EntityProvider};

/// Desired entries that differ from `current`
///
/// When `current` is `None` or not present, every declared entry is a
/// change. Unknown or unset observed values never match a declared value.
pub fn diff<P: Property>(desired: &DesiredState<P>, current: Option<&CurrentState<P>>) -> ChangeSet<P> {
    let mut changes = ChangeSet::new();
    for (property, value) in desired.iter() {
        let changed = match current {
            Some(current) if current.is_present() => !value.matches(current.get(property)),
            _ => true,
        };
        if changed {
            changes.insert(property, value.clone());
        }
    }
    changes
}

/// Everything one apply needs: the declaration, the state it was diffed
/// against, and the resulting change-set
#[derive(Debug, Clone)]
pub struct Reconciliation<'a, P: Property> {
    desired: &'a DesiredState<P>,
    current: Option<&'a CurrentState<P>>,
    changes: ChangeSet<P>,
    is_new: bool,
}

impl<'a, P: Property> Reconciliation<'a, P> {
    /// Diff `desired` against `current`; `None` means the entity is new
    pub fn new(desired: &'a DesiredState<P>, current: Option<&'a CurrentState<P>>) -> Self {
        let is_new = !current.is_some_and(CurrentState::is_present);
        Self {
            desired,
            current,
            changes: diff(desired, current),
            is_new,
        }
    }

    pub fn changes(&self) -> &ChangeSet<P> {
        &self.changes
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn into_changes(self) -> ChangeSet<P> {
        self.changes
    }

    /// Merged parameters for `call`, or `None` when it should not fire
    pub fn combined_params<E>(&self, call: &CombinedCall<E>) -> Option<CallParams<P>>
    where
        E: Entity<Property = P>,
    {
        if !self.fires(call) {
            return None;
        }

        let mut params = CallParams::new();
        for property in call.parameters() {
            if let Some(value) = self.effective_value(property) {
                params.insert(property, value);
            }
        }
        Some(params)
    }

    /// Changed combined-only properties that no firing call carries
    pub fn stranded<E>(&self) -> Vec<P>
    where
        E: Entity<Property = P>,
    {
        let firing: Vec<&CombinedCall<E>> =
            E::COMBINED_CALLS.iter().filter(|call| self.fires(call)).collect();

        self.changes
            .iter()
            .map(|(property, _)| property)
            .filter(|property| property.write_mode() != WriteMode::Simple)
            .filter(|property| {
                !firing
                    .iter()
                    .any(|call| call.parameters().any(|p| p == *property))
            })
            .collect()
    }

    fn fires<E>(&self, call: &CombinedCall<E>) -> bool
    where
        E: Entity<Property = P>,
    {
        self.desired.contains_all(call.required)
            && (self.is_new || self.changes.touches(call.parameters()))
    }

    fn effective_value(&self, property: P) -> Option<Value> {
        if let Some(value) = self.changes.get(property) {
            return Some(value.clone());
        }
        self.current.and_then(|current| current.get(property).to_value())
    }
}

/// Writes issued by one apply
#[derive(Debug, Clone, PartialEq)]
pub struct ApplySummary<E: Entity> {
    pub simple_writes: Vec<E::Property>,
    pub combined_calls: Vec<E::Call>,
    /// Changed properties left unwritten because their combined call is
    /// not fully declared
    pub stranded: Vec<E::Property>,
}

impl<E: Entity> ApplySummary<E> {
    pub fn is_empty(&self) -> bool {
        self.simple_writes.is_empty() && self.combined_calls.is_empty()
    }

    /// Number of device writes
    pub fn len(&self) -> usize {
        self.simple_writes.len() + self.combined_calls.len()
    }
}

impl<E: Entity> Default for ApplySummary<E> {
    fn default() -> Self {
        Self {
            simple_writes: Vec::new(),
            combined_calls: Vec::new(),
            stranded: Vec::new(),
        }
    }
}

/// Write the change-set of `plan` through `handle`
pub fn apply<E, P>(
    provider: &P,
    handle: &EntityHandle<E>,
    plan: &Reconciliation<'_, E::Property>,
) -> Result<ApplySummary<E>>
where
    E: Entity,
    P: EntityProvider<E> + ?Sized,
{
    let mut summary = ApplySummary::default();

    for (property, value) in plan.changes().iter() {
        if property.write_mode() != WriteMode::Simple {
            continue;
        }
        debug!("{} {}: set {} = {}", E::KIND, handle.key(), property, value);
        provider.set(handle, property, value)?;
        summary.simple_writes.push(property);
    }

    let mut rejected: Option<Error> = None;
    for call in E::COMBINED_CALLS {
        let Some(params) = plan.combined_params(call) else {
            continue;
        };

        if let Err(e) = (call.validate)(&params) {
            warn!("{} {}: not sending {}: {}", E::KIND, handle.key(), call.call, e);
            if rejected.is_none() {
                rejected = Some(e);
            }
            continue;
        }

        debug!(
            "{} {}: {} with {} parameter(s)",
            E::KIND,
            handle.key(),
            call.call,
            params.len()
        );
        provider.set_combined(handle, call.call, &params)?;
        summary.combined_calls.push(call.call);
    }

    summary.stranded = plan.stranded::<E>();
    if !summary.stranded.is_empty() {
        warn!(
            "{} {}: {} not written, declare the rest of the combined call",
            E::KIND,
            handle.key(),
            property_names(&summary.stranded)
        );
    }

    match rejected {
        Some(e) => Err(e),
        None => Ok(summary),
    }
}

/// Comma-separated property names for log lines
pub(crate) fn property_names<P: Property>(properties: &[P]) -> String {
    properties
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join(", ")
}
