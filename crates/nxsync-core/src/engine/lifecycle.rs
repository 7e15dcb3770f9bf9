//! Lifecycle Controller
//!
//! Owns one entity for the duration of a pass: its declared state, its last
//! observed state and its device handle. `mark_for_create` and
//! `mark_for_destroy` only stage intent; every device call happens in
//! [`LifecycleController::commit`].
//!
//! ```text
//! ABSENT  --mark_for_create--> PENDING_CREATE  --commit--> PRESENT
//! PRESENT --mark_for_destroy-> PENDING_DESTROY --commit--> ABSENT
//! PRESENT --set_property-----> (dirty)         --commit--> PRESENT
//! ```

use tracing::{debug, info, warn};

use super::enumerator::{Instance, read_state};
use super::reconciler::{ApplySummary, Reconciliation, apply};
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::model::{ChangeSet, CurrentState, DesiredState, Observed, Property, Value};
use crate::traits::{EntityHandle, EntityProvider};

/// Intent staged for the next commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingAction {
    #[default]
    None,
    Create,
    Destroy,
}

/// Result of a successful commit
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome<E: Entity> {
    Created(ApplySummary<E>),
    Updated(ApplySummary<E>),
    Destroyed,
    /// Destroy was requested for an entity that does not exist
    AlreadyAbsent,
}

pub struct LifecycleController<'p, E, P>
where
    E: Entity,
    P: EntityProvider<E> + ?Sized,
{
    provider: &'p P,
    key: E::Key,
    desired: DesiredState<E::Property>,
    current: CurrentState<E::Property>,
    handle: Option<EntityHandle<E>>,
    pending: PendingAction,
}

impl<'p, E, P> LifecycleController<'p, E, P>
where
    E: Entity,
    P: EntityProvider<E> + ?Sized,
{
    /// Bind `key` to its matched instance, if any
    pub fn new(
        provider: &'p P,
        key: E::Key,
        desired: DesiredState<E::Property>,
        instance: Option<Instance<E>>,
    ) -> Self {
        let (handle, current) = match instance {
            Some(instance) => (Some(instance.handle), instance.state),
            None => (None, CurrentState::absent()),
        };
        Self {
            provider,
            key,
            desired,
            current,
            handle,
            pending: PendingAction::None,
        }
    }

    pub fn key(&self) -> &E::Key {
        &self.key
    }

    pub fn desired(&self) -> &DesiredState<E::Property> {
        &self.desired
    }

    /// Last observed device state
    pub fn current(&self) -> &CurrentState<E::Property> {
        &self.current
    }

    pub fn pending(&self) -> PendingAction {
        self.pending
    }

    /// Whether the last observation showed the entity; no device call
    pub fn exists(&self) -> bool {
        self.current.is_present()
    }

    /// Observed value of one property
    pub fn property(&self, property: E::Property) -> &Observed {
        self.current.get(property)
    }

    pub fn property_by_name(&self, name: &str) -> Result<&Observed> {
        Ok(self.property(Self::lookup(name)?))
    }

    /// Declare a value for the next commit
    pub fn set_property(&mut self, property: E::Property, value: impl Into<Value>) -> Result<()> {
        self.desired.set(property, value.into())
    }

    /// Declare a value by property name; `null` withdraws the declaration
    pub fn set_property_by_name(&mut self, name: &str, raw: &serde_json::Value) -> Result<()> {
        let property = Self::lookup(name)?;
        if raw.is_null() {
            self.desired.remove(property);
            return Ok(());
        }
        let value = Value::from_json(property.kind(), raw).ok_or_else(|| {
            Error::invalid_input(format!(
                "{} {} expects a {} value, got {}",
                E::KIND,
                property,
                property.kind(),
                raw
            ))
        })?;
        self.desired.set(property, value)
    }

    pub fn mark_for_create(&mut self) {
        self.pending = PendingAction::Create;
    }

    pub fn mark_for_destroy(&mut self) {
        self.pending = PendingAction::Destroy;
    }

    /// The change-set `commit` would write, without touching the device
    pub fn plan(&self) -> ChangeSet<E::Property> {
        self.reconciliation().into_changes()
    }

    /// Changed properties no combined call can carry yet
    ///
    /// They stay unwritten until the rest of their call is declared.
    pub fn stranded(&self) -> Vec<E::Property> {
        self.reconciliation().stranded::<E>()
    }

    /// Perform the staged action and write the change-set
    ///
    /// After any apply, successful or not, every property is read back and
    /// logged; that read refreshes `current`. Its own failures are only
    /// logged, so the apply result is what the caller sees.
    pub fn commit(&mut self) -> Result<CommitOutcome<E>> {
        let pending = std::mem::take(&mut self.pending);

        if pending == PendingAction::Destroy {
            let Some(handle) = self.handle.clone() else {
                debug!("{} {} is absent", E::KIND, self.key);
                return Ok(CommitOutcome::AlreadyAbsent);
            };
            info!("{} {}: destroying", E::KIND, self.key);
            // The handle stays bound until the device confirms the destroy
            self.provider.destroy(handle)?;
            self.handle = None;
            self.current = CurrentState::absent();
            debug!("{} {} is absent", E::KIND, self.key);
            return Ok(CommitOutcome::Destroyed);
        }

        let is_new = self.handle.is_none();
        let handle = match &self.handle {
            Some(handle) => handle.clone(),
            None => {
                info!("{} {}: creating", E::KIND, self.key);
                let handle = self.provider.create(&self.key)?;
                self.handle = Some(handle.clone());
                handle
            }
        };

        let result = apply(self.provider, &handle, &self.reconciliation());

        match self.snapshot(&handle) {
            Ok(state) => self.current = state,
            Err(e) => warn!("{} {}: {}", E::KIND, self.key, e),
        }

        let summary = result?;
        Ok(if is_new {
            CommitOutcome::Created(summary)
        } else {
            CommitOutcome::Updated(summary)
        })
    }

    fn reconciliation(&self) -> Reconciliation<'_, E::Property> {
        let current = self.handle.as_ref().map(|_| &self.current);
        Reconciliation::new(&self.desired, current)
    }

    fn snapshot(&self, handle: &EntityHandle<E>) -> Result<CurrentState<E::Property>> {
        let state = read_state(self.provider, handle)
            .map_err(|e| Error::snapshot(format!("post-apply read failed: {e}")))?;

        debug!("{} {}:", E::KIND, self.key);
        for (property, value) in state.iter() {
            debug!("{:>30}: {}", property.name(), value);
        }
        Ok(state)
    }

    fn lookup(name: &str) -> Result<E::Property> {
        <E::Property as Property>::from_name(name)
            .ok_or_else(|| Error::unknown_property(E::KIND, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemoryDevice;
    use crate::entity::{PortChannelGlobal, PortChannelGlobalProperty as Pc};
    use crate::model::TriState;
    use serde_json::json;

    type Controller<'p> = LifecycleController<'p, PortChannelGlobal, MemoryDevice>;

    #[test]
    fn test_marks_do_not_touch_the_device() {
        let device = MemoryDevice::new();
        let mut controller = Controller::new(&device, "default".into(), DesiredState::new(), None);

        assert!(!controller.exists());
        controller.mark_for_create();
        assert_eq!(controller.pending(), PendingAction::Create);
        controller.mark_for_destroy();
        assert_eq!(controller.pending(), PendingAction::Destroy);
        assert!(device.writes().is_empty());
    }

    #[test]
    fn test_commit_creates_then_refreshes_current() {
        let device = MemoryDevice::new();
        let desired = DesiredState::new().with(Pc::Resilient, true).unwrap();
        let mut controller = Controller::new(&device, "default".into(), desired, None);

        controller.mark_for_create();
        let outcome = controller.commit().unwrap();
        assert!(matches!(outcome, CommitOutcome::Created(ref s) if s.simple_writes == vec![Pc::Resilient]));

        assert!(controller.exists());
        assert_eq!(controller.property(Pc::Resilient), &Observed::Flag(TriState::True));
        assert!(controller.plan().is_empty());
    }

    #[test]
    fn test_properties_by_name() {
        let device = MemoryDevice::new();
        let mut controller = Controller::new(&device, "default".into(), DesiredState::new(), None);

        controller.set_property_by_name("load_defer", &json!("300")).unwrap();
        assert_eq!(controller.desired().get(Pc::LoadDefer), Some(&Value::Int(300)));

        controller.set_property_by_name("load_defer", &json!(null)).unwrap();
        assert!(controller.desired().is_empty());

        assert!(controller.set_property_by_name("lacp_rate", &json!("fast")).is_err());
        assert!(controller.set_property_by_name("resilient", &json!(7)).is_err());
        assert_eq!(controller.property_by_name("rotate").unwrap(), &Observed::Unset);
    }

    #[test]
    fn test_destroy_of_missing_entity() {
        let device = MemoryDevice::new();
        let mut controller = Controller::new(&device, "default".into(), DesiredState::new(), None);

        controller.mark_for_destroy();
        assert_eq!(controller.commit().unwrap(), CommitOutcome::AlreadyAbsent);
        assert!(device.writes().is_empty());
    }
}
