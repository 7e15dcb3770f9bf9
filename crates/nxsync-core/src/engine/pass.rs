//! Resource provider and pass driver
//!
//! [`ResourceProvider`] is what a configuration-management runtime talks to:
//! `instances` to discover, `prefetch` to bind declarations to what exists,
//! and `reconcile` to run one full pass over a set of declarations.
//!
//! ## Per-resource decision
//!
//! | ensure  | exists | action                                 |
//! |---------|--------|----------------------------------------|
//! | present | no     | create and write every declared key    |
//! | present | yes    | commit when `plan()` has writable keys |
//! | absent  | yes    | destroy                                |
//! | absent  | no     | nothing                                |
//!
//! One failing resource does not stop the others; only an enumeration
//! failure aborts the pass.

use std::collections::BTreeSet;
use std::marker::PhantomData;
use tracing::{error, info, warn};

use super::enumerator::{Instance, list_all};
use super::lifecycle::{CommitOutcome, LifecycleController};
use super::matcher::match_instances;
use super::reconciler::property_names;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::model::{DesiredState, Ensure};
use crate::traits::EntityProvider;

/// One declared resource
#[derive(Debug, Clone, PartialEq)]
pub struct Declared<E: Entity> {
    pub key: E::Key,
    pub ensure: Ensure,
    pub desired: DesiredState<E::Property>,
}

impl<E: Entity> Declared<E> {
    pub fn new(key: E::Key, ensure: Ensure, desired: DesiredState<E::Property>) -> Self {
        Self {
            key,
            ensure,
            desired,
        }
    }

    /// A resource that should exist with `desired`
    pub fn present(key: E::Key, desired: DesiredState<E::Property>) -> Self {
        Self::new(key, Ensure::Present, desired)
    }

    /// A resource that should not exist
    pub fn absent(key: E::Key) -> Self {
        Self::new(key, Ensure::Absent, DesiredState::new())
    }
}

/// What a noop pass would have done
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedChange<P> {
    /// Create, writing these declared properties
    Create(Vec<P>),
    /// Update these properties
    Update(Vec<P>),
    Destroy,
}

/// Outcome for one resource in a pass
#[derive(Debug)]
pub enum ResourceStatus<E: Entity> {
    InSync,
    Planned(PlannedChange<E::Property>),
    Applied(CommitOutcome<E>),
    /// Differs from the declaration only in properties that cannot be
    /// written until the rest of their combined call is declared
    Incomplete(Vec<E::Property>),
    Failed(Error),
}

impl<E: Entity> ResourceStatus<E> {
    pub fn is_failed(&self) -> bool {
        matches!(self, ResourceStatus::Failed(_))
    }

    /// Whether the resource was, or would have been, changed
    pub fn is_changed(&self) -> bool {
        matches!(self, ResourceStatus::Planned(_) | ResourceStatus::Applied(_))
    }
}

/// Per-resource outcomes of one pass, in declaration order
#[derive(Debug)]
pub struct PassReport<E: Entity> {
    entries: Vec<(E::Key, ResourceStatus<E>)>,
}

impl<E: Entity> Default for PassReport<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E: Entity> PassReport<E> {
    pub fn entries(&self) -> &[(E::Key, ResourceStatus<E>)] {
        &self.entries
    }

    pub fn get(&self, key: &E::Key) -> Option<&ResourceStatus<E>> {
        self.entries
            .iter()
            .find(|(entry_key, _)| entry_key == key)
            .map(|(_, status)| status)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|(_, s)| s.is_failed()).count()
    }

    pub fn changed(&self) -> usize {
        self.entries.iter().filter(|(_, s)| s.is_changed()).count()
    }

    pub fn incomplete(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, s)| matches!(s, ResourceStatus::Incomplete(_)))
            .count()
    }

    pub fn in_sync(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, s)| matches!(s, ResourceStatus::InSync))
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

/// A declared resource bound to its controller
pub struct ManagedResource<'p, E, P>
where
    E: Entity,
    P: EntityProvider<E> + ?Sized,
{
    pub ensure: Ensure,
    pub controller: LifecycleController<'p, E, P>,
}

impl<E, P> ManagedResource<'_, E, P>
where
    E: Entity,
    P: EntityProvider<E> + ?Sized,
{
    /// Converge this resource, or only report what would change
    pub fn sync(&mut self, noop: bool) -> ResourceStatus<E> {
        let controller = &mut self.controller;

        match (self.ensure, controller.exists()) {
            (Ensure::Present, false) => {
                if noop {
                    let declared = controller.desired().iter().map(|(p, _)| p).collect();
                    return ResourceStatus::Planned(PlannedChange::Create(declared));
                }
                controller.mark_for_create();
            }
            (Ensure::Present, true) => {
                let changes = controller.plan();
                if changes.is_empty() {
                    return ResourceStatus::InSync;
                }
                let stranded = controller.stranded();
                if stranded.len() == changes.len() {
                    warn!(
                        "{} {}: {} not written, declare the rest of the combined call",
                        E::KIND,
                        controller.key(),
                        property_names(&stranded)
                    );
                    return ResourceStatus::Incomplete(stranded);
                }
                if noop {
                    return ResourceStatus::Planned(PlannedChange::Update(changes.properties()));
                }
            }
            (Ensure::Absent, true) => {
                if noop {
                    return ResourceStatus::Planned(PlannedChange::Destroy);
                }
                controller.mark_for_destroy();
            }
            (Ensure::Absent, false) => return ResourceStatus::InSync,
        }

        match controller.commit() {
            Ok(outcome) => ResourceStatus::Applied(outcome),
            Err(e) => {
                error!("{} {}: {}", E::KIND, controller.key(), e);
                ResourceStatus::Failed(e)
            }
        }
    }
}

/// Resource-provider contract for one entity kind
pub struct ResourceProvider<'p, E, P>
where
    E: Entity,
    P: EntityProvider<E> + ?Sized,
{
    provider: &'p P,
    _entity: PhantomData<E>,
}

impl<'p, E, P> ResourceProvider<'p, E, P>
where
    E: Entity,
    P: EntityProvider<E> + ?Sized,
{
    pub fn new(provider: &'p P) -> Self {
        Self {
            provider,
            _entity: PhantomData,
        }
    }

    /// Every entity of this kind on the device
    pub fn instances(&self) -> Result<Vec<Instance<E>>> {
        list_all(self.provider)
    }

    /// Bind each declaration to its existing instance
    ///
    /// Fails when a key is declared twice or enumeration fails.
    pub fn prefetch(&self, declared: Vec<Declared<E>>) -> Result<Vec<ManagedResource<'p, E, P>>> {
        let mut keys = BTreeSet::new();
        for resource in &declared {
            if !keys.insert(resource.key.clone()) {
                return Err(Error::config(format!(
                    "{} {} declared more than once",
                    E::KIND,
                    resource.key
                )));
            }
        }

        let mut matched = match_instances(&keys, self.instances()?);

        Ok(declared
            .into_iter()
            .map(|resource| {
                let instance = matched.remove(&resource.key).flatten();
                ManagedResource {
                    ensure: resource.ensure,
                    controller: LifecycleController::new(
                        self.provider,
                        resource.key,
                        resource.desired,
                        instance,
                    ),
                }
            })
            .collect())
    }

    /// Run one pass over `declared`
    pub fn reconcile(&self, declared: Vec<Declared<E>>, noop: bool) -> Result<PassReport<E>> {
        let resources = self.prefetch(declared)?;

        let mut report = PassReport::default();
        for mut resource in resources {
            let status = resource.sync(noop);
            report
                .entries
                .push((resource.controller.key().clone(), status));
        }

        info!(
            "{}: {} resource(s), {} changed, {} in sync, {} incomplete, {} failed{}",
            E::KIND,
            report.len(),
            report.changed(),
            report.in_sync(),
            report.incomplete(),
            report.failed(),
            if noop { " (noop)" } else { "" }
        );
        Ok(report)
    }
}
