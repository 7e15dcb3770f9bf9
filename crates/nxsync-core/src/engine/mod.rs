//! Reconciliation engine
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  Instance   ┌──────────┐  Option<Instance>  ┌─────────────────────┐
//! │  Enumerator  │────────────▶│ Matcher  │───────────────────▶│ LifecycleController │
//! └──────────────┘             └──────────┘                    └─────────────────────┘
//!        ▲                                                               │ commit
//!        │ list / get                                                    ▼
//! ┌──────────────┐      set / set_combined / create / destroy     ┌─────────────┐
//! │EntityProvider│◀───────────────────────────────────────────────│ Reconciler  │
//! └──────────────┘                                                └─────────────┘
//! ```
//!
//! ## Pass Flow
//!
//! 1. Enumerate every instance of the entity kind and read its properties
//! 2. Match declared keys to instances; unmatched keys are absent
//! 3. Diff desired against current into a change-set
//! 4. Apply simple setters, then each combined call that must fire
//! 5. Read back and log the post-apply state
//!
//! A pass runs to completion on the calling thread and issues device calls
//! one at a time.

pub mod enumerator;
pub mod lifecycle;
pub mod matcher;
pub mod pass;
pub mod reconciler;

pub use enumerator::{Instance, list_all, read_state};
pub use lifecycle::{CommitOutcome, LifecycleController, PendingAction};
pub use matcher::match_instances;
pub use pass::{Declared, ManagedResource, PassReport, PlannedChange, ResourceProvider, ResourceStatus};
pub use reconciler::{ApplySummary, Reconciliation, apply, diff};

use tracing::info;

use crate::config::SyncConfig;
use crate::entity::{Ace, PortChannelGlobal};
use crate::error::Result;
use crate::traits::Device;

/// Outcome of one pass over every entity kind
#[derive(Debug, Default)]
pub struct SyncReport {
    pub aces: PassReport<Ace>,
    pub portchannel_globals: PassReport<PortChannelGlobal>,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        self.aces.has_failures() || self.portchannel_globals.has_failures()
    }

    pub fn failed(&self) -> usize {
        self.aces.failed() + self.portchannel_globals.failed()
    }

    pub fn changed(&self) -> usize {
        self.aces.changed() + self.portchannel_globals.changed()
    }
}

/// Reconcile every declaration in `config` against `device`
///
/// Port-channel globals go first, then ACEs. A resource failure is
/// recorded in the report; enumeration failures abort the pass.
pub fn run_pass(device: &dyn Device, config: &SyncConfig) -> Result<SyncReport> {
    let noop = config.engine.noop;
    info!(
        "Starting pass on {} device{}",
        device.device_name(),
        if noop { " (noop)" } else { "" }
    );

    let portchannel_globals = ResourceProvider::<PortChannelGlobal, _>::new(device)
        .reconcile(config.portchannel_global_declarations()?, noop)?;
    let aces = ResourceProvider::<Ace, _>::new(device).reconcile(config.ace_declarations()?, noop)?;

    let report = SyncReport {
        aces,
        portchannel_globals,
    };
    info!(
        "Pass finished: {} changed, {} failed",
        report.changed(),
        report.failed()
    );
    Ok(report)
}
