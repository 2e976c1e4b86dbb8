//! Object lifecycle controller
//!
//! One controller manages one object instance. It decides, from the
//! lifecycle operation requested and the object's ownership mode, which
//! remote store calls to issue and in what order.
//!
//! ## State machine
//!
//! ```text
//! Owned:    Absent ──create──▶ Creating ──▶ Present ──update──▶ Updating ──▶ Present
//!                                            │
//!                                            └──delete──▶ Deleting ──▶ Absent
//!
//! Adopted:  Present ──update──▶ Updating ──▶ Present
//!              │
//!              └──delete──▶ Released   (no remote call)
//! ```
//!
//! Owned objects start `Absent`. Adopted objects start `Present`: they are
//! assumed to exist remotely, so their first action is always a read and
//! they are never created or deleted.
//!
//! ## Failure semantics
//!
//! Remote errors are never retried here. A failed write rolls the phase
//! back and leaves the observed state untouched. The only locally handled
//! failure is "not found" (see [`resolver`]).

pub mod resolver;

use crate::attributes::{DesiredState, ObservedState};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::identity::ObjectIdentity;
use crate::normalize::normalize;
use crate::plan::{build_operations, initial_payload, Plan};
use crate::schema::AttributeSpecProvider;
use crate::traits::{RawObject, RemoteObjectStore, TrackedRecord};
use resolver::{resolve_not_found, NotFoundContext, NotFoundResolution};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Who is responsible for the object's existence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ownership {
    /// Created and deleted by the engine
    #[default]
    Owned,
    /// Pre-existing (singleton, default or system object): only read and patched
    Adopted,
}

impl std::fmt::Display for Ownership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ownership::Owned => f.write_str("owned"),
            Ownership::Adopted => f.write_str("adopted"),
        }
    }
}

/// Lifecycle phase of one object instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Not present remotely (owned only)
    Absent,
    /// Create in flight
    Creating,
    /// Present remotely
    Present,
    /// Patch in flight
    Updating,
    /// Delete in flight
    Deleting,
    /// Adopted object no longer managed; terminal
    Released,
}

impl Phase {
    /// Initial phase for an ownership mode
    pub fn initial(ownership: Ownership) -> Self {
        match ownership {
            Ownership::Owned => Phase::Absent,
            Ownership::Adopted => Phase::Present,
        }
    }

    /// Transition table
    ///
    /// In-flight phases may fall back to where they came from when the
    /// remote call fails. `Present → Absent` is the owned drift drop.
    pub fn can_transition(self, to: Phase, ownership: Ownership) -> bool {
        use Ownership::*;
        use Phase::*;

        match (ownership, self, to) {
            (Owned, Absent, Creating) => true,
            (Owned, Creating, Present | Absent) => true,
            (_, Present, Updating) => true,
            (_, Updating, Present) => true,
            (Owned, Present, Deleting) => true,
            (Owned, Deleting, Absent | Present) => true,
            (Owned, Present, Absent) => true,
            (Adopted, Present, Released) => true,
            _ => false,
        }
    }
}

/// Result of [`LifecycleController::create`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Owned object created remotely
    Created,
    /// Adopted object read and, if needed, patched into shape
    Adopted {
        /// Number of operations sent (0 when already in shape)
        operations: usize,
    },
}

/// Result of [`LifecycleController::read`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Observed state refreshed
    Found,
    /// Owned object vanished out of band and was dropped from state
    Dropped,
}

/// Result of [`LifecycleController::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Already in desired state; no patch issued
    Unchanged,
    /// Patch issued
    Patched {
        /// Number of operations sent
        operations: usize,
    },
}

/// Result of [`LifecycleController::delete`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Owned object deleted remotely
    Deleted,
    /// Owned object was already gone
    AlreadyGone,
    /// Adopted object released from management; remote untouched
    Released,
}

/// Lifecycle controller for one object instance
///
/// Holds no shared state: distinct instances can be driven concurrently.
pub struct LifecycleController<'a> {
    identity: ObjectIdentity,
    ownership: Ownership,
    phase: Phase,
    observed: Option<ObservedState>,
    store: &'a dyn RemoteObjectStore,
    schema: &'a dyn AttributeSpecProvider,
}

impl<'a> LifecycleController<'a> {
    /// Create a controller for an untracked object
    ///
    /// The identity must carry every parent scope the object type needs.
    pub fn new(
        identity: ObjectIdentity,
        ownership: Ownership,
        store: &'a dyn RemoteObjectStore,
        schema: &'a dyn AttributeSpecProvider,
    ) -> Result<Self> {
        identity.validate_against(schema)?;

        Ok(Self {
            identity,
            ownership,
            phase: Phase::initial(ownership),
            observed: None,
            store,
            schema,
        })
    }

    /// Resume managing a tracked object
    pub fn from_tracked(
        record: TrackedRecord,
        store: &'a dyn RemoteObjectStore,
        schema: &'a dyn AttributeSpecProvider,
    ) -> Result<Self> {
        record.identity.validate_against(schema)?;

        Ok(Self {
            identity: record.identity,
            ownership: record.ownership,
            phase: Phase::Present,
            observed: Some(record.observed),
            store,
            schema,
        })
    }

    /// Import an existing object by import id
    ///
    /// The id is parsed before any remote call; a wrong number of
    /// components is a usage error. Importing an owned object that does
    /// not exist fails with `NotFound`, an adopted one with
    /// `MissingAdoptedObject`.
    pub async fn import(
        import_id: &str,
        ownership: Ownership,
        store: &'a dyn RemoteObjectStore,
        schema: &'a dyn AttributeSpecProvider,
        config: &EngineConfig,
    ) -> Result<Self> {
        let identity = ObjectIdentity::parse_import(schema, import_id, &config.identity_separator)?;

        let mut controller = Self {
            identity,
            ownership,
            phase: Phase::Present,
            observed: None,
            store,
            schema,
        };

        match controller.read(&DesiredState::default()).await? {
            ReadOutcome::Found => {
                info!("Imported {} ({})", controller.identity, ownership);
                Ok(controller)
            }
            ReadOutcome::Dropped => Err(Error::not_found(format!(
                "cannot import {}: object does not exist",
                controller.identity
            ))),
        }
    }

    /// Object identity
    pub fn identity(&self) -> &ObjectIdentity {
        &self.identity
    }

    /// Ownership mode
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Last normalized observed state
    pub fn observed(&self) -> Option<&ObservedState> {
        self.observed.as_ref()
    }

    /// Tracked record for the current observed state, if any
    pub fn to_record(&self) -> Option<TrackedRecord> {
        self.observed
            .as_ref()
            .map(|observed| {
                TrackedRecord::new(self.identity.clone(), self.ownership, observed.clone())
            })
    }

    /// Bring the object under management
    ///
    /// Owned objects are created from desired's present-valued attributes.
    /// Adopted objects are read, then patched only if the operation list is
    /// non-empty.
    pub async fn create(&mut self, desired: &DesiredState) -> Result<CreateOutcome> {
        match self.ownership {
            Ownership::Owned => self.create_owned(desired).await,
            Ownership::Adopted => self.adopt(desired).await,
        }
    }

    async fn create_owned(&mut self, desired: &DesiredState) -> Result<CreateOutcome> {
        let payload = initial_payload(desired, self.schema.attributes())?;
        self.transition(Phase::Creating)?;

        info!("Creating {} via {}", self.identity, self.store.store_name());
        let raw = match self.store.create(&self.identity, payload).await {
            Ok(raw) => raw,
            Err(e) => {
                self.transition(Phase::Absent)?;
                return Err(e);
            }
        };

        self.observed = Some(self.observe(&raw, desired)?);
        self.transition(Phase::Present)?;
        Ok(CreateOutcome::Created)
    }

    async fn adopt(&mut self, desired: &DesiredState) -> Result<CreateOutcome> {
        self.require(Phase::Present, "adopt")?;

        match self.read(desired).await? {
            ReadOutcome::Found => {}
            // Adopted reads never drop; resolve_not_found makes them fatal.
            ReadOutcome::Dropped => {
                return Err(Error::MissingAdoptedObject(self.identity.to_string()));
            }
        }

        let outcome = self.update(desired).await?;
        let operations = match outcome {
            UpdateOutcome::Unchanged => 0,
            UpdateOutcome::Patched { operations } => operations,
        };
        info!("Adopted {} ({} operation(s))", self.identity, operations);
        Ok(CreateOutcome::Adopted { operations })
    }

    /// Refresh the observed state from the remote store
    ///
    /// A not-found response drops an owned object from state and fails for
    /// an adopted one.
    pub async fn read(&mut self, desired: &DesiredState) -> Result<ReadOutcome> {
        self.require(Phase::Present, "read")?;

        debug!("Reading {}", self.identity);
        match self.store.get(&self.identity).await {
            Ok(raw) => {
                self.observed = Some(self.observe(&raw, desired)?);
                Ok(ReadOutcome::Found)
            }
            Err(e) if e.is_not_found() => {
                match resolve_not_found(self.ownership, NotFoundContext::Read) {
                    NotFoundResolution::DropFromState | NotFoundResolution::AlreadyGone => {
                        warn!(
                            "{} no longer exists remotely; dropping it from state",
                            self.identity
                        );
                        self.observed = None;
                        self.transition(Phase::Absent)?;
                        Ok(ReadOutcome::Dropped)
                    }
                    NotFoundResolution::Fatal => {
                        Err(Error::MissingAdoptedObject(self.identity.to_string()))
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Patch the object into the desired state
    ///
    /// An empty operation list skips the patch call and leaves the observed
    /// state unchanged.
    pub async fn update(&mut self, desired: &DesiredState) -> Result<UpdateOutcome> {
        self.require(Phase::Present, "update")?;
        let observed = self.observed.as_ref().ok_or_else(|| {
            Error::usage(format!("{} must be read before it can be updated", self.identity))
        })?;

        let operations = build_operations(desired, observed, self.schema.attributes());
        if operations.is_empty() {
            debug!("{} already in desired state", self.identity);
            return Ok(UpdateOutcome::Unchanged);
        }

        self.transition(Phase::Updating)?;
        info!(
            "Patching {} with {} operation(s) via {}",
            self.identity,
            operations.len(),
            self.store.store_name()
        );
        for op in &operations {
            debug!("  {}", op);
        }

        let raw = match self.store.patch(&self.identity, &operations).await {
            Ok(raw) => raw,
            Err(e) => {
                self.transition(Phase::Present)?;
                return Err(e);
            }
        };

        let observed = self.observe(&raw, desired);
        self.transition(Phase::Present)?;
        self.observed = Some(observed?);
        Ok(UpdateOutcome::Patched {
            operations: operations.len(),
        })
    }

    /// Stop managing the object
    ///
    /// Owned objects are deleted remotely; an already-missing object counts
    /// as success. Adopted objects are released without any remote call.
    pub async fn delete(&mut self) -> Result<DeleteOutcome> {
        if self.ownership == Ownership::Adopted {
            self.transition(Phase::Released)?;
            self.observed = None;
            info!("Released {} from management", self.identity);
            return Ok(DeleteOutcome::Released);
        }

        self.transition(Phase::Deleting)?;
        info!("Deleting {} via {}", self.identity, self.store.store_name());

        let outcome = match self.store.delete(&self.identity).await {
            Ok(()) => DeleteOutcome::Deleted,
            Err(e) if e.is_not_found() => {
                match resolve_not_found(self.ownership, NotFoundContext::Delete) {
                    NotFoundResolution::AlreadyGone | NotFoundResolution::DropFromState => {
                        debug!("{} was already gone", self.identity);
                        DeleteOutcome::AlreadyGone
                    }
                    NotFoundResolution::Fatal => {
                        self.transition(Phase::Present)?;
                        return Err(e);
                    }
                }
            }
            Err(e) => {
                self.transition(Phase::Present)?;
                return Err(e);
            }
        };

        self.observed = None;
        self.transition(Phase::Absent)?;
        Ok(outcome)
    }

    /// Preview the next step without writing
    ///
    /// An adopted object that has not been read yet is read first.
    pub async fn plan(&mut self, desired: &DesiredState) -> Result<Plan> {
        match (self.phase, self.ownership) {
            (Phase::Absent, Ownership::Owned) => Ok(Plan::Create {
                payload: initial_payload(desired, self.schema.attributes())?,
            }),
            (Phase::Present, _) => {
                if self.observed.is_none() && self.read(desired).await? == ReadOutcome::Dropped {
                    return self.plan_absent(desired);
                }
                let observed = self.observed.as_ref().ok_or_else(|| {
                    Error::usage(format!("{} has no observed state", self.identity))
                })?;
                Ok(Plan::from_operations(build_operations(
                    desired,
                    observed,
                    self.schema.attributes(),
                )))
            }
            (phase, _) => Err(Error::usage(format!(
                "cannot plan {} while {:?}",
                self.identity, phase
            ))),
        }
    }

    fn plan_absent(&self, desired: &DesiredState) -> Result<Plan> {
        Ok(Plan::Create {
            payload: initial_payload(desired, self.schema.attributes())?,
        })
    }

    fn observe(&self, raw: &RawObject, desired: &DesiredState) -> Result<ObservedState> {
        Ok(normalize(self.schema.decode(raw)?, desired))
    }

    fn require(&self, phase: Phase, action: &str) -> Result<()> {
        if self.phase != phase {
            return Err(Error::usage(format!(
                "cannot {} {} while {:?}",
                action, self.identity, self.phase
            )));
        }
        Ok(())
    }

    fn transition(&mut self, to: Phase) -> Result<()> {
        if !self.phase.can_transition(to, self.ownership) {
            return Err(Error::usage(format!(
                "{} ({}) cannot move from {:?} to {:?}",
                self.identity, self.ownership, self.phase, to
            )));
        }
        debug!("{}: {:?} -> {:?}", self.identity, self.phase, to);
        self.phase = to;
        Ok(())
    }
}
