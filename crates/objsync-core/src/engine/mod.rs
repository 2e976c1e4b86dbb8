//! Reconciliation engine
//!
//! The Reconciler drives every configured object through its lifecycle
//! controller, one pass at a time:
//! - Looks up what was last observed in the TrackedStateStore
//! - Creates, adopts, reads and patches via the RemoteObjectStore
//! - Persists the new observed state after every successful step
//!
//! ## Architecture
//!
//! ```text
//!                      ┌──────────────┐
//!   ReconcilerConfig ─▶│  Reconciler  │── ReconcileEvent ──▶ (stream)
//!                      └──────────────┘
//!                              │ one per resource
//!                              ▼
//!                   ┌─────────────────────┐
//!                   │ LifecycleController │
//!                   └─────────────────────┘
//!                     │                 │
//!                     ▼                 ▼
//!          ┌───────────────────┐ ┌───────────────────┐
//!          │ RemoteObjectStore │ │ TrackedStateStore │
//!          └───────────────────┘ └───────────────────┘
//! ```
//!
//! ## Pass Flow
//!
//! For each enabled resource, in configuration order:
//!
//! 1. Not tracked: create (owned) or adopt (adopted)
//! 2. Tracked: read the object
//!    - found: patch it if the operation list is non-empty
//!    - dropped (owned object deleted out of band): forget it, then create it
//! 3. Persist the new observed state
//!
//! Nothing is retried. A failing resource is counted and logged, and the
//! pass moves on unless `stop_on_error` is set.

use crate::attributes::DesiredState;
use crate::config::{EngineConfig, ReconcilerConfig, ResourceConfig};
use crate::error::{Error, Result};
use crate::identity::ObjectIdentity;
use crate::lifecycle::{
    CreateOutcome, DeleteOutcome, LifecycleController, Ownership, ReadOutcome, UpdateOutcome,
};
use crate::plan::Plan;
use crate::registry::Registry;
use crate::schema::AttributeSpecProvider;
use crate::traits::{RemoteObjectStore, TrackedRecord, TrackedStateStore};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReconcileEvent {
    /// A reconcile or destroy pass started
    PassStarted {
        resources: usize,
    },

    /// Owned object created
    Created {
        identity: ObjectIdentity,
    },

    /// Adopted object brought under management
    Adopted {
        identity: ObjectIdentity,
        operations: usize,
    },

    /// Object patched
    Updated {
        identity: ObjectIdentity,
        operations: usize,
    },

    /// Object already in desired state
    Unchanged {
        identity: ObjectIdentity,
    },

    /// Owned object vanished out of band and was dropped from state
    Drifted {
        identity: ObjectIdentity,
    },

    /// Owned object deleted (or found already gone)
    Deleted {
        identity: ObjectIdentity,
    },

    /// Adopted object released from management
    Released {
        identity: ObjectIdentity,
    },

    /// Step failed for one object
    Failed {
        identity: ObjectIdentity,
        error: String,
    },

    /// Pass finished
    PassFinished {
        summary: PassSummary,
    },
}

/// Counters for one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub created: usize,
    pub adopted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub dropped: usize,
    pub deleted: usize,
    pub released: usize,
    pub failed: usize,
}

impl PassSummary {
    /// Check whether any resource failed
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// A configured resource with its schema and decoded desired state
struct ManagedResource {
    identity: ObjectIdentity,
    ownership: Ownership,
    enabled: bool,
    schema: Arc<dyn AttributeSpecProvider>,
    desired: DesiredState,
}

impl ManagedResource {
    fn from_config(config: &ResourceConfig, registry: &Registry) -> Result<Self> {
        let schema = registry.schema(&config.object_type)?;
        let identity = config.identity();
        identity.validate_against(schema.as_ref())?;
        let desired = DesiredState::from_json(schema.as_ref(), &config.attributes)?;

        Ok(Self {
            identity,
            ownership: config.ownership,
            enabled: config.enabled,
            schema,
            desired,
        })
    }
}

/// Reconciliation engine
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`] or [`Reconciler::from_config()`]
/// 2. Call [`Reconciler::reconcile()`] as often as needed; every pass is
///    idempotent once the remote side matches the configuration
/// 3. Call [`Reconciler::destroy()`] to tear everything down
///
/// ## Load Resistance
///
/// Events go through a bounded channel. When it is full, events are
/// dropped with a warning; a pass never blocks on a slow consumer.
pub struct Reconciler {
    /// Remote object store
    store: Box<dyn RemoteObjectStore>,

    /// Tracked state store
    tracked: Box<dyn TrackedStateStore>,

    /// Schema lookup for imports
    registry: Arc<Registry>,

    /// Managed resources, in configuration order
    resources: Vec<ManagedResource>,

    /// Engine settings
    config: EngineConfig,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// Every resource's desired attributes are decoded against its schema
    /// here, so configuration mistakes surface before any remote call.
    ///
    /// # Parameters
    ///
    /// - `store`: Remote object store implementation
    /// - `tracked`: Tracked state store implementation
    /// - `registry`: Registry holding a schema for every configured object type
    /// - `config`: Reconciler configuration
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_stream) where event_stream yields reconcile events
    pub fn new(
        store: Box<dyn RemoteObjectStore>,
        tracked: Box<dyn TrackedStateStore>,
        registry: Arc<Registry>,
        config: ReconcilerConfig,
    ) -> Result<(Self, ReceiverStream<ReconcileEvent>)> {
        config.validate()?;

        let resources = config
            .resources
            .iter()
            .map(|resource| ManagedResource::from_config(resource, &registry))
            .collect::<Result<Vec<_>>>()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let reconciler = Self {
            store,
            tracked,
            registry,
            resources,
            config: config.engine,
            event_tx: tx,
        };

        Ok((reconciler, ReceiverStream::new(rx)))
    }

    /// Create a reconciler whose stores are built from configuration
    ///
    /// The remote store comes from the registry's factories, the tracked
    /// store from `config.state_store`.
    pub async fn from_config(
        registry: Arc<Registry>,
        config: ReconcilerConfig,
    ) -> Result<(Self, ReceiverStream<ReconcileEvent>)> {
        let store = registry.create_store(&config.store)?;
        let tracked = crate::tracking::from_config(&config.state_store).await?;
        Self::new(store, tracked, registry, config)
    }

    /// Identities of the managed resources, in configuration order
    pub fn identities(&self) -> impl Iterator<Item = &ObjectIdentity> {
        self.resources.iter().map(|r| &r.identity)
    }

    /// Run one reconcile pass
    ///
    /// # Returns
    ///
    /// - `Ok(PassSummary)`: Pass completed (possibly with per-resource failures)
    /// - `Err(Error)`: `stop_on_error` is set and a resource failed, or the
    ///   tracked state could not be flushed
    pub async fn reconcile(&self) -> Result<PassSummary> {
        let enabled: Vec<_> = self.resources.iter().filter(|r| r.enabled).collect();
        info!(
            "Reconciling {} resource(s) against {}",
            enabled.len(),
            self.store.store_name()
        );
        self.emit_event(ReconcileEvent::PassStarted {
            resources: enabled.len(),
        });

        let mut summary = PassSummary::default();
        for resource in enabled {
            if let Err(e) = self.reconcile_one(resource, &mut summary).await {
                self.record_failure(&resource.identity, &e, &mut summary);
                if self.config.stop_on_error {
                    self.tracked.flush().await?;
                    return Err(e);
                }
            }
        }

        self.tracked.flush().await?;
        info!(
            "Pass finished: {} created, {} adopted, {} updated, {} unchanged, {} failed",
            summary.created, summary.adopted, summary.updated, summary.unchanged, summary.failed
        );
        self.emit_event(ReconcileEvent::PassFinished {
            summary: summary.clone(),
        });
        Ok(summary)
    }

    async fn reconcile_one(
        &self,
        resource: &ManagedResource,
        summary: &mut PassSummary,
    ) -> Result<()> {
        let schema = resource.schema.as_ref();

        let mut controller = match self.tracked.get(&resource.identity).await? {
            Some(record) => {
                if record.ownership != resource.ownership {
                    return Err(Error::usage(format!(
                        "{} is tracked as {} but configured as {}",
                        resource.identity, record.ownership, resource.ownership
                    )));
                }

                let mut controller =
                    LifecycleController::from_tracked(record, self.store.as_ref(), schema)?;
                match controller.read(&resource.desired).await? {
                    ReadOutcome::Found => {
                        match controller.update(&resource.desired).await? {
                            UpdateOutcome::Unchanged => {
                                summary.unchanged += 1;
                                self.emit_event(ReconcileEvent::Unchanged {
                                    identity: resource.identity.clone(),
                                });
                            }
                            UpdateOutcome::Patched { operations } => {
                                summary.updated += 1;
                                self.emit_event(ReconcileEvent::Updated {
                                    identity: resource.identity.clone(),
                                    operations,
                                });
                            }
                        }
                        return self.persist(&controller).await;
                    }
                    ReadOutcome::Dropped => {
                        self.tracked.remove(&resource.identity).await?;
                        summary.dropped += 1;
                        self.emit_event(ReconcileEvent::Drifted {
                            identity: resource.identity.clone(),
                        });
                        controller
                    }
                }
            }
            None => LifecycleController::new(
                resource.identity.clone(),
                resource.ownership,
                self.store.as_ref(),
                schema,
            )?,
        };

        match controller.create(&resource.desired).await? {
            CreateOutcome::Created => {
                summary.created += 1;
                self.emit_event(ReconcileEvent::Created {
                    identity: resource.identity.clone(),
                });
            }
            CreateOutcome::Adopted { operations } => {
                summary.adopted += 1;
                self.emit_event(ReconcileEvent::Adopted {
                    identity: resource.identity.clone(),
                    operations,
                });
            }
        }
        self.persist(&controller).await
    }

    /// Tear down every tracked resource, in reverse configuration order
    ///
    /// Owned objects are deleted remotely; adopted objects are only
    /// forgotten. Untracked resources are skipped.
    pub async fn destroy(&self) -> Result<PassSummary> {
        let enabled: Vec<_> = self.resources.iter().filter(|r| r.enabled).collect();
        info!("Destroying {} resource(s)", enabled.len());
        self.emit_event(ReconcileEvent::PassStarted {
            resources: enabled.len(),
        });

        let mut summary = PassSummary::default();
        for resource in enabled.into_iter().rev() {
            if let Err(e) = self.destroy_one(resource, &mut summary).await {
                self.record_failure(&resource.identity, &e, &mut summary);
                if self.config.stop_on_error {
                    self.tracked.flush().await?;
                    return Err(e);
                }
            }
        }

        self.tracked.flush().await?;
        self.emit_event(ReconcileEvent::PassFinished {
            summary: summary.clone(),
        });
        Ok(summary)
    }

    async fn destroy_one(
        &self,
        resource: &ManagedResource,
        summary: &mut PassSummary,
    ) -> Result<()> {
        let Some(record) = self.tracked.get(&resource.identity).await? else {
            debug!("{} is not tracked, nothing to destroy", resource.identity);
            return Ok(());
        };

        let mut controller = LifecycleController::from_tracked(
            record,
            self.store.as_ref(),
            resource.schema.as_ref(),
        )?;
        let outcome = controller.delete().await?;
        self.tracked.remove(&resource.identity).await?;

        let identity = resource.identity.clone();
        match outcome {
            DeleteOutcome::Deleted | DeleteOutcome::AlreadyGone => {
                summary.deleted += 1;
                self.emit_event(ReconcileEvent::Deleted { identity });
            }
            DeleteOutcome::Released => {
                summary.released += 1;
                self.emit_event(ReconcileEvent::Released { identity });
            }
        }
        Ok(())
    }

    /// Bring an existing object under management by import id
    ///
    /// # Parameters
    ///
    /// - `object_type`: Registered object type
    /// - `import_id`: Parent scopes and name joined by the configured separator
    /// - `ownership`: Mode to track the object under
    ///
    /// # Returns
    ///
    /// - `Ok(TrackedRecord)`: The object was read and is now tracked
    /// - `Err(Error::Usage)`: Malformed import id (no remote call was made)
    /// - `Err(Error)`: The object does not exist, or the read failed
    pub async fn import(
        &self,
        object_type: &str,
        import_id: &str,
        ownership: Ownership,
    ) -> Result<TrackedRecord> {
        let schema = self.registry.schema(object_type)?;
        let controller = LifecycleController::import(
            import_id,
            ownership,
            self.store.as_ref(),
            schema.as_ref(),
            &self.config,
        )
        .await?;

        let record = controller.to_record().ok_or_else(|| {
            Error::Other(format!("{} imported without an observed state", controller.identity()))
        })?;
        self.tracked.put(&record).await?;
        self.tracked.flush().await?;
        Ok(record)
    }

    /// Preview what the next pass would do, without writing
    ///
    /// Tracked objects are re-read so the preview reflects out-of-band changes.
    pub async fn plan(&self) -> Result<Vec<(ObjectIdentity, Plan)>> {
        let mut plans = Vec::new();

        for resource in self.resources.iter().filter(|r| r.enabled) {
            let schema = resource.schema.as_ref();
            let mut controller = match self.tracked.get(&resource.identity).await? {
                Some(record) => {
                    let mut controller =
                        LifecycleController::from_tracked(record, self.store.as_ref(), schema)?;
                    controller.read(&resource.desired).await?;
                    controller
                }
                None => LifecycleController::new(
                    resource.identity.clone(),
                    resource.ownership,
                    self.store.as_ref(),
                    schema,
                )?,
            };

            let plan = controller.plan(&resource.desired).await?;
            plans.push((resource.identity.clone(), plan));
        }

        Ok(plans)
    }

    async fn persist(&self, controller: &LifecycleController<'_>) -> Result<()> {
        match controller.to_record() {
            Some(record) => self.tracked.put(&record).await,
            None => Ok(()),
        }
    }

    fn record_failure(&self, identity: &ObjectIdentity, e: &Error, summary: &mut PassSummary) {
        error!("Failed to reconcile {}: {}", identity, e);
        summary.failed += 1;
        self.emit_event(ReconcileEvent::Failed {
            identity: identity.clone(),
            error: e.to_string(),
        });
    }

    /// Emit a reconcile event
    fn emit_event(&self, event: ReconcileEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event (raise event_channel_capacity)");
        }
    }
}
