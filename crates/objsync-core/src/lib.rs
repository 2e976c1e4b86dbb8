// # objsync-core
//
// Core library for reconciling declared configuration objects against a
// remote configuration server.
//
// ## Architecture Overview
//
// - **Attribute model**: `Tristate` values (unset / cleared / value) for
//   scalars and member sets, decoded through per-type schemas
// - **Diff & plan**: minimal, deterministic operation lists
//   (`replace`, `remove`, member `add`/`remove`)
// - **Normalization**: maps a two-state remote onto the three-state model
//   so an explicitly cleared attribute never shows up as drift
// - **LifecycleController**: create / read / update / delete / import of one
//   object, branching on `Ownership` (owned vs. adopted)
// - **Reconciler**: runs passes over all configured objects and emits events
// - **Registry**: plugin-based store factories and object schemas
//
// ## Design Principles
//
// 1. **Library-First**: everything is usable without a daemon or CLI
// 2. **No hidden I/O**: every remote call goes through `RemoteObjectStore`
// 3. **No retries**: remote errors surface unmodified; "not found" is the
//    only failure interpreted locally
// 4. **Idempotency**: a second pass with no remote changes issues no writes

pub mod attributes;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod normalize;
pub mod operation;
pub mod path;
pub mod plan;
pub mod registry;
pub mod schema;
pub mod store;
pub mod tracking;
pub mod traits;
pub mod value;

// Re-export core types for convenience
pub use attributes::{AttributeMap, DesiredState, ObservedState};
pub use config::{EngineConfig, ReconcilerConfig, ResourceConfig, StateStoreConfig, StoreConfig};
pub use diff::{diff_scalar, diff_set};
pub use engine::{PassSummary, ReconcileEvent, Reconciler};
pub use error::{Error, Result};
pub use identity::ObjectIdentity;
pub use lifecycle::resolver::{resolve_not_found, NotFoundContext, NotFoundResolution};
pub use lifecycle::{LifecycleController, Ownership, Phase};
pub use normalize::normalize;
pub use operation::{OpKind, Operation};
pub use path::AttributePath;
pub use plan::{build_operations, initial_payload, Plan};
pub use registry::Registry;
pub use schema::{AttributeKind, AttributeSpec, AttributeSpecProvider, ObjectSchema};
pub use store::InMemoryObjectStore;
pub use tracking::{FileTrackedStore, MemoryTrackedStore};
pub use traits::{RemoteObjectStore, TrackedStateStore};
pub use value::{AttributeValue, MemberSet, ScalarValue, Tristate};
