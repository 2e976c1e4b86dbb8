//! Core traits for the reconciliation engine
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`RemoteObjectStore`]: get/create/patch/delete/list remote objects
//! - [`TrackedStateStore`]: Persist the last observed state per managed object

pub mod remote_store;
pub mod tracked_store;

pub use remote_store::{ListFilter, RawObject, RemoteObjectStore, RemoteObjectStoreFactory};
pub use tracked_store::{TrackedRecord, TrackedStateStore};
