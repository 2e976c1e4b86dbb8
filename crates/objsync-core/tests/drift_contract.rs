//! Contract Test: Drift & Existence Resolution
//!
//! Verifies how "not found" is interpreted per lifecycle operation and
//! ownership mode.
//!
//! Constraints verified:
//! - Owned + read + not found: dropped from state, re-created next pass
//! - Owned + delete + not found: success
//! - Adopted + read + not found: fatal, state kept
//! - Other read errors propagate unmodified

mod common;

use common::*;
use objsync_core::config::{ReconcilerConfig, ResourceConfig};
use objsync_core::lifecycle::{DeleteOutcome, LifecycleController, Ownership, Phase, ReadOutcome};
use objsync_core::traits::TrackedStateStore;
use objsync_core::tracking::MemoryTrackedStore;
use objsync_core::{Error, ObjectIdentity, ReconcileEvent, Reconciler};
use serde_json::json;
use tokio_stream::StreamExt;

#[tokio::test]
async fn owned_read_of_missing_object_drops_it() {
    let store = RecordingStore::new();
    let schema = backend_schema();
    let id = ObjectIdentity::unscoped("backend", "b1");
    let want = desired(&schema, json!({"label": "primary"}));

    let mut controller =
        LifecycleController::new(id.clone(), Ownership::Owned, &store, &schema).unwrap();
    controller.create(&want).await.unwrap();

    store.inner().evict(&id).await;

    assert_eq!(controller.read(&want).await.unwrap(), ReadOutcome::Dropped);
    assert_eq!(controller.phase(), Phase::Absent);
    assert!(controller.observed().is_none());
    assert!(controller.to_record().is_none());
}

#[tokio::test]
async fn owned_delete_of_missing_object_succeeds() {
    let store = RecordingStore::new();
    let schema = backend_schema();
    let id = ObjectIdentity::unscoped("backend", "b1");
    let want = desired(&schema, json!({"label": "primary"}));

    let mut controller =
        LifecycleController::new(id.clone(), Ownership::Owned, &store, &schema).unwrap();
    controller.create(&want).await.unwrap();
    store.inner().evict(&id).await;

    assert_eq!(controller.delete().await.unwrap(), DeleteOutcome::AlreadyGone);
    assert_eq!(controller.phase(), Phase::Absent);
}

#[tokio::test]
async fn adopted_read_of_missing_object_is_fatal() {
    let store = RecordingStore::with_objects([(global_settings(), json!({"label": "x"}))]);
    let schema = settings_schema();
    let want = desired(&schema, json!({"label": "x"}));

    let mut controller =
        LifecycleController::new(global_settings(), Ownership::Adopted, &store, &schema).unwrap();
    controller.create(&want).await.unwrap();
    store.inner().evict(&global_settings()).await;

    let err = controller.read(&want).await.unwrap_err();
    assert!(matches!(err, Error::MissingAdoptedObject(_)));
    assert_eq!(controller.phase(), Phase::Present);
    assert!(controller.observed().is_some());
}

#[tokio::test]
async fn transport_errors_on_read_propagate() {
    let store = RecordingStore::new();
    let schema = backend_schema();
    let id = ObjectIdentity::unscoped("backend", "b1");
    let want = desired(&schema, json!({"label": "primary"}));

    let mut controller = LifecycleController::new(id, Ownership::Owned, &store, &schema).unwrap();
    controller.create(&want).await.unwrap();

    store.fail_next(Call::Get, "timeout");
    assert!(matches!(controller.read(&want).await, Err(Error::Transport(_))));
    assert_eq!(controller.phase(), Phase::Present);
}

#[tokio::test]
async fn reconciler_recreates_object_deleted_out_of_band() {
    let store = RecordingStore::new();
    let tracked = MemoryTrackedStore::new();
    let id = ObjectIdentity::unscoped("backend", "b1");

    let mut config = ReconcilerConfig::new();
    config.resources.push(
        ResourceConfig::new("backend", vec![], "b1").with_attribute("label", json!("primary")),
    );

    let (reconciler, events) = Reconciler::new(
        Box::new(store.clone()),
        Box::new(tracked.clone()),
        registry(),
        config,
    )
    .unwrap();

    let first = reconciler.reconcile().await.unwrap();
    assert_eq!(first.created, 1);

    store.inner().evict(&id).await;

    let second = reconciler.reconcile().await.unwrap();
    assert_eq!(second.dropped, 1);
    assert_eq!(second.created, 1);
    assert_eq!(store.creates(), 2);
    assert!(tracked.get(&id).await.unwrap().is_some());

    drop(reconciler);
    let events: Vec<_> = events.collect().await;
    let drifted = events
        .iter()
        .position(|e| *e == ReconcileEvent::Drifted { identity: id.clone() })
        .expect("drift event emitted");
    assert_eq!(events[drifted + 1], ReconcileEvent::Created { identity: id });
}

#[tokio::test]
async fn reconciler_reports_missing_adopted_object() {
    let store = RecordingStore::new();

    let mut config = ReconcilerConfig::new();
    config.resources.push(
        ResourceConfig::new("settings", vec![], "global")
            .with_ownership(Ownership::Adopted)
            .with_attribute("label", json!("prod")),
    );
    config.resources.push(
        ResourceConfig::new("backend", vec![], "b1").with_attribute("label", json!("primary")),
    );

    let (reconciler, _events) = Reconciler::new(
        Box::new(store.clone()),
        Box::new(MemoryTrackedStore::new()),
        registry(),
        config,
    )
    .unwrap();

    let summary = reconciler.reconcile().await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.created, 1);
    assert_eq!(store.inner().len().await, 1);
}

#[tokio::test]
async fn stop_on_error_aborts_the_pass() {
    let store = RecordingStore::new();

    let mut config = ReconcilerConfig::new();
    config.engine.stop_on_error = true;
    config
        .resources
        .push(ResourceConfig::new("settings", vec![], "global").with_ownership(Ownership::Adopted));
    config.resources.push(
        ResourceConfig::new("backend", vec![], "b1").with_attribute("label", json!("primary")),
    );

    let (reconciler, _events) = Reconciler::new(
        Box::new(store.clone()),
        Box::new(MemoryTrackedStore::new()),
        registry(),
        config,
    )
    .unwrap();

    let err = reconciler.reconcile().await.unwrap_err();
    assert!(matches!(err, Error::MissingAdoptedObject(_)));
    assert_eq!(store.creates(), 0);
}
