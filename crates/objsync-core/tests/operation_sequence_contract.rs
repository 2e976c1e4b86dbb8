//! Contract Test: Operation Sequences
//!
//! Verifies that the lifecycle controller sends exactly the minimal
//! operation list, and nothing when there is nothing to change.
//!
//! Constraints verified:
//! - A cleared attribute that is absent remotely produces no operation
//! - Set differences become per-member add/remove operations
//! - An empty operation list never reaches the remote store
//! - Remote errors propagate unmodified, without retries

mod common;

use common::*;
use objsync_core::config::EngineConfig;
use objsync_core::lifecycle::{LifecycleController, Ownership, Phase, UpdateOutcome};
use objsync_core::{AttributePath, Error, Operation};
use serde_json::json;

#[tokio::test]
async fn cleared_absent_attribute_and_set_difference() {
    let store = RecordingStore::with_objects([(
        idx1(),
        json!({"name": "idx1", "tags": ["y", "z"]}),
    )]);
    let schema = index_schema();
    let want = desired(&schema, json!({"name": "idx1", "cacheMode": "", "tags": ["x", "y"]}));

    let mut controller = LifecycleController::import(
        "b1/idx1",
        Ownership::Owned,
        &store,
        &schema,
        &EngineConfig::default(),
    )
    .await
    .expect("import succeeds");
    controller.read(&want).await.expect("read succeeds");

    let outcome = controller.update(&want).await.expect("update succeeds");
    assert_eq!(outcome, UpdateOutcome::Patched { operations: 2 });

    let tags = AttributePath::new("tags");
    assert_eq!(
        store.sent_patches(),
        vec![vec![
            Operation::add_member(&tags, "x"),
            Operation::remove_member(&tags, "z"),
        ]]
    );
    assert_eq!(
        store.inner().snapshot(&idx1()).await,
        Some(json!({"name": "idx1", "tags": ["y", "x"]}))
    );
}

#[tokio::test]
async fn second_update_sends_nothing() {
    let store = RecordingStore::with_objects([(
        idx1(),
        json!({"name": "idx1", "cacheMode": "lru"}),
    )]);
    let schema = index_schema();
    let want = desired(&schema, json!({"name": "idx1", "cacheMode": null, "tags": ["a"]}));

    let mut controller = LifecycleController::import(
        "b1/idx1",
        Ownership::Owned,
        &store,
        &schema,
        &EngineConfig::default(),
    )
    .await
    .unwrap();
    controller.read(&want).await.unwrap();

    assert_eq!(
        controller.update(&want).await.unwrap(),
        UpdateOutcome::Patched { operations: 2 }
    );
    assert_eq!(
        store.sent_patches()[0],
        vec![
            Operation::remove(&AttributePath::new("cacheMode")),
            Operation::add_member(&AttributePath::new("tags"), "a"),
        ]
    );

    // Re-read and update again: the cleared cacheMode is absent remotely
    // and must not show up as drift.
    controller.read(&want).await.unwrap();
    assert_eq!(controller.update(&want).await.unwrap(), UpdateOutcome::Unchanged);
    assert_eq!(store.patch_calls(), 1);
}

#[tokio::test]
async fn unset_attributes_are_left_alone() {
    let store = RecordingStore::with_objects([(
        idx1(),
        json!({"name": "idx1", "cacheMode": "lru", "tags": ["server-side"]}),
    )]);
    let schema = index_schema();
    let want = desired(&schema, json!({"name": "idx1"}));

    let mut controller = LifecycleController::import(
        "b1/idx1",
        Ownership::Owned,
        &store,
        &schema,
        &EngineConfig::default(),
    )
    .await
    .unwrap();
    controller.read(&want).await.unwrap();

    assert_eq!(controller.update(&want).await.unwrap(), UpdateOutcome::Unchanged);
    assert_eq!(store.patch_calls(), 0);
}

#[tokio::test]
async fn patch_failure_is_not_retried_and_keeps_observed_state() {
    let store = RecordingStore::with_objects([(idx1(), json!({"name": "old"}))]);
    let schema = index_schema();
    let want = desired(&schema, json!({"name": "new"}));

    let mut controller = LifecycleController::import(
        "b1/idx1",
        Ownership::Owned,
        &store,
        &schema,
        &EngineConfig::default(),
    )
    .await
    .unwrap();
    controller.read(&want).await.unwrap();
    let before = controller.observed().cloned();

    store.fail_next(Call::Patch, "connection reset");
    let err = controller.update(&want).await.unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(store.patch_calls(), 1);
    assert_eq!(controller.phase(), Phase::Present);
    assert_eq!(controller.observed().cloned(), before);

    // A later attempt is the caller's decision and succeeds.
    controller.update(&want).await.unwrap();
    assert_eq!(store.patch_calls(), 2);
}

#[tokio::test]
async fn create_sends_only_present_values() {
    let store = RecordingStore::new();
    let schema = index_schema();
    let want = desired(&schema, json!({"name": "idx1", "cacheMode": "", "tags": ["x"]}));

    let mut controller =
        LifecycleController::new(idx1(), Ownership::Owned, &store, &schema).unwrap();
    controller.create(&want).await.unwrap();

    assert_eq!(store.creates(), 1);
    assert_eq!(store.patch_calls(), 0);
    assert_eq!(
        store.inner().snapshot(&idx1()).await,
        Some(json!({"name": "idx1", "tags": ["x"]}))
    );
}

#[tokio::test]
async fn create_without_required_attribute_makes_no_remote_call() {
    let store = RecordingStore::new();
    let schema = index_schema();
    let want = desired(&schema, json!({"tags": ["x"]}));

    let mut controller =
        LifecycleController::new(idx1(), Ownership::Owned, &store, &schema).unwrap();
    let err = controller.create(&want).await.unwrap_err();

    assert!(matches!(err, Error::Usage(_)));
    assert_eq!(store.total_calls(), 0);
    assert_eq!(controller.phase(), Phase::Absent);
}
