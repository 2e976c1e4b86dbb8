//! Minimal embedding example for objsync-core
//!
//! Builds a reconciler from a JSON document, runs two passes against the
//! in-memory store, deletes an object behind the engine's back, previews
//! and runs the repair pass, and finally tears everything down.

use anyhow::Result;
use objsync_core::schema::{AttributeSpec, ObjectSchema};
use objsync_core::{
    InMemoryObjectStore, MemoryTrackedStore, ObjectIdentity, ReconcileEvent, Reconciler,
    ReconcilerConfig, Registry,
};
use serde_json::json;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const CONFIG: &str = r#"{
    "store": {"type": "memory"},
    "resources": [
        {"object_type": "backend", "name": "b1", "attributes": {"label": "primary"}},
        {
            "object_type": "index",
            "scopes": ["b1"],
            "name": "idx1",
            "attributes": {"name": "idx1", "cacheMode": "", "tags": ["x", "y"]}
        },
        {
            "object_type": "settings",
            "name": "global",
            "ownership": "adopted",
            "attributes": {"label": "production", "retention": null, "tags": []}
        }
    ]
}"#;

fn registry() -> Arc<Registry> {
    let registry = Registry::with_builtin_stores();
    registry.register_schema(Arc::new(
        ObjectSchema::new("backend").with_attribute(AttributeSpec::scalar("label")),
    ));
    registry.register_schema(Arc::new(
        ObjectSchema::new("index")
            .scoped_under("backend")
            .with_attribute(AttributeSpec::scalar("name").required())
            .with_attribute(AttributeSpec::scalar("cacheMode"))
            .with_attribute(AttributeSpec::set("tags")),
    ));
    registry.register_schema(Arc::new(
        ObjectSchema::new("settings")
            .with_attribute(AttributeSpec::scalar("label"))
            .with_attribute(AttributeSpec::scalar("retention"))
            .with_attribute(AttributeSpec::set("tags")),
    ));
    Arc::new(registry)
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // The store handle is kept to simulate changes made by someone else.
    let store = InMemoryObjectStore::new();
    store
        .seed(
            ObjectIdentity::unscoped("settings", "global"),
            json!({"label": "factory default", "retention": 30, "tags": ["default"]}),
        )
        .await;

    let config = ReconcilerConfig::from_json_str(CONFIG)?;
    let (reconciler, mut events) = Reconciler::new(
        Box::new(store.clone()),
        Box::new(MemoryTrackedStore::new()),
        registry(),
        config,
    )?;

    let printer = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if let ReconcileEvent::PassFinished { summary } = &event {
                info!("event: pass finished {:?}", summary);
            } else {
                info!("event: {}", serde_json::to_string(&event).unwrap_or_default());
            }
        }
    });

    info!("--- first pass: create and adopt ---");
    reconciler.reconcile().await?;

    info!("--- second pass: nothing to do ---");
    let summary = reconciler.reconcile().await?;
    info!("unchanged: {}", summary.unchanged);

    info!("--- out-of-band deletion ---");
    store.evict(&ObjectIdentity::unscoped("backend", "b1")).await;
    for (identity, plan) in reconciler.plan().await? {
        if plan.has_changes() {
            info!("{}: {}", identity, serde_json::to_string(&plan)?);
        } else {
            info!("{}: no change", identity);
        }
    }

    let summary = reconciler.reconcile().await?;
    info!("dropped: {}, re-created: {}", summary.dropped, summary.created);

    info!("--- destroy ---");
    let summary = reconciler.destroy().await?;
    info!("deleted: {}, released: {}", summary.deleted, summary.released);

    drop(reconciler);
    printer.await?;
    Ok(())
}
