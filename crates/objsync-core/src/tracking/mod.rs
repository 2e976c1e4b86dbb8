// # Tracked State Store Implementations
//
// Implementations of the TrackedStateStore trait for different persistence
// strategies.

pub mod file;
pub mod memory;

pub use file::FileTrackedStore;
pub use memory::MemoryTrackedStore;

use crate::config::StateStoreConfig;
use crate::traits::TrackedStateStore;

/// Build the tracked store described by the configuration
pub async fn from_config(
    config: &StateStoreConfig,
) -> Result<Box<dyn TrackedStateStore>, crate::Error> {
    match config {
        StateStoreConfig::Memory => Ok(Box::new(MemoryTrackedStore::new())),
        StateStoreConfig::File { path } => Ok(Box::new(FileTrackedStore::new(path).await?)),
    }
}
