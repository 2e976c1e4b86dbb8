// # Remote Object Store Implementations
//
// Only the in-process store lives in this crate. Network-backed stores
// implement `RemoteObjectStore` in their own crates and register a factory
// with the `Registry`.

pub mod memory;

pub use memory::{InMemoryObjectStore, MemoryStoreFactory};
