//! Named cache stores and the strategies that serve requests from them.
//!
//! Two logical stores exist at runtime: the versioned `static-<version>`
//! store holding app-shell assets and the unversioned media store. Both
//! live in the same storage backend and differ only by name.

mod response;
mod storage;
mod store;
pub mod strategy;

pub use response::{CacheResult, ResponseSource, StoredResponse};
pub use storage::{CacheStorage, SqliteStorage};
pub use store::Store;
