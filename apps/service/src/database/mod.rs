/// Database abstraction layer
///
/// The check pipeline only sees the [`Store`] trait; [`LibsqlStore`] is the
/// production implementation on a local libsql (SQLite) file.

#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod migrations;
pub mod models;
pub mod repository;

#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryStore;
pub use models::{Check, Monitor, MonitorStatus, MonitorUpdate, NewCheck};
pub use repository::{LibsqlStore, Store, StoreError, StoreTransaction};
