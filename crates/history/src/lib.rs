//! History: snapshot-based undo/redo coordinated across independent sub-managers.
//!
//! # Invariants
//! - A timeline cursor stays within `[0, len]`.
//! - Committing while the cursor is behind the tail discards the redo tail.
//! - The meta-manager never records an empty snapshot.
//! - The meta-manager never owns a sub-manager; it holds weak handles only.

mod container;
mod database;
mod error;
mod manager;
mod meta;
mod object;
mod revision;

pub use container::{ContainerHistoryManager, SnapshotHooks, SnapshotTimeline};
pub use database::{DatabaseHistoryManager, EntryStore};
pub use error::HistoryError;
pub use manager::{HistoryManager, ManagerId, SharedManager};
pub use meta::{ManagerPools, ManagerScope, MetaHistoryManager, MetaSnapshot};
pub use object::{ObjectHistoryManager, TrackedValue};
pub use revision::RevisionManager;
