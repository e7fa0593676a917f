//! WEM Snapshot Store
//!
//! Persists a workspace snapshot as a directory tree of YAML documents —
//! one per element, nested under the owning integration where applicable —
//! with connector package archives stored alongside their descriptors.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod store;

pub use error::SnapshotError;
pub use store::{ConnectorEntry, Snapshot, SnapshotStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
