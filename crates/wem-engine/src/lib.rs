//! WEM Engine — workspace reconciliation
//!
//! The core state machine that brings a destination workspace into
//! alignment with a source snapshot:
//!
//! - [`WorkspaceInventory`]: explicit read-through cache of destination state
//! - [`matcher`]: connector/integration identity resolution
//! - [`ElementReconciler`]: the per-element decision table
//! - [`orderer`]: fixed dependency-safe phase plan
//! - [`RunReport`]: buffered warnings and action tallies
//! - [`Migrator`]: the export/import orchestrator
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wem_engine::{ExportOptions, Migrator};
//! use wem_snapshot::SnapshotStore;
//!
//! # async fn example(api: Arc<dyn wem_api::PlatformApi>) -> Result<(), wem_engine::MigrateError> {
//! let store = SnapshotStore::new("./dist");
//! let report = Migrator::new(api).import(&store).await?;
//! println!("{}", report.render());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod inventory;
pub mod matcher;
mod migrate;
pub mod orderer;
mod reconciler;
mod report;
pub mod strategy;

pub use error::MigrateError;
pub use inventory::WorkspaceInventory;
pub use matcher::ConnectorMapping;
pub use migrate::{ExportOptions, Migrator};
pub use reconciler::{decide, ElementReconciler, ReconcileAction};
pub use report::{ActionCounts, IntegrationMismatch, RunReport, SyncAction, Warning};
pub use strategy::{ApplyStrategy, APPLY_CHAIN};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
