//! Engine error taxonomy
//!
//! Three classes of failure cross the engine boundary:
//!
//! - **Fatal**: duplicate-key ambiguity, a non-empty integration mismatch
//!   list, or any unhandled remote rejection during element sync. The run
//!   stops; partially-applied changes stay applied.
//! - **Recoverable**: the apply-parent strategy chain absorbs individual
//!   strategy failures and only surfaces [`MigrateError::ApplyExhausted`]
//!   when every strategy has been tried.
//! - **Warnings** never become errors; they travel through the run report.

use wem_api::ApiError;
use wem_element::ElementType;
use wem_snapshot::SnapshotError;

/// Errors that abort a migration run.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Destination inventory holds two elements with the same identity
    #[error("more than one {scope} {element_type} with key {key} found in the workspace")]
    DuplicateKey {
        element_type: ElementType,
        key: String,
        scope: String,
    },

    /// Integrations could not be resolved after the matcher phase
    #[error("{count} integration(s) could not be matched in the destination workspace")]
    IntegrationMismatch { count: usize },

    /// An element references an integration the destination does not have
    #[error("no integration with key {key} exists in the destination workspace")]
    UnknownIntegration { key: String },

    /// Every strategy in the apply-parent chain failed
    #[error("all apply strategies failed for {element_type} {key}: {source}")]
    ApplyExhausted {
        element_type: ElementType,
        key: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// A destination document could not be interpreted as an element
    #[error("destination {element_type} inventory entry is malformed: {source}")]
    MalformedInventory {
        element_type: ElementType,
        #[source]
        source: wem_element::ElementError,
    },

    /// Remote call rejected
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Snapshot read/write failed
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
