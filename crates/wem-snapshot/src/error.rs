//! Snapshot store errors

use std::path::PathBuf;

/// Errors raised while persisting or loading a snapshot.
///
/// Every variant carries the offending path; snapshot failures abort the
/// whole export/import, so the operator needs to know exactly which file.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Filesystem failure (directory creation, read, write)
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid YAML
    #[error("invalid yaml document at {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Document parsed but is not a valid element
    #[error("invalid element at {path}: {source}")]
    Element {
        path: PathBuf,
        #[source]
        source: wem_element::ElementError,
    },

    /// Connector or integration document failed to deserialize
    #[error("invalid {entity} document at {path}: {source}")]
    Entity {
        entity: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SnapshotError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
