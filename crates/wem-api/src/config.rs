//! Environment configuration
//!
//! Each side of a migration (the export source, the import destination) is
//! configured through a prefixed family of environment variables:
//!
//! ```text
//! EXPORT_WORKSPACE_KEY / EXPORT_WORKSPACE_SECRET / EXPORT_API_URI
//! IMPORT_WORKSPACE_KEY / IMPORT_WORKSPACE_SECRET / IMPORT_API_URI / IMPORT_WORKSPACE_ID
//! ```

use crate::auth::WorkspaceCredentials;
use crate::error::ApiError;

/// Which side of the migration a configuration addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSide {
    /// The source workspace being snapshotted
    Export,
    /// The destination workspace being reconciled
    Import,
}

impl ConfigSide {
    fn prefix(self) -> &'static str {
        match self {
            Self::Export => "EXPORT",
            Self::Import => "IMPORT",
        }
    }
}

/// Connection settings for one workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    pub credentials: WorkspaceCredentials,
    /// Optional API base-URI override (self-hosted / staging platforms)
    pub api_uri: Option<String>,
    /// Destination workspace id, where the platform requires it on create
    pub workspace_id: Option<String>,
}

impl WorkspaceConfig {
    /// Build a configuration programmatically.
    #[must_use]
    pub fn new(credentials: WorkspaceCredentials) -> Self {
        Self {
            credentials,
            api_uri: None,
            workspace_id: None,
        }
    }

    /// Set the API base-URI override
    #[must_use]
    pub fn with_api_uri(mut self, api_uri: impl Into<String>) -> Self {
        self.api_uri = Some(api_uri.into());
        self
    }

    /// Read one side's configuration from the environment.
    ///
    /// # Errors
    /// Returns [`ApiError::MissingEnv`] when the key or secret variable is
    /// absent; the remaining variables are optional.
    pub fn from_env(side: ConfigSide) -> Result<Self, ApiError> {
        let prefix = side.prefix();
        let require = |suffix: &str| {
            let name = format!("{prefix}_{suffix}");
            std::env::var(&name).map_err(|_| ApiError::MissingEnv { name })
        };
        let optional = |suffix: &str| std::env::var(format!("{prefix}_{suffix}")).ok();

        Ok(Self {
            credentials: WorkspaceCredentials::new(
                require("WORKSPACE_KEY")?,
                require("WORKSPACE_SECRET")?,
            ),
            api_uri: optional("API_URI"),
            workspace_id: optional("WORKSPACE_ID"),
        })
    }
}
