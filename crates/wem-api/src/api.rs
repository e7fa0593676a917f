//! The platform collaborator trait
//!
//! The reconciliation engine depends only on this trait; the HTTP client and
//! the in-memory test double both implement it. Operations mirror the
//! platform's element accessors: collection reads, create/update by id,
//! reset, apply-to-integration, and put-by-key, plus the connector packaging
//! and integration lifecycle endpoints.

use async_trait::async_trait;
use serde_json::Value;
use wem_element::{Connector, ConnectorVersion, ElementType, Integration};

use crate::error::ApiError;

/// Collection read filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Restrict to elements bound to one integration
    pub integration_id: Option<String>,
}

impl ListFilter {
    /// Filter by owning integration id
    #[inline]
    #[must_use]
    pub fn integration(id: impl Into<String>) -> Self {
        Self {
            integration_id: Some(id.into()),
        }
    }
}

/// Remote platform surface consumed by the engine.
///
/// All calls suspend at the network boundary; none hold locks. Idempotency
/// of create/update is delegated to the platform's key-based semantics.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// List all elements of a type, optionally filtered
    async fn find_all(
        &self,
        element_type: ElementType,
        filter: Option<&ListFilter>,
    ) -> Result<Vec<Value>, ApiError>;

    /// Create an element from a wire document
    async fn create(&self, element_type: ElementType, document: &Value) -> Result<Value, ApiError>;

    /// Replace an element's payload by destination id
    async fn update(
        &self,
        element_type: ElementType,
        id: &str,
        document: &Value,
    ) -> Result<Value, ApiError>;

    /// Discard a derived instance's drift, reverting it to its universal parent
    async fn reset(&self, element_type: ElementType, id: &str) -> Result<(), ApiError>;

    /// Instantiate a universal element onto the given integrations
    async fn apply_to_integrations(
        &self,
        element_type: ElementType,
        key: &str,
        integration_keys: &[String],
    ) -> Result<(), ApiError>;

    /// Upsert an element addressed by key (and integration key, if bound)
    async fn put_by_key(
        &self,
        element_type: ElementType,
        key: &str,
        integration_key: Option<&str>,
        document: &Value,
    ) -> Result<Value, ApiError>;

    /// List connectors visible to the workspace (store + custom)
    async fn list_connectors(&self) -> Result<Vec<Connector>, ApiError>;

    /// Create a bare custom connector record
    async fn create_connector(&self, document: &Value) -> Result<Connector, ApiError>;

    /// List the versions of one connector
    async fn connector_versions(
        &self,
        connector_id: &str,
    ) -> Result<Vec<ConnectorVersion>, ApiError>;

    /// Download a version's package archive
    async fn download_connector_package(
        &self,
        connector_id: &str,
        version: &str,
    ) -> Result<Vec<u8>, ApiError>;

    /// Upload a package to the mutable development build
    async fn upload_connector_package(
        &self,
        connector_id: &str,
        package: Vec<u8>,
    ) -> Result<(), ApiError>;

    /// Publish an immutable version with a changelog entry
    async fn publish_connector_version(
        &self,
        connector_id: &str,
        version: &str,
        package: Vec<u8>,
        changelog: &str,
    ) -> Result<(), ApiError>;

    /// List the workspace's integrations
    async fn list_integrations(&self) -> Result<Vec<Integration>, ApiError>;

    /// Create an integration bound to a connector
    async fn create_integration(
        &self,
        key: &str,
        name: &str,
        connector_id: &str,
    ) -> Result<Integration, ApiError>;

    /// Switch an integration to a specific connector version
    async fn switch_integration_connector_version(
        &self,
        integration_id: &str,
        version_id: &str,
    ) -> Result<(), ApiError>;
}
