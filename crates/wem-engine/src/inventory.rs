//! Destination workspace inventory
//!
//! Read-through cache over the destination's element lists. Staleness is
//! managed explicitly rather than by call-order convention:
//!
//! - [`WorkspaceInventory::invalidate_all`] drops every cached list (used at
//!   run start and available to callers that need a hard refresh)
//! - [`WorkspaceInventory::refresh_integrations`] refetches the integration
//!   list after integration sync, when newly-created integration ids become
//!   visible
//! - [`WorkspaceInventory::record_created`] writes elements created during a
//!   phase back into the cache, so sibling lookups inside the same phase see
//!   them
//!
//! Matching is by `(key, integrationKey)` only; destination ids are
//! workspace-local and never used for identity.

use std::sync::Arc;

use moka::future::Cache;
use serde_json::Value;
use tokio::sync::RwLock;
use wem_api::{ListFilter, PlatformApi};
use wem_element::{Element, ElementType, Integration};

use crate::error::MigrateError;

/// Cached read model of the destination workspace.
pub struct WorkspaceInventory {
    api: Arc<dyn PlatformApi>,
    elements: Cache<ElementType, Arc<Vec<Element>>>,
    integrations: RwLock<Option<Arc<Vec<Integration>>>>,
}

impl WorkspaceInventory {
    /// Create an empty inventory over the destination API.
    #[must_use]
    pub fn new(api: Arc<dyn PlatformApi>) -> Self {
        Self {
            api,
            elements: Cache::new(ElementType::CATALOG.len() as u64),
            integrations: RwLock::new(None),
        }
    }

    /// Destination integrations, fetched once and cached.
    pub async fn integrations(&self) -> Result<Arc<Vec<Integration>>, MigrateError> {
        if let Some(cached) = self.integrations.read().await.clone() {
            return Ok(cached);
        }
        self.refresh_integrations().await
    }

    /// Refetch the integration list, replacing the cached copy.
    ///
    /// Called after integration sync: integrations created there change the
    /// ids every later integration-specific lookup depends on.
    pub async fn refresh_integrations(&self) -> Result<Arc<Vec<Integration>>, MigrateError> {
        let fresh = Arc::new(self.api.list_integrations().await?);
        *self.integrations.write().await = Some(fresh.clone());
        tracing::debug!(count = fresh.len(), "integration inventory refreshed");
        Ok(fresh)
    }

    /// Resolve an integration key to its destination id.
    ///
    /// # Errors
    /// [`MigrateError::UnknownIntegration`] when the destination has no
    /// integration with that key.
    pub async fn resolve_integration_id(&self, key: &str) -> Result<String, MigrateError> {
        let integrations = self.integrations().await?;
        integrations
            .iter()
            .find(|i| i.key == key)
            .map(|i| i.id.clone())
            .ok_or_else(|| MigrateError::UnknownIntegration {
                key: key.to_string(),
            })
    }

    /// All destination elements of one type, fetched on first access.
    ///
    /// Integration-specific types are assembled from the universal list plus
    /// one filtered list per destination integration, each element tagged
    /// with its owning integration's key.
    pub async fn elements(
        &self,
        element_type: ElementType,
    ) -> Result<Arc<Vec<Element>>, MigrateError> {
        if let Some(cached) = self.elements.get(&element_type).await {
            return Ok(cached);
        }

        let fetched = Arc::new(self.fetch_elements(element_type).await?);
        self.elements.insert(element_type, fetched.clone()).await;
        Ok(fetched)
    }

    /// Drop every cached element list and the integration list.
    pub async fn invalidate_all(&self) {
        self.elements.invalidate_all();
        *self.integrations.write().await = None;
        tracing::debug!("destination inventory invalidated");
    }

    /// Write a just-created element through to the cached list, so later
    /// lookups within the same phase observe it.
    pub async fn record_created(&self, element_type: ElementType, element: Element) {
        if let Some(cached) = self.elements.get(&element_type).await {
            let mut extended = (*cached).clone();
            extended.push(element);
            self.elements
                .insert(element_type, Arc::new(extended))
                .await;
        }
        // Uncached type: the eventual first fetch will include the element.
    }

    /// Find the destination element matching `(key, integrationKey)`.
    ///
    /// # Errors
    /// [`MigrateError::DuplicateKey`] when more than one element matches —
    /// the inventory is ambiguous and picking one silently would corrupt the
    /// destination.
    pub async fn match_element(
        &self,
        element_type: ElementType,
        element: &Element,
    ) -> Result<Option<Element>, MigrateError> {
        let elements = self.elements(element_type).await?;
        let mut matches = elements
            .iter()
            .filter(|e| e.key == element.key && e.integration_key == element.integration_key);

        let first = matches.next().cloned();
        if matches.next().is_some() {
            return Err(MigrateError::DuplicateKey {
                element_type,
                key: element.key.clone(),
                scope: element.scope_label().to_string(),
            });
        }
        Ok(first)
    }

    async fn fetch_elements(
        &self,
        element_type: ElementType,
    ) -> Result<Vec<Element>, MigrateError> {
        let mut elements = parse_elements(
            element_type,
            self.api.find_all(element_type, None).await?,
            None,
        )?;

        if element_type.integration_specific() {
            for integration in self.integrations().await?.iter() {
                let filter = ListFilter::integration(&integration.id);
                let bound = self.api.find_all(element_type, Some(&filter)).await?;
                elements.extend(parse_elements(
                    element_type,
                    bound,
                    Some(&integration.key),
                )?);
            }
        }

        tracing::debug!(%element_type, count = elements.len(), "destination inventory fetched");
        Ok(elements)
    }
}

fn parse_elements(
    element_type: ElementType,
    documents: Vec<Value>,
    integration_key: Option<&str>,
) -> Result<Vec<Element>, MigrateError> {
    documents
        .into_iter()
        .map(|document| {
            let mut element = Element::from_value(document)
                .map_err(|source| MigrateError::MalformedInventory {
                    element_type,
                    source,
                })?;
            if element.integration_key.is_none() {
                element.integration_key = integration_key.map(str::to_owned);
            }
            Ok(element)
        })
        .collect()
}
