//! Migration orchestrator
//!
//! [`Migrator`] glues the phases together. `export` snapshots a source
//! workspace to disk; `import` reconciles a destination workspace from a
//! snapshot: matcher → integration refresh → ordered element phases. The
//! engine never rolls back partially-applied changes; the run report tells
//! the operator what landed.

use std::collections::HashSet;
use std::sync::Arc;

use wem_api::PlatformApi;
use wem_element::{ElementSet, ElementType, Integration, IntegrationSpec};
use wem_snapshot::{ConnectorEntry, Snapshot, SnapshotStore};

use crate::error::MigrateError;
use crate::inventory::WorkspaceInventory;
use crate::matcher;
use crate::orderer;
use crate::reconciler::ElementReconciler;
use crate::report::RunReport;

/// Export behavior switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Export every connector the workspace can see, not only those
    /// referenced by an integration
    pub all_connectors: bool,
}

/// Drives one workspace side of a migration.
pub struct Migrator {
    api: Arc<dyn PlatformApi>,
    workspace_id: Option<String>,
}

impl Migrator {
    /// Create a migrator over one workspace API
    #[inline]
    #[must_use]
    pub fn new(api: Arc<dyn PlatformApi>) -> Self {
        Self {
            api,
            workspace_id: None,
        }
    }

    /// Set the destination workspace id attached to connector creation
    #[must_use]
    pub fn with_workspace_id(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    /// Snapshot the workspace into the store.
    ///
    /// # Errors
    /// Any remote failure or filesystem failure aborts the export.
    pub async fn export(
        &self,
        store: &SnapshotStore,
        options: ExportOptions,
    ) -> Result<Snapshot, MigrateError> {
        tracing::info!("collecting workspace data");
        let inventory = WorkspaceInventory::new(self.api.clone());
        let integrations = inventory.integrations().await?;

        let snapshot = Snapshot {
            connectors: self.collect_connectors(&integrations, options).await?,
            integrations: integrations.iter().map(IntegrationSpec::from).collect(),
            elements: collect_elements(&inventory).await?,
        };

        store.write(&snapshot)?;
        Ok(snapshot)
    }

    /// Reconcile the workspace from a stored snapshot.
    ///
    /// # Errors
    /// Fatal conditions (integration mismatches, duplicate keys, unhandled
    /// remote rejections) abort the run; everything already applied stays
    /// applied.
    pub async fn import(&self, store: &SnapshotStore) -> Result<RunReport, MigrateError> {
        let snapshot = store.read()?;
        tracing::info!(
            connectors = snapshot.connectors.len(),
            integrations = snapshot.integrations.len(),
            elements = snapshot.element_count(),
            "snapshot loaded"
        );

        let report = RunReport::new();
        let inventory = WorkspaceInventory::new(self.api.clone());

        tracing::info!("matching connectors and integrations");
        let mapping = matcher::sync_connectors(
            self.api.as_ref(),
            &snapshot,
            &report,
            self.workspace_id.as_deref(),
        )
        .await?;
        tracing::info!(connectors = mapping.len(), "connector identities resolved");
        matcher::sync_integrations(self.api.as_ref(), &snapshot, &mapping, &report).await?;

        // Integration sync may have created integrations; their ids are
        // needed by every integration-specific lookup from here on.
        inventory.refresh_integrations().await?;

        let reconciler = ElementReconciler::new(self.api.as_ref(), &inventory, &report);
        for phase in orderer::plan(&snapshot.elements) {
            if phase.batches.is_empty() {
                continue;
            }
            tracing::info!(phase = phase.name, "syncing");
            for batch in &phase.batches {
                reconciler.sync_batch(batch.element_type, &batch.elements).await?;
            }
        }

        Ok(report)
    }

    async fn collect_connectors(
        &self,
        integrations: &[Integration],
        options: ExportOptions,
    ) -> Result<Vec<ConnectorEntry>, MigrateError> {
        let referenced: HashSet<&str> = integrations
            .iter()
            .filter_map(|i| i.connector_id.as_deref())
            .collect();

        let mut entries = Vec::new();
        for connector in self.api.list_connectors().await? {
            if !options.all_connectors && !referenced.contains(connector.id.as_str()) {
                continue;
            }

            // Store connectors resolve by appUuid on import; only custom
            // connectors need their package carried along.
            let package = if connector.app_uuid.is_some() {
                None
            } else {
                match self
                    .api
                    .download_connector_package(&connector.id, connector.version_label())
                    .await
                {
                    Ok(bytes) => Some(bytes),
                    Err(err) => {
                        tracing::warn!(
                            connector = %connector.name,
                            %err,
                            "package download failed; archive omitted from snapshot"
                        );
                        None
                    }
                }
            };
            entries.push(ConnectorEntry { connector, package });
        }
        Ok(entries)
    }
}

async fn collect_elements(inventory: &WorkspaceInventory) -> Result<ElementSet, MigrateError> {
    let mut set = ElementSet::default();
    for element_type in ElementType::reconcilable() {
        let elements = inventory.elements(element_type).await?;
        let bound = elements
            .iter()
            .filter(|e| e.integration_key.is_some())
            .count();
        tracing::info!(
            %element_type,
            universal = elements.len() - bound,
            integration_specific = bound,
            "collected"
        );

        if !elements.is_empty() {
            set.insert(element_type, (*elements).clone());
        }
    }
    Ok(set)
}
