//! Connector and integration matching
//!
//! Makes every source connector/integration identifier resolvable to a
//! destination identifier before any element referencing them is processed.
//!
//! Connector identity: `appUuid` when present (store connectors — the
//! steady-state path, zero uploads), otherwise explicit creation plus a
//! package upload per version. Integration identity: `key`.
//!
//! Integration creation failures accumulate into the mismatch list instead
//! of aborting immediately; the full list is tabulated and the run aborts
//! after the pass, because element sync cannot proceed with unresolvable
//! integration ids.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use wem_api::PlatformApi;
use wem_element::{Integration, IntegrationSpec, DEVELOPMENT_VERSION};
use wem_snapshot::{ConnectorEntry, Snapshot};

use crate::error::MigrateError;
use crate::report::{IntegrationMismatch, RunReport};

/// Changelog entry attached to published connector versions.
const IMPORT_CHANGELOG: &str = "Imported version";

/// Source connector id → destination connector id.
#[derive(Debug, Clone, Default)]
pub struct ConnectorMapping {
    map: HashMap<String, String>,
}

impl ConnectorMapping {
    /// Destination id for a source connector, if resolved
    #[inline]
    #[must_use]
    pub fn get(&self, source_id: &str) -> Option<&str> {
        self.map.get(source_id).map(String::as_str)
    }

    /// Record a resolved mapping
    #[inline]
    pub fn insert(&mut self, source_id: impl Into<String>, destination_id: impl Into<String>) {
        self.map.insert(source_id.into(), destination_id.into());
    }

    /// Number of resolved connectors
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no connector has been resolved
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Reconcile source connectors against the destination workspace.
///
/// Versions are grouped per source connector and processed in
/// lexicographic order. Each version uploads independently: the mutable
/// `development` build goes through the upload endpoint, published versions
/// through publish-version with a generated changelog entry.
pub async fn sync_connectors(
    api: &dyn PlatformApi,
    snapshot: &Snapshot,
    report: &RunReport,
    workspace_id: Option<&str>,
) -> Result<ConnectorMapping, MigrateError> {
    let destination = api.list_connectors().await?;
    let mut mapping = ConnectorMapping::default();

    // Group by source id, versions in lexicographic order. Multi-digit
    // semantic versions misorder under this sort; kept as-is until the
    // platform owners confirm the intended ordering.
    let mut grouped: BTreeMap<&str, BTreeMap<&str, &ConnectorEntry>> = BTreeMap::new();
    for entry in &snapshot.connectors {
        grouped
            .entry(entry.connector.id.as_str())
            .or_default()
            .insert(entry.connector.version_label(), entry);
    }

    for (source_id, versions) in grouped {
        for (version, entry) in versions {
            if let Some(app_uuid) = entry.connector.app_uuid {
                if let Some(existing) = destination.iter().find(|c| c.app_uuid == Some(app_uuid)) {
                    tracing::info!(
                        connector = %entry.connector.name,
                        %app_uuid,
                        "matched store connector"
                    );
                    mapping.insert(source_id, existing.id.clone());
                    continue;
                }
            }

            let destination_id = match mapping.get(source_id) {
                Some(id) => id.to_string(),
                None => {
                    let created = create_connector(api, entry, workspace_id).await?;
                    mapping.insert(source_id, created.clone());
                    created
                }
            };

            match &entry.package {
                None => report.warn(
                    entry.connector.name.clone(),
                    format!("no package archive for version {version}; upload skipped"),
                ),
                Some(package) => {
                    if version == DEVELOPMENT_VERSION {
                        api.upload_connector_package(&destination_id, package.clone())
                            .await?;
                        tracing::info!(connector = %entry.connector.name, "uploaded development build");
                    } else {
                        api.publish_connector_version(
                            &destination_id,
                            version,
                            package.clone(),
                            IMPORT_CHANGELOG,
                        )
                        .await?;
                        tracing::info!(connector = %entry.connector.name, version, "published version");
                    }
                }
            }
        }
    }

    Ok(mapping)
}

async fn create_connector(
    api: &dyn PlatformApi,
    entry: &ConnectorEntry,
    workspace_id: Option<&str>,
) -> Result<String, MigrateError> {
    let mut document = serde_json::to_value(&entry.connector)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();
    // The base URI is scoped to the source workspace.
    document.remove("baseUri");
    if let Some(workspace_id) = workspace_id {
        document.insert(
            "workspaceId".into(),
            Value::String(workspace_id.to_string()),
        );
    }

    let created = api.create_connector(&Value::Object(document)).await?;
    tracing::info!(connector = %entry.connector.name, id = %created.id, "connector created");
    Ok(created.id)
}

/// Reconcile source integrations against the destination workspace.
///
/// # Errors
/// Raises [`MigrateError::IntegrationMismatch`] after the full pass when any
/// integration could not be resolved; the mismatch table is logged first so
/// the operator can act on it.
pub async fn sync_integrations(
    api: &dyn PlatformApi,
    snapshot: &Snapshot,
    mapping: &ConnectorMapping,
    report: &RunReport,
) -> Result<(), MigrateError> {
    let destination = api.list_integrations().await?;

    for spec in &snapshot.integrations {
        match destination.iter().find(|i| i.key == spec.key) {
            None => create_integration(api, spec, mapping, report).await?,
            Some(existing) => align_connector_version(api, spec, existing, report).await?,
        }
    }

    if report.has_mismatches() {
        let count = report.mismatches().len();
        tracing::error!(
            "unresolvable integrations; make sure these applications exist in the destination workspace:\n{}",
            report.mismatch_table()
        );
        return Err(MigrateError::IntegrationMismatch { count });
    }
    Ok(())
}

async fn create_integration(
    api: &dyn PlatformApi,
    spec: &IntegrationSpec,
    mapping: &ConnectorMapping,
    report: &RunReport,
) -> Result<(), MigrateError> {
    let connector_id = spec
        .connector_id
        .as_deref()
        .and_then(|source_id| mapping.get(source_id));
    let Some(connector_id) = connector_id else {
        report.add_mismatch(IntegrationMismatch {
            key: spec.key.clone(),
            name: spec.name.clone(),
        });
        return Ok(());
    };

    match api.create_integration(&spec.key, &spec.name, connector_id).await {
        Err(err) => {
            // Typical cause: the custom connector is not available here.
            tracing::debug!(key = %spec.key, %err, "integration create rejected");
            report.add_mismatch(IntegrationMismatch {
                key: spec.key.clone(),
                name: spec.name.clone(),
            });
        }
        Ok(created) => {
            tracing::info!(key = %created.key, name = %created.name, "integration created");
            if let Some(wanted) = &spec.connector_version {
                if created.connector_version.as_ref() != Some(wanted) {
                    switch_version(api, &created.id, connector_id, wanted, report).await?;
                }
            }
        }
    }
    Ok(())
}

async fn align_connector_version(
    api: &dyn PlatformApi,
    spec: &IntegrationSpec,
    existing: &Integration,
    report: &RunReport,
) -> Result<(), MigrateError> {
    let Some(wanted) = &spec.connector_version else {
        tracing::debug!(key = %spec.key, "integration matched");
        return Ok(());
    };
    if existing.connector_version.as_ref() == Some(wanted) {
        tracing::debug!(key = %spec.key, "integration matched");
        return Ok(());
    }

    let Some(connector_id) = existing.connector_id.as_deref() else {
        report.warn(
            spec.key.clone(),
            "destination integration has no connector binding; version left as-is",
        );
        return Ok(());
    };

    report.warn(
        spec.key.clone(),
        format!(
            "connector version drift: destination ran {}, switching to {wanted}",
            existing.connector_version.as_deref().unwrap_or("unknown"),
        ),
    );
    switch_version(api, &existing.id, connector_id, wanted, report).await
}

async fn switch_version(
    api: &dyn PlatformApi,
    integration_id: &str,
    connector_id: &str,
    version: &str,
    report: &RunReport,
) -> Result<(), MigrateError> {
    let versions = api.connector_versions(connector_id).await?;
    match versions.iter().find(|v| v.version == version) {
        Some(found) => {
            api.switch_integration_connector_version(integration_id, &found.id)
                .await?;
            tracing::info!(integration_id, version, "switched connector version");
        }
        None => report.warn(
            integration_id.to_string(),
            format!("connector version {version} not available in the destination"),
        ),
    }
    Ok(())
}
