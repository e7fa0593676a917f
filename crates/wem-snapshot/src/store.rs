//! Directory-addressed snapshot persistence
//!
//! One serialized document per element, addressed by
//! `type/key[/integrationKey]`; connector packages live beside their
//! descriptors:
//!
//! ```text
//! <root>/connectors/<name>_<sourceConnectorId>/<version>/<version>.yaml
//! <root>/connectors/<name>_<sourceConnectorId>/<version>/<version>.zip
//! <root>/<plural>/<key>/<key>.yaml                                  (universal)
//! <root>/<plural>/<key>/<integrationKey>/<integrationKey>.yaml      (bound)
//! ```
//!
//! Writing is idempotent: re-running an export overwrites files in place.
//! Reading tolerates an element stored either as a single file or as a
//! directory of per-integration variants.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use wem_element::{Connector, Element, ElementSet, ElementType, IntegrationSpec};

use crate::error::SnapshotError;

const CONNECTORS_DIR: &str = "connectors";

/// A connector descriptor plus its package archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorEntry {
    pub connector: Connector,
    /// Package bytes; absent when the source had no downloadable archive
    pub package: Option<Vec<u8>>,
}

/// Everything one export produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub connectors: Vec<ConnectorEntry>,
    /// Integrations recorded for the matcher phase (not reconciled as elements)
    pub integrations: Vec<IntegrationSpec>,
    pub elements: ElementSet,
}

impl Snapshot {
    /// Total number of element documents
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.values().map(Vec::len).sum()
    }
}

/// Reads and writes snapshots under one root directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    /// Create a store rooted at `root`. The directory is created on write.
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Snapshot root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist a snapshot, applying export cleanup to every document.
    ///
    /// # Errors
    /// Any filesystem failure aborts the write with the offending path.
    pub fn write(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        for entry in &snapshot.connectors {
            self.write_connector(entry)?;
        }
        for spec in &snapshot.integrations {
            self.write_integration(spec)?;
        }

        for (element_type, elements) in &snapshot.elements {
            for element in elements {
                self.write_element(*element_type, element)?;
            }
        }

        tracing::info!(
            root = %self.root.display(),
            connectors = snapshot.connectors.len(),
            elements = snapshot.element_count(),
            "snapshot written"
        );
        Ok(())
    }

    /// Load a snapshot from disk.
    ///
    /// Element types are returned in catalog order. Unknown top-level
    /// directories are skipped with a warning.
    ///
    /// # Errors
    /// Fails on unreadable files or documents that do not parse.
    pub fn read(&self) -> Result<Snapshot, SnapshotError> {
        let mut snapshot = Snapshot::default();

        snapshot.connectors = self.read_connectors()?;
        snapshot.integrations = self.read_integrations()?;
        for element_type in ElementType::CATALOG {
            if !element_type.exportable() {
                continue;
            }
            let dir = self.root.join(element_type.plural());
            if !dir.is_dir() {
                continue;
            }
            let elements = self.read_element_dir(&dir)?;
            snapshot.elements.insert(element_type, elements);
        }

        self.warn_unknown_entries()?;
        Ok(snapshot)
    }

    fn write_connector(&self, entry: &ConnectorEntry) -> Result<(), SnapshotError> {
        let version = entry.connector.version_label().to_string();
        let dir = self
            .root
            .join(CONNECTORS_DIR)
            .join(entry.connector.package_dir_name())
            .join(&version);
        fs::create_dir_all(&dir).map_err(|e| SnapshotError::io(&dir, e))?;

        let mut document = serde_json::to_value(&entry.connector)
            .ok()
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();
        ElementType::Connector.export_cleanup(&mut document);

        let yaml_path = dir.join(format!("{version}.yaml"));
        write_yaml(&yaml_path, &Value::Object(document))?;

        if let Some(package) = &entry.package {
            let zip_path = dir.join(format!("{version}.zip"));
            fs::write(&zip_path, package).map_err(|e| SnapshotError::io(&zip_path, e))?;
        }
        Ok(())
    }

    fn write_element(
        &self,
        element_type: ElementType,
        element: &Element,
    ) -> Result<(), SnapshotError> {
        let dir = match &element.integration_key {
            Some(integration_key) => self
                .root
                .join(element_type.plural())
                .join(&element.key)
                .join(integration_key),
            None => self.root.join(element_type.plural()).join(&element.key),
        };
        fs::create_dir_all(&dir).map_err(|e| SnapshotError::io(&dir, e))?;

        let file_stem = element.integration_key.as_deref().unwrap_or(&element.key);
        let path = dir.join(format!("{file_stem}.yaml"));
        write_yaml(&path, &element.export_document(element_type))?;
        tracing::debug!(path = %path.display(), "element exported");
        Ok(())
    }

    fn write_integration(&self, spec: &IntegrationSpec) -> Result<(), SnapshotError> {
        let dir = self
            .root
            .join(ElementType::Integration.plural())
            .join(&spec.key);
        fs::create_dir_all(&dir).map_err(|e| SnapshotError::io(&dir, e))?;

        let path = dir.join(format!("{}.yaml", spec.key));
        let document = serde_json::to_value(spec).unwrap_or_default();
        write_yaml(&path, &document)
    }

    fn read_integrations(&self) -> Result<Vec<IntegrationSpec>, SnapshotError> {
        let dir = self.root.join(ElementType::Integration.plural());
        let mut specs = Vec::new();
        if !dir.is_dir() {
            return Ok(specs);
        }

        for key_dir in list_dirs(&dir)? {
            let path = key_dir.join(format!("{}.yaml", file_name(&key_dir)));
            let document = read_yaml(&path)?;
            let spec: IntegrationSpec = serde_json::from_value(document).map_err(|source| {
                SnapshotError::Entity {
                    entity: "integration",
                    path: path.clone(),
                    source,
                }
            })?;
            specs.push(spec);
        }
        Ok(specs)
    }

    fn read_connectors(&self) -> Result<Vec<ConnectorEntry>, SnapshotError> {
        let dir = self.root.join(CONNECTORS_DIR);
        let mut entries = Vec::new();
        if !dir.is_dir() {
            return Ok(entries);
        }

        for connector_dir in list_dirs(&dir)? {
            for version_dir in list_dirs(&connector_dir)? {
                let version = file_name(&version_dir);
                let yaml_path = version_dir.join(format!("{version}.yaml"));
                let document = read_yaml(&yaml_path)?;
                let connector: Connector = serde_json::from_value(document).map_err(|source| {
                    SnapshotError::Entity {
                        entity: "connector",
                        path: yaml_path.clone(),
                        source,
                    }
                })?;

                let zip_path = version_dir.join(format!("{version}.zip"));
                let package = match zip_path.is_file() {
                    true => {
                        Some(fs::read(&zip_path).map_err(|e| SnapshotError::io(&zip_path, e))?)
                    }
                    false => None,
                };

                entries.push(ConnectorEntry { connector, package });
            }
        }
        Ok(entries)
    }

    fn read_element_dir(&self, dir: &Path) -> Result<Vec<Element>, SnapshotError> {
        let mut elements = Vec::new();
        for key_dir in list_dirs(dir)? {
            let listing = fs::read_dir(&key_dir).map_err(|e| SnapshotError::io(&key_dir, e))?;
            for entry in listing {
                let entry = entry.map_err(|e| SnapshotError::io(&key_dir, e))?;
                let path = entry.path();
                let document_path = if path.is_dir() {
                    // One directory per integration variant.
                    path.join(format!("{}.yaml", file_name(&path)))
                } else {
                    path
                };
                elements.push(self.read_element_file(&document_path)?);
            }
        }
        Ok(elements)
    }

    fn read_element_file(&self, path: &Path) -> Result<Element, SnapshotError> {
        let document = read_yaml(path)?;
        let element = Element::from_value(document).map_err(|source| SnapshotError::Element {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "element loaded");
        Ok(element)
    }

    fn warn_unknown_entries(&self) -> Result<(), SnapshotError> {
        for dir in list_dirs(&self.root)? {
            let name = file_name(&dir);
            if name != CONNECTORS_DIR && ElementType::from_plural(&name).is_none() {
                tracing::warn!(directory = %name, "unknown snapshot entry skipped");
            }
        }
        Ok(())
    }
}

fn write_yaml(path: &Path, document: &Value) -> Result<(), SnapshotError> {
    let yaml = serde_yaml::to_string(document).map_err(|source| SnapshotError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, yaml).map_err(|e| SnapshotError::io(path, e))
}

fn read_yaml(path: &Path) -> Result<Value, SnapshotError> {
    let text = fs::read_to_string(path).map_err(|e| SnapshotError::io(path, e))?;
    serde_yaml::from_str(&text).map_err(|source| SnapshotError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

fn list_dirs(dir: &Path) -> Result<Vec<PathBuf>, SnapshotError> {
    let mut dirs = Vec::new();
    let listing = fs::read_dir(dir).map_err(|e| SnapshotError::io(dir, e))?;
    for entry in listing {
        let entry = entry.map_err(|e| SnapshotError::io(dir, e))?;
        if entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn element(value: Value) -> Element {
        Element::from_value(value).unwrap()
    }

    fn sample_snapshot() -> Snapshot {
        let mut elements = ElementSet::default();
        elements.insert(
            ElementType::Flow,
            vec![
                element(json!({"key": "sync-contacts", "nodes": {}})),
                element(json!({
                    "key": "sync-contacts",
                    "integrationKey": "salesforce",
                    "universalFlowId": "flow-1",
                    "customized": true
                })),
            ],
        );
        elements.insert(
            ElementType::DataSource,
            vec![element(
                json!({"key": "contacts", "integrationKey": "salesforce"}),
            )],
        );

        let connector: Connector = serde_json::from_value(json!({
            "id": "conn-1",
            "name": "custom-crm",
            "version": "1.0.0"
        }))
        .unwrap();

        Snapshot {
            connectors: vec![ConnectorEntry {
                connector,
                package: Some(b"zipbytes".to_vec()),
            }],
            integrations: vec![IntegrationSpec {
                key: "salesforce".into(),
                name: "Salesforce".into(),
                connector_id: Some("conn-1".into()),
                connector_version: Some("1.0.0".into()),
            }],
            elements,
        }
    }

    #[test]
    fn layout_matches_contract() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.write(&sample_snapshot()).unwrap();

        assert!(dir
            .path()
            .join("connectors/custom-crm_conn-1/1.0.0/1.0.0.yaml")
            .is_file());
        assert!(dir
            .path()
            .join("connectors/custom-crm_conn-1/1.0.0/1.0.0.zip")
            .is_file());
        assert!(dir
            .path()
            .join("integrations/salesforce/salesforce.yaml")
            .is_file());
        assert!(dir.path().join("flows/sync-contacts/sync-contacts.yaml").is_file());
        assert!(dir
            .path()
            .join("flows/sync-contacts/salesforce/salesforce.yaml")
            .is_file());
        assert!(dir
            .path()
            .join("dataSources/contacts/salesforce/salesforce.yaml")
            .is_file());
    }

    #[test]
    fn round_trip_preserves_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let snapshot = sample_snapshot();
        store.write(&snapshot).unwrap();

        let loaded = store.read().unwrap();

        assert_eq!(loaded.connectors, snapshot.connectors);
        assert_eq!(loaded.integrations, snapshot.integrations);
        // Catalog order puts data sources before flows.
        let types: Vec<_> = loaded.elements.keys().copied().collect();
        assert_eq!(types, vec![ElementType::DataSource, ElementType::Flow]);

        let flows = &loaded.elements[&ElementType::Flow];
        assert_eq!(flows.len(), 2);
        assert!(flows.iter().any(|f| f.integration_key.is_none()));
        let derived = flows
            .iter()
            .find(|f| f.integration_key.is_some())
            .unwrap();
        assert!(derived.has_parent());
        assert!(derived.is_customized());
    }

    #[test]
    fn rewrite_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let snapshot = sample_snapshot();

        store.write(&snapshot).unwrap();
        store.write(&snapshot).unwrap();

        assert_eq!(store.read().unwrap().element_count(), 3);
    }

    #[test]
    fn unknown_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.write(&sample_snapshot()).unwrap();
        fs::create_dir_all(dir.path().join("widgets/mystery")).unwrap();

        let loaded = store.read().unwrap();
        assert_eq!(loaded.element_count(), 3);
    }

    #[test]
    fn exported_documents_have_no_platform_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let mut elements = ElementSet::default();
        elements.insert(
            ElementType::FieldMapping,
            vec![element(json!({
                "id": "fm-1",
                "key": "contact-mapping",
                "integrationKey": "salesforce",
                "workspaceId": "ws-1",
                "revision": 3,
                "dataSourceId": "ds-1",
                "createdAt": "2024-01-01T00:00:00Z"
            }))],
        );
        store
            .write(&Snapshot {
                elements,
                ..Snapshot::default()
            })
            .unwrap();

        let yaml = fs::read_to_string(
            dir.path()
                .join("fieldMappings/contact-mapping/salesforce/salesforce.yaml"),
        )
        .unwrap();
        for field in ["workspaceId", "revision", "dataSourceId", "createdAt", "id:"] {
            assert!(!yaml.contains(field), "{field} leaked into {yaml}");
        }
    }

    #[test]
    fn reading_missing_root_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("never-exported"));
        assert!(matches!(store.read(), Err(SnapshotError::Io { .. })));
    }
}
