//! Testing utilities for the WEM workspace
//!
//! Shared fixtures plus [`RecordingPlatform`], an in-memory
//! [`PlatformApi`] double that journals every call so tests can assert the
//! exact sequence of operations the engine issued.

#![allow(missing_docs)]

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use wem_api::{ApiError, ListFilter, PlatformApi};
use wem_element::{Connector, ConnectorVersion, Element, ElementType, Integration};

/// One journaled API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    FindAll {
        element_type: ElementType,
        integration_id: Option<String>,
    },
    Create {
        element_type: ElementType,
        key: String,
    },
    Update {
        element_type: ElementType,
        id: String,
    },
    Reset {
        element_type: ElementType,
        id: String,
    },
    Apply {
        element_type: ElementType,
        key: String,
        integration_keys: Vec<String>,
    },
    PutByKey {
        element_type: ElementType,
        key: String,
        integration_key: Option<String>,
    },
    ListConnectors,
    CreateConnector {
        name: String,
    },
    ConnectorVersions {
        connector_id: String,
    },
    DownloadPackage {
        connector_id: String,
        version: String,
    },
    UploadPackage {
        connector_id: String,
    },
    PublishVersion {
        connector_id: String,
        version: String,
    },
    ListIntegrations,
    CreateIntegration {
        key: String,
        connector_id: String,
    },
    SwitchConnectorVersion {
        integration_id: String,
        version_id: String,
    },
}

#[derive(Default)]
struct PlatformState {
    elements: HashMap<ElementType, Vec<Value>>,
    connectors: Vec<Connector>,
    connector_versions: HashMap<String, Vec<ConnectorVersion>>,
    packages: HashMap<(String, String), Vec<u8>>,
    integrations: Vec<Integration>,
    next_id: usize,
}

#[derive(Default)]
struct FailureModes {
    apply: bool,
    put_by_key: bool,
    reset: bool,
    integration_create: HashSet<String>,
}

/// In-memory platform with a call journal.
#[derive(Default)]
pub struct RecordingPlatform {
    calls: Mutex<Vec<ApiCall>>,
    state: Mutex<PlatformState>,
    failures: Mutex<FailureModes>,
}

impl RecordingPlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Journal of every call made so far
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().clone()
    }

    /// Drop the journal (useful between import runs)
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Count journaled calls matching a predicate
    pub fn count_calls(&self, predicate: impl Fn(&ApiCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    /// Seed a destination element document (should carry an `id`; bound
    /// elements should carry the owning `integrationId`)
    pub fn seed_element(&self, element_type: ElementType, document: Value) {
        self.state
            .lock()
            .elements
            .entry(element_type)
            .or_default()
            .push(document);
    }

    /// Seed a destination integration
    pub fn seed_integration(&self, integration: Integration) {
        self.state.lock().integrations.push(integration);
    }

    /// Seed a destination connector
    pub fn seed_connector(&self, connector: Connector) {
        self.state.lock().connectors.push(connector);
    }

    /// Seed the version list of a connector
    pub fn seed_connector_versions(&self, connector_id: &str, versions: Vec<ConnectorVersion>) {
        self.state
            .lock()
            .connector_versions
            .insert(connector_id.to_string(), versions);
    }

    /// Seed a downloadable package archive
    pub fn seed_package(&self, connector_id: &str, version: &str, bytes: Vec<u8>) {
        self.state
            .lock()
            .packages
            .insert((connector_id.to_string(), version.to_string()), bytes);
    }

    /// Make the apply endpoint reject
    pub fn fail_apply(&self) {
        self.failures.lock().apply = true;
    }

    /// Make the by-key upsert reject
    pub fn fail_put_by_key(&self) {
        self.failures.lock().put_by_key = true;
    }

    /// Make reset reject
    pub fn fail_reset(&self) {
        self.failures.lock().reset = true;
    }

    /// Make integration creation reject for one key
    pub fn fail_integration_create(&self, key: &str) {
        self.failures.lock().integration_create.insert(key.to_string());
    }

    /// Current destination documents of one type
    #[must_use]
    pub fn documents(&self, element_type: ElementType) -> Vec<Value> {
        self.state
            .lock()
            .elements
            .get(&element_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Current destination integrations
    #[must_use]
    pub fn integrations(&self) -> Vec<Integration> {
        self.state.lock().integrations.clone()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().push(call);
    }

    fn mint_id(&self, prefix: &str) -> String {
        let mut state = self.state.lock();
        state.next_id += 1;
        format!("{prefix}-{}", state.next_id)
    }

    fn rejection(endpoint: &str) -> ApiError {
        ApiError::Status {
            method: "POST",
            endpoint: endpoint.to_string(),
            status: 422,
            body: "rejected by test double".to_string(),
        }
    }

    fn integration_id_for_key(&self, key: &str) -> Option<String> {
        self.state
            .lock()
            .integrations
            .iter()
            .find(|i| i.key == key)
            .map(|i| i.id.clone())
    }
}

#[async_trait]
impl PlatformApi for RecordingPlatform {
    async fn find_all(
        &self,
        element_type: ElementType,
        filter: Option<&ListFilter>,
    ) -> Result<Vec<Value>, ApiError> {
        let integration_id = filter.and_then(|f| f.integration_id.clone());
        self.record(ApiCall::FindAll {
            element_type,
            integration_id: integration_id.clone(),
        });

        let state = self.state.lock();
        let documents = state.elements.get(&element_type).cloned().unwrap_or_default();
        Ok(documents
            .into_iter()
            .filter(|doc| match &integration_id {
                Some(id) => doc.get("integrationId").and_then(Value::as_str) == Some(id),
                None => doc.get("integrationId").is_none(),
            })
            .collect())
    }

    async fn create(&self, element_type: ElementType, document: &Value) -> Result<Value, ApiError> {
        let key = document
            .get("key")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.record(ApiCall::Create { element_type, key });

        let id = self.mint_id("gen");
        let mut stored = document.clone();
        if let Some(object) = stored.as_object_mut() {
            object.insert("id".into(), Value::String(id));
        }
        self.state
            .lock()
            .elements
            .entry(element_type)
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        element_type: ElementType,
        id: &str,
        document: &Value,
    ) -> Result<Value, ApiError> {
        self.record(ApiCall::Update {
            element_type,
            id: id.to_string(),
        });

        let mut state = self.state.lock();
        let documents = state.elements.entry(element_type).or_default();
        let Some(slot) = documents
            .iter_mut()
            .find(|doc| doc.get("id").and_then(Value::as_str) == Some(id))
        else {
            return Err(ApiError::Status {
                method: "PUT",
                endpoint: format!("{}/{id}", element_type.plural()),
                status: 404,
                body: "not found".to_string(),
            });
        };

        let mut updated = document.clone();
        if let Some(object) = updated.as_object_mut() {
            object.insert("id".into(), Value::String(id.to_string()));
            if let Some(integration_id) = slot.get("integrationId").and_then(Value::as_str) {
                object
                    .entry("integrationId")
                    .or_insert(Value::String(integration_id.to_string()));
            }
        }
        *slot = updated.clone();
        Ok(updated)
    }

    async fn reset(&self, element_type: ElementType, id: &str) -> Result<(), ApiError> {
        self.record(ApiCall::Reset {
            element_type,
            id: id.to_string(),
        });
        if self.failures.lock().reset {
            return Err(Self::rejection("reset"));
        }
        Ok(())
    }

    async fn apply_to_integrations(
        &self,
        element_type: ElementType,
        key: &str,
        integration_keys: &[String],
    ) -> Result<(), ApiError> {
        self.record(ApiCall::Apply {
            element_type,
            key: key.to_string(),
            integration_keys: integration_keys.to_vec(),
        });
        if self.failures.lock().apply {
            return Err(Self::rejection("apply"));
        }

        for integration_key in integration_keys {
            let integration_id = self.integration_id_for_key(integration_key);
            let id = self.mint_id("gen");
            let mut derived = json!({
                "id": id,
                "key": key,
                "parentId": format!("tpl-{key}"),
            });
            if let (Some(object), Some(integration_id)) =
                (derived.as_object_mut(), integration_id)
            {
                object.insert("integrationId".into(), Value::String(integration_id));
            }
            self.state
                .lock()
                .elements
                .entry(element_type)
                .or_default()
                .push(derived);
        }
        Ok(())
    }

    async fn put_by_key(
        &self,
        element_type: ElementType,
        key: &str,
        integration_key: Option<&str>,
        document: &Value,
    ) -> Result<Value, ApiError> {
        self.record(ApiCall::PutByKey {
            element_type,
            key: key.to_string(),
            integration_key: integration_key.map(str::to_owned),
        });
        if self.failures.lock().put_by_key {
            return Err(Self::rejection("put-by-key"));
        }

        let integration_id = integration_key.and_then(|k| self.integration_id_for_key(k));
        let mut stored = document.clone();
        if let Some(object) = stored.as_object_mut() {
            if let Some(integration_id) = &integration_id {
                object.insert(
                    "integrationId".into(),
                    Value::String(integration_id.clone()),
                );
            }
        }

        let fresh_id = self.mint_id("gen");
        let mut state = self.state.lock();
        let documents = state.elements.entry(element_type).or_default();
        let existing = documents.iter_mut().find(|doc| {
            doc.get("key").and_then(Value::as_str) == Some(key)
                && doc.get("integrationId").and_then(Value::as_str)
                    == integration_id.as_deref()
        });
        match existing {
            Some(slot) => {
                let id = slot.get("id").cloned();
                if let (Some(object), Some(id)) = (stored.as_object_mut(), id) {
                    object.insert("id".into(), id);
                }
                *slot = stored.clone();
            }
            None => {
                if let Some(object) = stored.as_object_mut() {
                    object.insert("id".into(), Value::String(fresh_id));
                }
                documents.push(stored.clone());
            }
        }
        Ok(stored)
    }

    async fn list_connectors(&self) -> Result<Vec<Connector>, ApiError> {
        self.record(ApiCall::ListConnectors);
        Ok(self.state.lock().connectors.clone())
    }

    async fn create_connector(&self, document: &Value) -> Result<Connector, ApiError> {
        let name = document
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.record(ApiCall::CreateConnector { name });

        let id = self.mint_id("conn");
        let mut stored = document.clone();
        if let Some(object) = stored.as_object_mut() {
            object.insert("id".into(), Value::String(id));
        }
        let connector: Connector =
            serde_json::from_value(stored).map_err(|_| Self::rejection("connectors"))?;
        self.state.lock().connectors.push(connector.clone());
        Ok(connector)
    }

    async fn connector_versions(
        &self,
        connector_id: &str,
    ) -> Result<Vec<ConnectorVersion>, ApiError> {
        self.record(ApiCall::ConnectorVersions {
            connector_id: connector_id.to_string(),
        });
        Ok(self
            .state
            .lock()
            .connector_versions
            .get(connector_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn download_connector_package(
        &self,
        connector_id: &str,
        version: &str,
    ) -> Result<Vec<u8>, ApiError> {
        self.record(ApiCall::DownloadPackage {
            connector_id: connector_id.to_string(),
            version: version.to_string(),
        });
        self.state
            .lock()
            .packages
            .get(&(connector_id.to_string(), version.to_string()))
            .cloned()
            .ok_or_else(|| ApiError::Status {
                method: "GET",
                endpoint: format!("connectors/{connector_id}/versions/{version}/package"),
                status: 404,
                body: "no package".to_string(),
            })
    }

    async fn upload_connector_package(
        &self,
        connector_id: &str,
        _package: Vec<u8>,
    ) -> Result<(), ApiError> {
        self.record(ApiCall::UploadPackage {
            connector_id: connector_id.to_string(),
        });
        Ok(())
    }

    async fn publish_connector_version(
        &self,
        connector_id: &str,
        version: &str,
        _package: Vec<u8>,
        _changelog: &str,
    ) -> Result<(), ApiError> {
        self.record(ApiCall::PublishVersion {
            connector_id: connector_id.to_string(),
            version: version.to_string(),
        });
        Ok(())
    }

    async fn list_integrations(&self) -> Result<Vec<Integration>, ApiError> {
        self.record(ApiCall::ListIntegrations);
        Ok(self.state.lock().integrations.clone())
    }

    async fn create_integration(
        &self,
        key: &str,
        name: &str,
        connector_id: &str,
    ) -> Result<Integration, ApiError> {
        self.record(ApiCall::CreateIntegration {
            key: key.to_string(),
            connector_id: connector_id.to_string(),
        });
        if self.failures.lock().integration_create.contains(key) {
            return Err(Self::rejection("integrations"));
        }

        let integration = Integration {
            id: self.mint_id("int"),
            key: key.to_string(),
            name: name.to_string(),
            connector_id: Some(connector_id.to_string()),
            connector_version: None,
            extra: serde_json::Map::new(),
        };
        self.state.lock().integrations.push(integration.clone());
        Ok(integration)
    }

    async fn switch_integration_connector_version(
        &self,
        integration_id: &str,
        version_id: &str,
    ) -> Result<(), ApiError> {
        self.record(ApiCall::SwitchConnectorVersion {
            integration_id: integration_id.to_string(),
            version_id: version_id.to_string(),
        });

        let mut state = self.state.lock();
        let version = state
            .connector_versions
            .values()
            .flatten()
            .find(|v| v.id == version_id)
            .map(|v| v.version.clone());
        if let Some(integration) = state
            .integrations
            .iter_mut()
            .find(|i| i.id == integration_id)
        {
            integration.connector_version = version;
        }
        Ok(())
    }
}

/// Parse a fixture document into an [`Element`], panicking on bad fixtures.
#[must_use]
pub fn element(value: Value) -> Element {
    Element::from_value(value).expect("fixture element")
}

/// A universal flow template document.
#[must_use]
pub fn universal_flow(key: &str) -> Value {
    json!({ "key": key, "name": key, "nodes": {} })
}

/// A derived integration-bound flow document.
#[must_use]
pub fn derived_flow(key: &str, integration_key: &str, customized: bool) -> Value {
    let mut doc = json!({
        "key": key,
        "integrationKey": integration_key,
        "universalFlowId": format!("tpl-{key}"),
        "nodes": {"start": {}}
    });
    if customized {
        doc.as_object_mut()
            .expect("fixture object")
            .insert("customized".into(), Value::Bool(true));
    }
    doc
}

/// An integration fixture.
#[must_use]
pub fn integration(id: &str, key: &str, connector_id: &str, version: Option<&str>) -> Integration {
    Integration {
        id: id.to_string(),
        key: key.to_string(),
        name: key.to_string(),
        connector_id: Some(connector_id.to_string()),
        connector_version: version.map(str::to_owned),
        extra: serde_json::Map::new(),
    }
}

/// A connector fixture.
#[must_use]
pub fn connector(id: &str, name: &str, version: &str, app_uuid: Option<&str>) -> Connector {
    serde_json::from_value(match app_uuid {
        Some(uuid) => json!({ "id": id, "name": name, "version": version, "appUuid": uuid }),
        None => json!({ "id": id, "name": name, "version": version }),
    })
    .expect("fixture connector")
}
