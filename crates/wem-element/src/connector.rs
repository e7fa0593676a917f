//! Connector and integration wire models
//!
//! Connectors are versioned packages; integrations bind one connector (at
//! one version) into a workspace. Unlike elements, both are matched across
//! workspaces by strong identity — `appUuid` for connectors, `key` for
//! integrations — so they get typed models instead of loose payload maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Version string of a mutable development build.
pub const DEVELOPMENT_VERSION: &str = "development";

/// A connector package as listed by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    pub id: String,
    pub name: String,
    /// Package version this listing entry describes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Stable cross-workspace identity for store-provided connectors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_uuid: Option<Uuid>,
    /// Locally-scoped base URI; never imported into another workspace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Connector {
    /// Directory name under `<root>/connectors/` for this connector's
    /// packages: `<name>_<sourceConnectorId>`.
    #[must_use]
    pub fn package_dir_name(&self) -> String {
        format!("{}_{}", self.name, self.id)
    }

    /// Version label, defaulting to the development build
    #[inline]
    #[must_use]
    pub fn version_label(&self) -> &str {
        self.version.as_deref().unwrap_or(DEVELOPMENT_VERSION)
    }

    /// Whether this entry describes the mutable development build
    #[inline]
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.version_label() == DEVELOPMENT_VERSION
    }
}

/// One published (or development) version of a connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorVersion {
    pub id: String,
    pub version: String,
}

/// A configured binding of one connector into a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub id: String,
    pub key: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector_id: Option<String>,
    /// Connector version the integration currently runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An integration as recorded in a snapshot.
///
/// Destination-assigned fields are stripped on export; what remains is
/// exactly what the matcher needs: the key, the display name, and the
/// source-scoped connector binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationSpec {
    pub key: String,
    pub name: String,
    /// Connector id in the *source* workspace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector_version: Option<String>,
}

impl From<&Integration> for IntegrationSpec {
    fn from(integration: &Integration) -> Self {
        Self {
            key: integration.key.clone(),
            name: integration.name.clone(),
            connector_id: integration.connector_id.clone(),
            connector_version: integration.connector_version.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn connector_deserializes_wire_document() {
        let connector: Connector = serde_json::from_value(json!({
            "id": "conn-1",
            "name": "hubspot",
            "version": "1.2.0",
            "appUuid": "7f1f1c5e-43b2-4a3e-9e13-111111111111",
            "baseUri": "https://internal.example",
            "logoUri": "https://cdn.example/hubspot.png"
        }))
        .unwrap();

        assert_eq!(connector.package_dir_name(), "hubspot_conn-1");
        assert!(!connector.is_development());
        assert!(connector.app_uuid.is_some());
        assert_eq!(
            connector.extra.get("logoUri"),
            Some(&json!("https://cdn.example/hubspot.png"))
        );
    }

    #[test]
    fn missing_version_means_development() {
        let connector: Connector =
            serde_json::from_value(json!({"id": "conn-2", "name": "custom-crm"})).unwrap();
        assert!(connector.is_development());
        assert_eq!(connector.version_label(), DEVELOPMENT_VERSION);
    }

    #[test]
    fn integration_spec_drops_destination_fields() {
        let integration: Integration = serde_json::from_value(json!({
            "id": "int-1",
            "key": "salesforce",
            "name": "Salesforce",
            "connectorId": "conn-9",
            "connectorVersion": "2.0.1",
            "workspaceId": "ws-1"
        }))
        .unwrap();

        let spec = IntegrationSpec::from(&integration);
        let value = serde_json::to_value(&spec).unwrap();
        assert!(value.get("id").is_none());
        assert!(value.get("workspaceId").is_none());
        assert_eq!(value["connectorId"], json!("conn-9"));
    }

    #[test]
    fn integration_round_trips() {
        let integration: Integration = serde_json::from_value(json!({
            "id": "int-1",
            "key": "salesforce",
            "name": "Salesforce",
            "connectorId": "conn-9",
            "connectorVersion": "2.0.1"
        }))
        .unwrap();

        let value = serde_json::to_value(&integration).unwrap();
        assert_eq!(value["connectorVersion"], json!("2.0.1"));
        let back: Integration = serde_json::from_value(value).unwrap();
        assert_eq!(integration, back);
    }
}
