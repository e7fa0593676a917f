//! Element type catalog
//!
//! Closed enumeration of every workspace element type with its associated
//! capabilities: wire spellings, integration binding, exportability, and the
//! type-specific export cleanup transform.
//!
//! The catalog replaces a string-keyed lookup table: adding behavior for a
//! new type is a compile-time-exhaustive `match`, not a registry entry.

use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::cleanup;

/// A workspace element type.
///
/// [`ElementType::CATALOG`] fixes the canonical iteration order; snapshot
/// directories and reconciliation batches both follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// Versioned connector package (handled by the connector matcher)
    #[serde(rename = "connector")]
    Connector,
    /// Binding of a connector into a workspace (handled by the matcher)
    #[serde(rename = "integration")]
    Integration,
    /// Universal application data schema
    #[serde(rename = "appDataSchema")]
    AppDataSchema,
    /// Universal application event type
    #[serde(rename = "appEventType")]
    AppEventType,
    /// Universal data-link table
    #[serde(rename = "dataLinkTable")]
    DataLinkTable,
    /// Integration-bound data source
    #[serde(rename = "dataSource")]
    DataSource,
    /// Integration-bound field mapping (references a data source)
    #[serde(rename = "fieldMapping")]
    FieldMapping,
    /// Flow (universal template or integration-bound instance)
    #[serde(rename = "flow")]
    Flow,
    /// Action (universal template or integration-bound instance)
    #[serde(rename = "action")]
    Action,
}

impl ElementType {
    /// Canonical catalog order.
    ///
    /// Connectors and integrations first (identity resolution), then
    /// universal types, then data sources, then the element types that may
    /// reference them.
    pub const CATALOG: [ElementType; 9] = [
        ElementType::Connector,
        ElementType::Integration,
        ElementType::AppDataSchema,
        ElementType::AppEventType,
        ElementType::DataLinkTable,
        ElementType::DataSource,
        ElementType::FieldMapping,
        ElementType::Flow,
        ElementType::Action,
    ];

    /// Singular wire name
    #[inline]
    #[must_use]
    pub fn singular(&self) -> &'static str {
        match self {
            Self::Connector => "connector",
            Self::Integration => "integration",
            Self::AppDataSchema => "appDataSchema",
            Self::AppEventType => "appEventType",
            Self::DataLinkTable => "dataLinkTable",
            Self::DataSource => "dataSource",
            Self::FieldMapping => "fieldMapping",
            Self::Flow => "flow",
            Self::Action => "action",
        }
    }

    /// Plural wire name (collection endpoints, snapshot directories)
    #[inline]
    #[must_use]
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Connector => "connectors",
            Self::Integration => "integrations",
            Self::AppDataSchema => "appDataSchemas",
            Self::AppEventType => "appEventTypes",
            Self::DataLinkTable => "dataLinkTables",
            Self::DataSource => "dataSources",
            Self::FieldMapping => "fieldMappings",
            Self::Flow => "flows",
            Self::Action => "actions",
        }
    }

    /// Whether instances of this type may be bound to one integration
    #[inline]
    #[must_use]
    pub fn integration_specific(&self) -> bool {
        matches!(
            self,
            Self::DataSource | Self::FieldMapping | Self::Flow | Self::Action
        )
    }

    /// Whether the element reconciler processes this type.
    ///
    /// Connectors and integrations resolve identity through the matcher
    /// phase instead; integration export is not supported by the platform.
    #[inline]
    #[must_use]
    pub fn exportable(&self) -> bool {
        !matches!(self, Self::Connector | Self::Integration)
    }

    /// Apply the type-specific export cleanup transform.
    ///
    /// Runs after the base strip. Field mappings lose their workspace-local
    /// `dataSourceId`; connectors are reduced to the public-safe subset.
    pub fn export_cleanup(&self, payload: &mut Map<String, serde_json::Value>) {
        match self {
            Self::FieldMapping => {
                payload.remove("dataSourceId");
            }
            Self::Connector => cleanup::retain_connector_public_fields(payload),
            _ => {}
        }
    }

    /// Resolve a type from its plural directory/endpoint name
    #[must_use]
    pub fn from_plural(name: &str) -> Option<Self> {
        Self::CATALOG.into_iter().find(|t| t.plural() == name)
    }

    /// Element types the reconciler iterates, in catalog order
    pub fn reconcilable() -> impl Iterator<Item = ElementType> {
        Self::CATALOG.into_iter().filter(ElementType::exportable)
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.singular())
    }
}
