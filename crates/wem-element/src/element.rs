//! The workspace element
//!
//! An [`Element`] is the atomic unit of configuration moved between
//! workspaces. The wire format is a loosely-typed JSON document; parsing
//! lifts the identity fields out of the payload so the engine never has to
//! re-derive them:
//!
//! - `key` — author-assigned, stable across workspaces
//! - `integration_key` — present iff the instance is bound to an integration
//! - `parent` — an explicit, typed parent reference. The wire format encodes
//!   parentage structurally (an attribute matching `universal*Id` or
//!   `parentId`); detection happens exactly once, at parse time.
//! - `customized` — a derived instance whose payload diverged from its parent
//! - `id` — destination-assigned; kept for inventory elements so the engine
//!   can address update/reset calls, never persisted

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::cleanup;
use crate::element_type::ElementType;
use crate::error::ElementError;

/// Wire attributes that mark an element as derived from a universal parent.
static PARENT_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(universal\w*Id|parentId)$").unwrap());

/// Reference from a derived instance to its universal parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentReference {
    /// The payload attribute that carried the reference (`universalFlowId`, `parentId`, ...)
    pub attribute: String,
    /// The parent's id in the *source* workspace
    pub parent_id: String,
}

/// One workspace element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Author-assigned key, unique within `(type, integration_key)`
    pub key: String,
    /// Owning integration key, if integration-specific
    pub integration_key: Option<String>,
    /// Universal parent, if this is a derived instance
    pub parent: Option<ParentReference>,
    /// Whether a derived instance intentionally diverges from its parent
    pub customized: bool,
    /// Platform-assigned id (inventory elements only)
    pub id: Option<String>,
    /// Remaining type-specific fields
    pub payload: Map<String, Value>,
}

impl Element {
    /// Parse an element from its wire document.
    ///
    /// Lifts `key`, `id`, `integrationKey` (or the embedded `integration`
    /// object's key), and the customization flag out of the payload, drops
    /// the workspace-local `integrationId`, and detects the parent
    /// reference.
    ///
    /// # Errors
    /// Returns [`ElementError::NotAnObject`] for non-object documents and
    /// [`ElementError::MissingKey`] when the `key` attribute is absent or
    /// not a string.
    pub fn from_value(value: Value) -> Result<Self, ElementError> {
        let Value::Object(mut payload) = value else {
            return Err(ElementError::NotAnObject);
        };

        let key = match payload.remove("key") {
            Some(Value::String(key)) => key,
            _ => return Err(ElementError::MissingKey),
        };

        let id = match payload.remove("id") {
            Some(Value::String(id)) => Some(id),
            _ => None,
        };

        let integration_key = match payload.remove("integrationKey") {
            Some(Value::String(key)) => Some(key),
            _ => None,
        };
        // The embedded integration object and integrationId are
        // destination-local; only the key survives.
        let embedded = payload.remove("integration");
        let integration_key = integration_key.or_else(|| {
            embedded
                .as_ref()
                .and_then(|i| i.get("key"))
                .and_then(Value::as_str)
                .map(str::to_owned)
        });
        payload.remove("integrationId");

        let customized = payload
            .remove("customized")
            .or_else(|| payload.remove("isCustomized"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let parent = payload.iter().find_map(|(attr, value)| {
            PARENT_ATTR.is_match(attr).then(|| ParentReference {
                attribute: attr.clone(),
                parent_id: match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
            })
        });

        Ok(Self {
            key,
            integration_key,
            parent,
            customized,
            id,
            payload,
        })
    }

    /// Whether this element is derived from a universal parent
    #[inline]
    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    /// Whether this is an intentionally customized derived instance.
    ///
    /// Only integration-specific instances can be customized; the flag is
    /// meaningless on a universal template.
    #[inline]
    #[must_use]
    pub fn is_customized(&self) -> bool {
        self.customized && self.integration_key.is_some()
    }

    /// Scope label for operator-facing logs
    #[inline]
    #[must_use]
    pub fn scope_label(&self) -> &str {
        self.integration_key.as_deref().unwrap_or("universal")
    }

    /// Reassemble the wire document sent to the destination.
    ///
    /// The platform id is deliberately absent: create/update calls address
    /// elements by destination id or key, never by a foreign id.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        let mut doc = self.payload.clone();
        doc.insert("key".into(), Value::String(self.key.clone()));
        if let Some(integration_key) = &self.integration_key {
            doc.insert(
                "integrationKey".into(),
                Value::String(integration_key.clone()),
            );
        }
        if self.customized {
            doc.insert("customized".into(), Value::Bool(true));
        }
        Value::Object(doc)
    }

    /// Produce the persisted export document: base strip, then the
    /// type-specific cleanup transform.
    #[must_use]
    pub fn export_document(&self, element_type: ElementType) -> Value {
        let mut doc = self.clone();
        cleanup::base_export_cleanup(&mut doc.payload);
        element_type.export_cleanup(&mut doc.payload);
        doc.to_wire()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_universal_element() {
        let element = Element::from_value(json!({
            "id": "el-1",
            "key": "sync-contacts",
            "name": "Sync Contacts",
            "nodes": {}
        }))
        .unwrap();

        assert_eq!(element.key, "sync-contacts");
        assert_eq!(element.id.as_deref(), Some("el-1"));
        assert_eq!(element.integration_key, None);
        assert!(!element.has_parent());
        assert!(!element.is_customized());
        assert_eq!(element.scope_label(), "universal");
    }

    #[test]
    fn lifts_integration_key_from_embedded_object() {
        let element = Element::from_value(json!({
            "key": "sync-contacts",
            "integration": {"id": "int-9", "key": "salesforce"},
            "integrationId": "int-9"
        }))
        .unwrap();

        assert_eq!(element.integration_key.as_deref(), Some("salesforce"));
        assert!(!element.payload.contains_key("integration"));
        assert!(!element.payload.contains_key("integrationId"));
    }

    #[test]
    fn detects_parent_reference() {
        let element = Element::from_value(json!({
            "key": "sync-contacts",
            "integrationKey": "salesforce",
            "universalFlowId": "flow-7"
        }))
        .unwrap();

        let parent = element.parent.as_ref().unwrap();
        assert_eq!(parent.attribute, "universalFlowId");
        assert_eq!(parent.parent_id, "flow-7");
        // The marker attribute itself stays in the payload.
        assert!(element.payload.contains_key("universalFlowId"));
    }

    #[test]
    fn detects_parent_id_attribute() {
        let element = Element::from_value(json!({
            "key": "enrich",
            "integrationKey": "hubspot",
            "parentId": "tpl-3"
        }))
        .unwrap();

        assert_eq!(element.parent.as_ref().unwrap().attribute, "parentId");
    }

    #[test]
    fn customized_accepts_both_wire_spellings() {
        let a = Element::from_value(json!({
            "key": "a", "integrationKey": "x", "customized": true
        }))
        .unwrap();
        let b = Element::from_value(json!({
            "key": "b", "integrationKey": "x", "isCustomized": true
        }))
        .unwrap();
        let universal = Element::from_value(json!({"key": "c", "customized": true})).unwrap();

        assert!(a.is_customized());
        assert!(b.is_customized());
        // A universal template cannot be customized.
        assert!(!universal.is_customized());
    }

    #[test]
    fn rejects_documents_without_key() {
        assert!(matches!(
            Element::from_value(json!({"name": "nameless"})),
            Err(ElementError::MissingKey)
        ));
        assert!(matches!(
            Element::from_value(json!(["not", "an", "object"])),
            Err(ElementError::NotAnObject)
        ));
    }

    #[test]
    fn export_document_honors_strip_invariant() {
        let element = Element::from_value(json!({
            "id": "el-1",
            "key": "contact-mapping",
            "integrationKey": "salesforce",
            "revision": 5,
            "publishedRevision": 4,
            "workspaceId": "ws-1",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-03-01T00:00:00Z",
            "universalFieldMappingId": "fm-1",
            "universalFieldMappingRevision": 9,
            "dataSourceId": "ds-1",
            "fields": {"email": "Email"}
        }))
        .unwrap();

        let doc = element.export_document(ElementType::FieldMapping);
        let doc = doc.as_object().unwrap();

        for field in [
            "id",
            "revision",
            "publishedRevision",
            "workspaceId",
            "createdAt",
            "updatedAt",
            "universalFieldMappingRevision",
            "dataSourceId",
        ] {
            assert!(!doc.contains_key(field), "{field} leaked into the export");
        }
        assert_eq!(doc.get("key"), Some(&json!("contact-mapping")));
        assert_eq!(doc.get("integrationKey"), Some(&json!("salesforce")));
        assert_eq!(doc.get("universalFieldMappingId"), Some(&json!("fm-1")));
    }

    #[test]
    fn wire_round_trip_preserves_identity() {
        let original = Element::from_value(json!({
            "key": "sync-contacts",
            "integrationKey": "salesforce",
            "customized": true,
            "nodes": {"start": {}}
        }))
        .unwrap();

        let round_tripped = Element::from_value(original.to_wire()).unwrap();
        assert_eq!(original, round_tripped);
    }
}
