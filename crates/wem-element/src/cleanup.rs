//! Export cleanup transforms
//!
//! Destination-assigned fields must never travel between workspaces: the
//! destination mints its own ids and revisions, and stale values confuse the
//! platform's conflict detection. The base strip removes them from every
//! element before persistence; type-specific transforms run afterwards.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Fields assigned by the platform on write, removed from every exported
/// element.
pub const STRIPPED_FIELDS: [&str; 6] = [
    "id",
    "revision",
    "publishedRevision",
    "workspaceId",
    "createdAt",
    "updatedAt",
];

/// Revision bookkeeping for derived instances (`universalFlowRevision`,
/// `parentRevision`, ...). Parent *id* markers are deliberately kept: they
/// are identity, not state.
static REVISION_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(universal\w*|parent)Revision$").unwrap());

/// Connector fields safe to publish outside the owning workspace.
const CONNECTOR_PUBLIC_FIELDS: [&str; 5] = ["id", "name", "version", "appUuid", "baseUri"];

/// Strip destination-assigned fields from an element payload in place.
pub fn base_export_cleanup(payload: &mut Map<String, Value>) {
    for field in STRIPPED_FIELDS {
        payload.remove(field);
    }
    payload.retain(|key, _| !REVISION_ATTR.is_match(key));
}

/// Reduce a connector document to its public-safe subset.
pub(crate) fn retain_connector_public_fields(payload: &mut Map<String, Value>) {
    payload.retain(|key, _| CONNECTOR_PUBLIC_FIELDS.contains(&key.as_str()));
}
