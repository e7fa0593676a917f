//! Decision-table coverage for the element reconciler.
//!
//! One fixture per table row, asserting the exact write calls issued
//! against the recording platform.

use std::sync::Arc;

use serde_json::json;
use wem_api::PlatformApi;
use wem_element::{Element, ElementType};
use wem_engine::{ElementReconciler, MigrateError, RunReport, WorkspaceInventory};
use wem_test_utils::{derived_flow, element, integration, universal_flow, ApiCall, RecordingPlatform};

/// Run one element through the reconciler, returning the call journal and report.
async fn reconcile(
    platform: Arc<RecordingPlatform>,
    source: Element,
) -> (Vec<ApiCall>, RunReport) {
    let api: Arc<dyn PlatformApi> = platform.clone();
    let inventory = WorkspaceInventory::new(api);
    let report = RunReport::new();

    let reconciler = ElementReconciler::new(platform.as_ref(), &inventory, &report);
    reconciler
        .sync_batch(ElementType::Flow, &[source])
        .await
        .unwrap();

    (writes(platform.calls()), report)
}

/// Strip read-only calls from the journal; the interesting part is what got written.
fn writes(calls: Vec<ApiCall>) -> Vec<ApiCall> {
    calls
        .into_iter()
        .filter(|call| {
            !matches!(
                call,
                ApiCall::FindAll { .. } | ApiCall::ListIntegrations | ApiCall::ListConnectors
            )
        })
        .collect()
}

fn platform_with_salesforce() -> Arc<RecordingPlatform> {
    let platform = Arc::new(RecordingPlatform::new());
    platform.seed_integration(integration("int-1", "salesforce", "conn-1", Some("1.0.0")));
    platform
}

#[tokio::test]
async fn matched_without_parent_updates_in_place() {
    let platform = platform_with_salesforce();
    platform.seed_element(
        ElementType::Flow,
        json!({"id": "dst-1", "key": "sync-contacts", "nodes": {}}),
    );

    let (calls, _) = reconcile(platform, element(universal_flow("sync-contacts"))).await;

    assert_eq!(
        calls,
        vec![ApiCall::Update {
            element_type: ElementType::Flow,
            id: "dst-1".into()
        }]
    );
}

#[tokio::test]
async fn matched_customized_derived_updates_in_place() {
    let platform = platform_with_salesforce();
    platform.seed_element(
        ElementType::Flow,
        json!({
            "id": "dst-2",
            "key": "sync-contacts",
            "integrationId": "int-1",
            "universalFlowId": "tpl-sync-contacts"
        }),
    );

    let (calls, _) = reconcile(
        platform,
        element(derived_flow("sync-contacts", "salesforce", true)),
    )
    .await;

    assert_eq!(
        calls,
        vec![ApiCall::Update {
            element_type: ElementType::Flow,
            id: "dst-2".into()
        }]
    );
}

#[tokio::test]
async fn matched_uncustomized_derived_resets_to_parent() {
    let platform = platform_with_salesforce();
    platform.seed_element(
        ElementType::Flow,
        json!({
            "id": "dst-3",
            "key": "sync-contacts",
            "integrationId": "int-1",
            "universalFlowId": "tpl-sync-contacts"
        }),
    );

    let (calls, _) = reconcile(
        platform,
        element(derived_flow("sync-contacts", "salesforce", false)),
    )
    .await;

    assert_eq!(
        calls,
        vec![ApiCall::Reset {
            element_type: ElementType::Flow,
            id: "dst-3".into()
        }]
    );
}

#[tokio::test]
async fn unmatched_without_parent_creates_fresh() {
    let platform = platform_with_salesforce();

    let (calls, _) = reconcile(platform.clone(), element(universal_flow("sync-contacts"))).await;

    assert_eq!(
        calls,
        vec![ApiCall::Create {
            element_type: ElementType::Flow,
            key: "sync-contacts".into()
        }]
    );
}

#[tokio::test]
async fn unmatched_bound_element_resolves_integration_id_before_create() {
    let platform = platform_with_salesforce();

    let source = element(json!({
        "key": "enrich",
        "integrationKey": "salesforce",
        "nodes": {}
    }));
    let (calls, _) = reconcile(platform.clone(), source).await;

    assert_eq!(
        calls,
        vec![ApiCall::Create {
            element_type: ElementType::Flow,
            key: "enrich".into()
        }]
    );
    let created = &platform.documents(ElementType::Flow)[0];
    assert_eq!(created["integrationId"], json!("int-1"));
}

#[tokio::test]
async fn unmatched_uncustomized_derived_applies_parent_only() {
    let platform = platform_with_salesforce();

    let (calls, _) = reconcile(
        platform,
        element(derived_flow("sync-contacts", "salesforce", false)),
    )
    .await;

    assert_eq!(
        calls,
        vec![ApiCall::Apply {
            element_type: ElementType::Flow,
            key: "sync-contacts".into(),
            integration_keys: vec!["salesforce".into()]
        }]
    );
}

#[tokio::test]
async fn unmatched_customized_derived_applies_then_updates() {
    let platform = platform_with_salesforce();

    let (calls, _) = reconcile(
        platform,
        element(derived_flow("sync-contacts", "salesforce", true)),
    )
    .await;

    assert_eq!(
        calls,
        vec![
            ApiCall::Apply {
                element_type: ElementType::Flow,
                key: "sync-contacts".into(),
                integration_keys: vec!["salesforce".into()]
            },
            ApiCall::PutByKey {
                element_type: ElementType::Flow,
                key: "sync-contacts".into(),
                integration_key: Some("salesforce".into())
            },
        ]
    );
}

#[tokio::test]
async fn apply_falls_back_through_the_strategy_chain() {
    let platform = platform_with_salesforce();
    platform.fail_apply();

    let (calls, _) = reconcile(
        platform.clone(),
        element(derived_flow("sync-contacts", "salesforce", false)),
    )
    .await;

    assert_eq!(
        calls,
        vec![
            ApiCall::Apply {
                element_type: ElementType::Flow,
                key: "sync-contacts".into(),
                integration_keys: vec!["salesforce".into()]
            },
            ApiCall::PutByKey {
                element_type: ElementType::Flow,
                key: "sync-contacts".into(),
                integration_key: Some("salesforce".into())
            },
        ]
    );
}

#[tokio::test]
async fn apply_chain_ends_with_plain_create() {
    let platform = platform_with_salesforce();
    platform.fail_apply();
    platform.fail_put_by_key();

    let source = element(derived_flow("sync-contacts", "salesforce", false));
    let api: Arc<dyn PlatformApi> = platform.clone();
    let inventory = WorkspaceInventory::new(api);
    let report = RunReport::new();
    let reconciler = ElementReconciler::new(platform.as_ref(), &inventory, &report);
    reconciler
        .sync_batch(ElementType::Flow, &[source])
        .await
        .unwrap();

    let calls = writes(platform.calls());
    assert_eq!(calls.len(), 3);
    assert!(matches!(
        calls[2],
        ApiCall::Create { element_type: ElementType::Flow, ref key } if key == "sync-contacts"
    ));
    // The plain create resolved the integration binding locally.
    let created = &platform.documents(ElementType::Flow)[0];
    assert_eq!(created["integrationId"], json!("int-1"));
}

#[tokio::test]
async fn reset_failure_propagates() {
    let platform = platform_with_salesforce();
    platform.fail_reset();
    platform.seed_element(
        ElementType::Flow,
        json!({
            "id": "dst-9",
            "key": "sync-contacts",
            "integrationId": "int-1",
            "universalFlowId": "tpl-sync-contacts"
        }),
    );

    let api: Arc<dyn PlatformApi> = platform.clone();
    let inventory = WorkspaceInventory::new(api);
    let report = RunReport::new();
    let reconciler = ElementReconciler::new(platform.as_ref(), &inventory, &report);

    let result = reconciler
        .sync_batch(
            ElementType::Flow,
            &[element(derived_flow("sync-contacts", "salesforce", false))],
        )
        .await;

    assert!(matches!(result, Err(MigrateError::Api(_))));
}

#[tokio::test]
async fn duplicate_destination_identity_is_fatal() {
    let platform = platform_with_salesforce();
    platform.seed_element(
        ElementType::Flow,
        json!({"id": "dst-1", "key": "sync-contacts"}),
    );
    platform.seed_element(
        ElementType::Flow,
        json!({"id": "dst-2", "key": "sync-contacts"}),
    );

    let api: Arc<dyn PlatformApi> = platform.clone();
    let inventory = WorkspaceInventory::new(api);
    let report = RunReport::new();
    let reconciler = ElementReconciler::new(platform.as_ref(), &inventory, &report);

    let result = reconciler
        .sync_batch(ElementType::Flow, &[element(universal_flow("sync-contacts"))])
        .await;

    assert!(matches!(
        result,
        Err(MigrateError::DuplicateKey { key, .. }) if key == "sync-contacts"
    ));
}

#[tokio::test]
async fn non_exportable_types_are_skipped() {
    let platform = platform_with_salesforce();

    let api: Arc<dyn PlatformApi> = platform.clone();
    let inventory = WorkspaceInventory::new(api);
    let report = RunReport::new();
    let reconciler = ElementReconciler::new(platform.as_ref(), &inventory, &report);

    reconciler
        .sync_batch(
            ElementType::Integration,
            &[element(json!({"key": "salesforce"}))],
        )
        .await
        .unwrap();

    assert!(platform.calls().is_empty());
}
