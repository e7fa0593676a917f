//! Element reconciliation
//!
//! Brings one destination element type into alignment with the source
//! snapshot. The per-element decision is a pure function of three facts —
//! matched in the destination, carries a parent reference, flagged
//! customized — so the whole table is testable without a network.
//!
//! Elements of one type are dispatched concurrently; the batch is awaited
//! to completion before the caller moves to the next one, and the first
//! failure drops the remaining in-flight futures.

use futures::future::try_join_all;
use serde_json::Value;
use wem_api::PlatformApi;
use wem_element::{Element, ElementType};

use crate::error::MigrateError;
use crate::inventory::WorkspaceInventory;
use crate::report::{RunReport, SyncAction};
use crate::strategy;

/// Decision-table outcome for one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Full payload replace of the matched destination element
    UpdateInPlace,
    /// Discard destination drift, reverting the derived instance to its parent
    ResetToParent,
    /// Plain create (integration key resolved to a destination id first)
    CreateFresh,
    /// Instantiate the universal parent onto the target integration
    ApplyParent,
    /// Instantiate the parent, then immediately update with the customized payload
    ApplyParentThenCustomize,
}

/// The decision table.
///
/// | matched | parent | customized | action |
/// |---------|--------|------------|--------|
/// | yes     | no     | —          | update in place |
/// | yes     | yes    | yes        | update in place |
/// | yes     | yes    | no         | reset to parent |
/// | no      | no     | —          | create fresh |
/// | no      | yes    | no         | apply parent |
/// | no      | yes    | yes        | apply parent, then customize |
#[inline]
#[must_use]
pub fn decide(matched: bool, has_parent: bool, customized: bool) -> ReconcileAction {
    match (matched, has_parent, customized) {
        (true, false, _) => ReconcileAction::UpdateInPlace,
        (true, true, true) => ReconcileAction::UpdateInPlace,
        (true, true, false) => ReconcileAction::ResetToParent,
        (false, false, _) => ReconcileAction::CreateFresh,
        (false, true, false) => ReconcileAction::ApplyParent,
        (false, true, true) => ReconcileAction::ApplyParentThenCustomize,
    }
}

/// Reconciles element batches against the destination inventory.
pub struct ElementReconciler<'a> {
    api: &'a dyn PlatformApi,
    inventory: &'a WorkspaceInventory,
    report: &'a RunReport,
}

impl<'a> ElementReconciler<'a> {
    /// Create a reconciler over one destination
    #[inline]
    #[must_use]
    pub fn new(
        api: &'a dyn PlatformApi,
        inventory: &'a WorkspaceInventory,
        report: &'a RunReport,
    ) -> Self {
        Self {
            api,
            inventory,
            report,
        }
    }

    /// Reconcile every element of one type concurrently.
    pub async fn sync_batch(
        &self,
        element_type: ElementType,
        elements: &[Element],
    ) -> Result<(), MigrateError> {
        if !element_type.exportable() {
            tracing::debug!(%element_type, "type not handled by the element reconciler, skipped");
            return Ok(());
        }

        try_join_all(
            elements
                .iter()
                .map(|element| self.sync_element(element_type, element)),
        )
        .await?;
        Ok(())
    }

    async fn sync_element(
        &self,
        element_type: ElementType,
        element: &Element,
    ) -> Result<(), MigrateError> {
        let mut element = element.clone();
        // A source-side data source id points at the wrong workspace; drop
        // it on every path, not just export.
        if element_type == ElementType::FieldMapping {
            element.payload.remove("dataSourceId");
        }

        let matched = self.inventory.match_element(element_type, &element).await?;
        let action = decide(matched.is_some(), element.has_parent(), element.is_customized());

        match action {
            ReconcileAction::UpdateInPlace => self.update_in_place(element_type, &element, matched).await,
            ReconcileAction::ResetToParent => self.reset_to_parent(element_type, &element, matched).await,
            ReconcileAction::CreateFresh => self.create_fresh(element_type, &element).await,
            ReconcileAction::ApplyParent => {
                self.apply_parent(element_type, &element, false).await
            }
            ReconcileAction::ApplyParentThenCustomize => {
                self.apply_parent(element_type, &element, true).await
            }
        }
    }

    async fn update_in_place(
        &self,
        element_type: ElementType,
        element: &Element,
        matched: Option<Element>,
    ) -> Result<(), MigrateError> {
        let Some(id) = matched.as_ref().and_then(|m| m.id.clone()) else {
            return self.skip_corrupted(element_type, element);
        };

        self.api
            .update(element_type, &id, &element.to_wire())
            .await?;
        self.report.record(SyncAction::Updated);
        tracing::info!(
            scope = element.scope_label(),
            %element_type,
            key = %element.key,
            "updated"
        );
        Ok(())
    }

    async fn reset_to_parent(
        &self,
        element_type: ElementType,
        element: &Element,
        matched: Option<Element>,
    ) -> Result<(), MigrateError> {
        let Some(destination) = matched else {
            return self.skip_corrupted(element_type, element);
        };
        let Some(id) = destination.id.clone() else {
            return self.skip_corrupted(element_type, element);
        };

        if let Err(err) = self.api.reset(element_type, &id).await {
            tracing::error!(
                destination = ?destination,
                source = ?element,
                "reset failed"
            );
            return Err(err.into());
        }
        self.report.record(SyncAction::Reset);
        tracing::info!(
            scope = element.scope_label(),
            %element_type,
            key = %element.key,
            "customization reset"
        );
        Ok(())
    }

    async fn create_fresh(
        &self,
        element_type: ElementType,
        element: &Element,
    ) -> Result<(), MigrateError> {
        let mut document = element.to_wire();
        if let Some(integration_key) = element.integration_key.as_deref() {
            let integration_id = self.inventory.resolve_integration_id(integration_key).await?;
            if let Some(object) = document.as_object_mut() {
                object.insert("integrationId".into(), Value::String(integration_id));
            }
        }

        let created = self.api.create(element_type, &document).await?;

        // Write through so siblings in this phase can match it.
        let mut recorded = element.clone();
        recorded.id = created
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_owned);
        self.inventory.record_created(element_type, recorded).await;

        self.report.record(SyncAction::Created);
        tracing::info!(
            scope = element.scope_label(),
            %element_type,
            key = %element.key,
            "created"
        );
        Ok(())
    }

    async fn apply_parent(
        &self,
        element_type: ElementType,
        element: &Element,
        customize: bool,
    ) -> Result<(), MigrateError> {
        strategy::apply_parent(self.api, self.inventory, element_type, element).await?;
        self.inventory
            .record_created(element_type, element.clone())
            .await;

        if customize {
            // The derived instance exists now; land the diverged payload.
            if let Err(err) = self
                .api
                .put_by_key(
                    element_type,
                    &element.key,
                    element.integration_key.as_deref(),
                    &element.to_wire(),
                )
                .await
            {
                tracing::error!(source = ?element, "customization update failed after apply");
                return Err(err.into());
            }
            self.report.record(SyncAction::AppliedCustomized);
            tracing::info!(
                scope = element.scope_label(),
                %element_type,
                key = %element.key,
                "applied and customized"
            );
        } else {
            self.report.record(SyncAction::Applied);
            tracing::info!(
                scope = element.scope_label(),
                %element_type,
                key = %element.key,
                "applied universal parent"
            );
        }
        Ok(())
    }

    fn skip_corrupted(
        &self,
        element_type: ElementType,
        element: &Element,
    ) -> Result<(), MigrateError> {
        self.report.record(SyncAction::SkippedCorrupted);
        self.report.warn(
            format!("{} {}", element.scope_label(), element.key),
            format!("corrupted {element_type}; migrate manually"),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_table_is_exhaustive() {
        assert_eq!(decide(true, false, false), ReconcileAction::UpdateInPlace);
        assert_eq!(decide(true, false, true), ReconcileAction::UpdateInPlace);
        assert_eq!(decide(true, true, true), ReconcileAction::UpdateInPlace);
        assert_eq!(decide(true, true, false), ReconcileAction::ResetToParent);
        assert_eq!(decide(false, false, false), ReconcileAction::CreateFresh);
        assert_eq!(decide(false, false, true), ReconcileAction::CreateFresh);
        assert_eq!(decide(false, true, false), ReconcileAction::ApplyParent);
        assert_eq!(
            decide(false, true, true),
            ReconcileAction::ApplyParentThenCustomize
        );
    }
}
