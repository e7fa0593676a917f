//! Apply-parent strategy chain
//!
//! Creating a derived instance in the destination can succeed through
//! increasingly explicit paths. Instead of discovering the working path via
//! thrown errors, the chain is an explicit ordered list: each strategy is
//! tried in sequence and the first success short-circuits. Only exhaustion
//! of the whole chain is a failure.

use serde_json::Value;
use wem_api::PlatformApi;
use wem_element::{Element, ElementType};

use crate::error::MigrateError;
use crate::inventory::WorkspaceInventory;

/// One way to materialize a derived instance in the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStrategy {
    /// Instantiate from the universal parent via the apply endpoint
    ApplyAsDerived,
    /// Upsert through the by-key accessor
    PutWithExplicitKey,
    /// Plain create with the integration id resolved locally
    CreateWithResolvedIntegration,
}

/// Strategies in preference order.
pub const APPLY_CHAIN: [ApplyStrategy; 3] = [
    ApplyStrategy::ApplyAsDerived,
    ApplyStrategy::PutWithExplicitKey,
    ApplyStrategy::CreateWithResolvedIntegration,
];

impl ApplyStrategy {
    async fn attempt(
        self,
        api: &dyn PlatformApi,
        inventory: &WorkspaceInventory,
        element_type: ElementType,
        element: &Element,
    ) -> Result<(), MigrateError> {
        match self {
            Self::ApplyAsDerived => {
                let integration_keys: Vec<String> =
                    element.integration_key.iter().cloned().collect();
                api.apply_to_integrations(element_type, &element.key, &integration_keys)
                    .await?;
            }
            Self::PutWithExplicitKey => {
                api.put_by_key(
                    element_type,
                    &element.key,
                    element.integration_key.as_deref(),
                    &element.to_wire(),
                )
                .await?;
            }
            Self::CreateWithResolvedIntegration => {
                let mut document = element.to_wire();
                if let Some(integration_key) = element.integration_key.as_deref() {
                    let integration_id =
                        inventory.resolve_integration_id(integration_key).await?;
                    if let Some(object) = document.as_object_mut() {
                        object.insert("integrationId".into(), Value::String(integration_id));
                    }
                }
                api.create(element_type, &document).await?;
            }
        }
        Ok(())
    }
}

/// Run the chain until one strategy lands the derived instance.
///
/// Returns the strategy that succeeded.
///
/// # Errors
/// [`MigrateError::ApplyExhausted`] carrying the final strategy's error once
/// every strategy has failed.
pub async fn apply_parent(
    api: &dyn PlatformApi,
    inventory: &WorkspaceInventory,
    element_type: ElementType,
    element: &Element,
) -> Result<ApplyStrategy, MigrateError> {
    let (last, preferred) = APPLY_CHAIN.split_last().unwrap_or((&APPLY_CHAIN[0], &[]));

    for strategy in preferred {
        match strategy.attempt(api, inventory, element_type, element).await {
            Ok(()) => {
                tracing::debug!(?strategy, key = %element.key, "derived instance applied");
                return Ok(*strategy);
            }
            Err(err) => {
                tracing::debug!(?strategy, key = %element.key, %err, "apply strategy failed, trying next");
            }
        }
    }

    last.attempt(api, inventory, element_type, element)
        .await
        .map_err(|source| MigrateError::ApplyExhausted {
            element_type,
            key: element.key.clone(),
            source: Box::new(source),
        })?;
    tracing::debug!(strategy = ?last, key = %element.key, "derived instance applied");
    Ok(*last)
}
