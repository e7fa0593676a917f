//! Dependency ordering
//!
//! Fixed phase order, each phase completing before the next starts:
//!
//! 1. Connectors + integrations (the matcher, outside this module)
//! 2. Universal elements — no ordering constraints among them
//! 3. Integration-specific data sources
//! 4. Remaining integration-specific elements, in catalog order
//!
//! Field mappings reference data sources by id; flows and actions may
//! reference either transitively through platform-side validation, so they
//! are conservatively ordered last. The universal/bound split is
//! per-element, not per-type: an integration-specific type can still carry
//! universal template instances.

use wem_element::{Element, ElementSet, ElementType};

/// All elements of one type belonging to one phase.
#[derive(Debug, Clone)]
pub struct Batch {
    pub element_type: ElementType,
    pub elements: Vec<Element>,
}

/// One sequential step of the reconciliation plan.
#[derive(Debug, Clone)]
pub struct Phase {
    pub name: &'static str,
    pub batches: Vec<Batch>,
}

/// Plan the element phases for one snapshot.
#[must_use]
pub fn plan(elements: &ElementSet) -> Vec<Phase> {
    let mut universal = Vec::new();
    let mut data_sources = Vec::new();
    let mut bound = Vec::new();

    for element_type in ElementType::reconcilable() {
        let Some(list) = elements.get(&element_type) else {
            continue;
        };

        let (with_integration, without): (Vec<Element>, Vec<Element>) = list
            .iter()
            .cloned()
            .partition(|element| element.integration_key.is_some());

        if !without.is_empty() {
            universal.push(Batch {
                element_type,
                elements: without,
            });
        }
        if !with_integration.is_empty() {
            let target = if element_type == ElementType::DataSource {
                &mut data_sources
            } else {
                &mut bound
            };
            target.push(Batch {
                element_type,
                elements: with_integration,
            });
        }
    }

    vec![
        Phase {
            name: "universal elements",
            batches: universal,
        },
        Phase {
            name: "data sources",
            batches: data_sources,
        },
        Phase {
            name: "integration-specific elements",
            batches: bound,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn element(value: serde_json::Value) -> Element {
        Element::from_value(value).unwrap()
    }

    #[test]
    fn data_sources_precede_field_mappings() {
        let mut elements = ElementSet::default();
        // Deliberately inserted in the "wrong" order.
        elements.insert(
            ElementType::FieldMapping,
            vec![element(json!({"key": "m", "integrationKey": "sf"}))],
        );
        elements.insert(
            ElementType::DataSource,
            vec![element(json!({"key": "contacts", "integrationKey": "sf"}))],
        );

        let phases = plan(&elements);
        assert_eq!(phases[1].name, "data sources");
        assert_eq!(phases[1].batches[0].element_type, ElementType::DataSource);
        assert_eq!(phases[2].batches[0].element_type, ElementType::FieldMapping);
    }

    #[test]
    fn split_is_per_element_not_per_type() {
        let mut elements = ElementSet::default();
        elements.insert(
            ElementType::Flow,
            vec![
                element(json!({"key": "tpl"})),
                element(json!({"key": "tpl", "integrationKey": "sf", "universalFlowId": "f1"})),
            ],
        );

        let phases = plan(&elements);
        let universal: Vec<_> = phases[0]
            .batches
            .iter()
            .flat_map(|b| &b.elements)
            .collect();
        let bound: Vec<_> = phases[2]
            .batches
            .iter()
            .flat_map(|b| &b.elements)
            .collect();

        assert_eq!(universal.len(), 1);
        assert!(universal[0].integration_key.is_none());
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].integration_key.as_deref(), Some("sf"));
    }

    #[test]
    fn remaining_types_follow_catalog_order() {
        let mut elements = ElementSet::default();
        for (element_type, key) in [
            (ElementType::Action, "a"),
            (ElementType::Flow, "f"),
            (ElementType::FieldMapping, "m"),
        ] {
            elements.insert(
                element_type,
                vec![element(json!({"key": key, "integrationKey": "sf"}))],
            );
        }

        let phases = plan(&elements);
        let order: Vec<_> = phases[2].batches.iter().map(|b| b.element_type).collect();
        assert_eq!(
            order,
            vec![
                ElementType::FieldMapping,
                ElementType::Flow,
                ElementType::Action
            ]
        );
    }

    #[test]
    fn empty_snapshot_produces_empty_phases() {
        let phases = plan(&ElementSet::default());
        assert_eq!(phases.len(), 3);
        assert!(phases.iter().all(|p| p.batches.is_empty()));
    }
}
