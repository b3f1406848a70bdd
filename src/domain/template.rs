//! Requisition templates.
//!
//! A [`Template`] owns the decorated columns of one requisition and answers
//! which of them are shown for a given supply type.

use std::collections::BTreeMap;

use petgraph::{
    algo::{is_cyclic_directed, tarjan_scc},
    graphmap::DiGraphMap,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    Column, ColumnDefinition, ColumnKind, ColumnName, ColumnSource, OptionName, RequisitionStatus,
};

/// A facility type the template is assigned to.
///
/// Only used when configuring templates; the engine carries it through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityType {
    /// Stable identifier.
    pub id: Uuid,
    /// Short code.
    #[serde(default)]
    pub code: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Errors that can occur when building a template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// Two column definitions share a name.
    #[error("duplicate column '{0}'")]
    DuplicateColumn(ColumnName),
    /// Calculated columns depend on each other in a loop.
    #[error("calculated columns form a dependency cycle: {}", .0.join(" → "))]
    CyclicDependency(Vec<String>),
}

/// The column layout of a requisition.
///
/// Built once per requisition from the configured column definitions and the
/// requisition's status and emergency flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    id: Option<Uuid>,
    columns: BTreeMap<ColumnName, Column>,
    emergency: bool,
    populate_stock_on_hand_from_stock_cards: bool,
    facility_types: Vec<FacilityType>,
}

impl Template {
    /// Builds a template for a requisition in the given status.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::DuplicateColumn`] if two definitions share a
    /// name, or [`TemplateError::CyclicDependency`] if the calculated columns
    /// depend on each other in a loop.
    pub fn new(
        definitions: impl IntoIterator<Item = ColumnDefinition>,
        status: RequisitionStatus,
        emergency: bool,
    ) -> Result<Self, TemplateError> {
        let mut columns = BTreeMap::new();

        for definition in definitions {
            let name = definition.name.clone();
            if columns.contains_key(&name) {
                return Err(TemplateError::DuplicateColumn(name));
            }
            columns.insert(name, Column::new(definition, status));
        }

        let template = Self {
            id: None,
            columns,
            emergency,
            populate_stock_on_hand_from_stock_cards: false,
            facility_types: Vec::new(),
        };

        if let Some(cycle) = template.dependency_cycles().into_iter().next() {
            return Err(TemplateError::CyclicDependency(cycle));
        }

        debug!(columns = template.columns.len(), emergency, "built template");

        Ok(template)
    }

    /// Sets the template identifier.
    #[must_use]
    pub const fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets whether stock columns are populated from the stock ledger.
    #[must_use]
    pub const fn with_stock_cards(mut self, enabled: bool) -> Self {
        self.populate_stock_on_hand_from_stock_cards = enabled;
        self
    }

    /// Sets the facility types the template is assigned to.
    #[must_use]
    pub fn with_facility_types(mut self, facility_types: Vec<FacilityType>) -> Self {
        self.facility_types = facility_types;
        self
    }

    /// The template identifier, if known.
    #[must_use]
    pub const fn id(&self) -> Option<Uuid> {
        self.id
    }

    /// Whether the owning requisition is an emergency requisition.
    #[must_use]
    pub const fn is_emergency(&self) -> bool {
        self.emergency
    }

    /// Whether stock columns come from the stock ledger instead of user
    /// input.
    #[must_use]
    pub const fn populates_stock_on_hand_from_stock_cards(&self) -> bool {
        self.populate_stock_on_hand_from_stock_cards
    }

    /// Facility types the template is assigned to.
    #[must_use]
    pub fn facility_types(&self) -> &[FacilityType] {
        &self.facility_types
    }

    /// The visible columns, in display order.
    ///
    /// Non-full supply products and emergency requisitions only show the
    /// reduced column set.
    #[must_use]
    pub fn columns(&self, non_full_supply: bool) -> Vec<&Column> {
        let reduced = non_full_supply || self.emergency;

        let mut columns: Vec<_> = self
            .columns
            .values()
            .filter(|column| column.is_displayed())
            .filter(|column| !reduced || !column.is_full_supply_only())
            .collect();

        columns.sort_by(|a, b| {
            a.display_order()
                .cmp(&b.display_order())
                .then_with(|| a.name().cmp(b.name()))
        });

        columns
    }

    /// Every column in the template, visible or not, keyed by name.
    pub fn all_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Whether the template has a column for marking line items as skipped.
    #[must_use]
    pub fn has_skip_column(&self) -> bool {
        self.skip_column().is_some()
    }

    /// Whether skipped line items are hidden rather than disabled.
    #[must_use]
    pub fn hide_skipped_line_items(&self) -> bool {
        self.skip_column().is_some_and(|column| {
            column.definition().option_name() == Some(OptionName::HideSkippedLineItems)
        })
    }

    /// Whether the named column is present and derived rather than entered.
    #[must_use]
    pub fn is_calculated(&self, name: &str) -> bool {
        self.column(name)
            .is_some_and(|column| column.source() == ColumnSource::Calculated)
    }

    /// Whether the named column is present and shown.
    #[must_use]
    pub fn is_displayed(&self, name: &str) -> bool {
        self.column(name).is_some_and(Column::is_displayed)
    }

    /// Returns every loop among calculated columns, as sorted lists of column
    /// names.
    ///
    /// An edge runs from a column to each calculated column that depends on
    /// it. Dependencies on columns the template does not contain are ignored.
    #[must_use]
    pub fn dependency_cycles(&self) -> Vec<Vec<String>> {
        let graph = self.dependency_graph();

        if !is_cyclic_directed(&graph) {
            return Vec::new();
        }

        let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&node| graph.contains_edge(node, node))
            })
            .map(|component| {
                let mut names: Vec<String> =
                    component.into_iter().map(ToString::to_string).collect();
                names.sort();
                names
            })
            .collect();

        cycles.sort();
        cycles
    }

    fn dependency_graph(&self) -> DiGraphMap<&str, ()> {
        let mut graph = DiGraphMap::with_capacity(self.columns.len(), self.columns.len() * 2);

        for column in self.columns.values() {
            graph.add_node(column.name());

            if column.source() != ColumnSource::Calculated {
                continue;
            }

            for dependency in column.dependencies() {
                if self.columns.contains_key(dependency) {
                    graph.add_edge(dependency, column.name(), ());
                }
            }
        }

        graph
    }

    fn skip_column(&self) -> Option<&Column> {
        self.columns.get(ColumnKind::Skipped.name())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use test_case::test_case;

    use super::*;
    use crate::domain::{ColumnOption, ValueType};

    fn column(kind: ColumnKind, source: ColumnSource, order: i32) -> ColumnDefinition {
        let mut definition = ColumnDefinition::new(kind.into(), source, ValueType::Numeric);
        definition.display_order = order;
        definition
    }

    fn standard_columns() -> Vec<ColumnDefinition> {
        vec![
            column(ColumnKind::ProductCode, ColumnSource::ReferenceData, 0),
            column(ColumnKind::BeginningBalance, ColumnSource::UserInput, 1),
            column(ColumnKind::TotalReceivedQuantity, ColumnSource::UserInput, 2),
            column(ColumnKind::TotalConsumedQuantity, ColumnSource::UserInput, 3),
            column(ColumnKind::StockOnHand, ColumnSource::Calculated, 4),
            column(ColumnKind::RequestedQuantity, ColumnSource::UserInput, 5),
            column(ColumnKind::RequestedQuantityExplanation, ColumnSource::UserInput, 6),
            column(ColumnKind::ApprovedQuantity, ColumnSource::UserInput, 7),
        ]
    }

    fn names(columns: &[&Column]) -> Vec<String> {
        columns.iter().map(|column| column.name().to_string()).collect()
    }

    #[test]
    fn full_supply_columns_in_display_order() {
        let template =
            Template::new(standard_columns(), RequisitionStatus::Initiated, false).unwrap();

        assert_eq!(
            names(&template.columns(false)),
            [
                "orderable.productCode",
                "beginningBalance",
                "totalReceivedQuantity",
                "totalConsumedQuantity",
                "stockOnHand",
                "requestedQuantity",
                "requestedQuantityExplanation",
            ]
        );
    }

    #[test]
    fn non_full_supply_columns_are_reduced() {
        let template =
            Template::new(standard_columns(), RequisitionStatus::Authorized, false).unwrap();

        assert_eq!(
            names(&template.columns(true)),
            [
                "orderable.productCode",
                "requestedQuantity",
                "requestedQuantityExplanation",
                "approvedQuantity",
            ]
        );
    }

    #[test_case(RequisitionStatus::Initiated)]
    #[test_case(RequisitionStatus::Submitted)]
    #[test_case(RequisitionStatus::InApproval)]
    #[test_case(RequisitionStatus::Approved)]
    fn emergency_flattens_supply_types(status: RequisitionStatus) {
        let template = Template::new(standard_columns(), status, true).unwrap();

        let full: BTreeSet<_> = names(&template.columns(false)).into_iter().collect();
        let non_full: BTreeSet<_> = names(&template.columns(true)).into_iter().collect();

        assert_eq!(full, non_full);
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let mut definitions = standard_columns();
        definitions.push(column(ColumnKind::StockOnHand, ColumnSource::UserInput, 9));

        let error = Template::new(definitions, RequisitionStatus::Initiated, false).unwrap_err();
        assert_eq!(
            error,
            TemplateError::DuplicateColumn(ColumnKind::StockOnHand.into())
        );
    }

    #[test]
    fn calculated_loop_is_rejected() {
        let definitions = vec![
            column(ColumnKind::BeginningBalance, ColumnSource::UserInput, 0),
            column(ColumnKind::TotalConsumedQuantity, ColumnSource::Calculated, 1),
            column(ColumnKind::StockOnHand, ColumnSource::Calculated, 2),
        ];

        let error = Template::new(definitions, RequisitionStatus::Initiated, false).unwrap_err();
        assert_eq!(
            error,
            TemplateError::CyclicDependency(vec![
                "stockOnHand".to_string(),
                "totalConsumedQuantity".to_string()
            ])
        );
    }

    #[test]
    fn one_calculated_side_of_a_pair_is_acyclic() {
        let template =
            Template::new(standard_columns(), RequisitionStatus::Initiated, false).unwrap();
        assert!(template.dependency_cycles().is_empty());
    }

    fn with_skip_column(option: Option<OptionName>) -> Template {
        let mut definitions = standard_columns();
        let mut skip =
            ColumnDefinition::new(ColumnKind::Skipped.into(), ColumnSource::UserInput, ValueType::Boolean);
        skip.option = option.map(|option_name| ColumnOption { option_name });
        definitions.push(skip);
        Template::new(definitions, RequisitionStatus::Initiated, false).unwrap()
    }

    #[test]
    fn hide_skipped_option() {
        let template = with_skip_column(Some(OptionName::HideSkippedLineItems));
        assert!(template.has_skip_column());
        assert!(template.hide_skipped_line_items());
    }

    #[test]
    fn disable_skipped_option() {
        let template = with_skip_column(Some(OptionName::DisableSkippedLineItems));
        assert!(template.has_skip_column());
        assert!(!template.hide_skipped_line_items());
    }

    #[test]
    fn no_skip_column() {
        let template =
            Template::new(standard_columns(), RequisitionStatus::Initiated, false).unwrap();
        assert!(!template.has_skip_column());
        assert!(!template.hide_skipped_line_items());
    }
}
