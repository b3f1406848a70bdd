//! Requisitions and the gated mutation of their line items.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::domain::{
    ColumnKind, LineItem, LineItemData, LineItemError, Orderable, RequisitionStatus, StockAdjustmentReason,
    Template, Value, can_add_line_item, can_delete_line_item,
    validation::{self, validate_line_item_field},
};

/// The program a requisition belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    /// Stable identifier.
    pub id: Uuid,
    /// Short code, used when checking rights.
    pub code: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// The reporting period a requisition covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingPeriod {
    /// Stable identifier.
    pub id: Uuid,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Length of the period.
    pub duration_in_months: u32,
}

/// Requisition-level data the engine reads while computing line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Stable identifier.
    pub id: Uuid,
    /// Lifecycle state.
    pub status: RequisitionStatus,
    /// Whether this is an emergency requisition.
    #[serde(default)]
    pub emergency: bool,
    /// The owning program.
    pub program: Program,
    /// The period being reported on.
    pub processing_period: ProcessingPeriod,
    /// Reasons that stock adjustments may refer to.
    #[serde(default)]
    pub stock_adjustment_reasons: Vec<StockAdjustmentReason>,
}

/// Everything a line item needs to know about its requisition.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    /// Requisition-level data.
    pub header: &'a Header,
    /// The column layout.
    pub template: &'a Template,
}

/// A periodic stock replenishment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requisition {
    header: Header,
    template: Template,
    line_items: Vec<LineItem>,
    available_full_supply_products: Vec<Orderable>,
    available_non_full_supply_products: Vec<Orderable>,
}

impl Requisition {
    /// Builds a requisition and computes every line item.
    ///
    /// # Errors
    ///
    /// Returns [`LineItemError::ProgramNotFound`] if a product is not part
    /// of the requisition's program.
    pub fn new(
        header: Header,
        template: Template,
        line_items: impl IntoIterator<Item = LineItemData>,
    ) -> Result<Self, LineItemError> {
        let context = Context {
            header: &header,
            template: &template,
        };

        let line_items = line_items
            .into_iter()
            .map(|data| LineItem::new(data, &context))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            id = %header.id,
            status = %header.status,
            line_items = line_items.len(),
            "built requisition"
        );

        Ok(Self {
            header,
            template,
            line_items,
            available_full_supply_products: Vec::new(),
            available_non_full_supply_products: Vec::new(),
        })
    }

    /// Sets the products that may be added as line items.
    ///
    /// Products are sorted into full and non-full supply by their settings in
    /// this requisition's program. Products outside the program are ignored.
    #[must_use]
    pub fn with_available_products(mut self, products: impl IntoIterator<Item = Orderable>) -> Self {
        for product in products {
            match product.program(self.header.program.id).map(|p| p.full_supply) {
                Some(true) => self.available_full_supply_products.push(product),
                Some(false) => self.available_non_full_supply_products.push(product),
                None => warn!(
                    product = %product.product_code,
                    program = %self.header.program.code,
                    "ignoring available product outside the program"
                ),
            }
        }
        self
    }

    /// The requisition identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.header.id
    }

    /// Requisition-level data.
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn status(&self) -> RequisitionStatus {
        self.header.status
    }

    /// Whether this is an emergency requisition.
    #[must_use]
    pub const fn is_emergency(&self) -> bool {
        self.header.emergency
    }

    /// The column layout.
    #[must_use]
    pub const fn template(&self) -> &Template {
        &self.template
    }

    /// The context line items are computed in.
    #[must_use]
    pub const fn context(&self) -> Context<'_> {
        Context {
            header: &self.header,
            template: &self.template,
        }
    }

    pub(crate) fn split_mut(&mut self) -> (Context<'_>, &mut [LineItem]) {
        (
            Context {
                header: &self.header,
                template: &self.template,
            },
            &mut self.line_items,
        )
    }

    /// Every line item, in insertion order.
    #[must_use]
    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    /// The line item for a product, if any.
    #[must_use]
    pub fn line_item(&self, orderable_id: Uuid) -> Option<&LineItem> {
        self.line_items
            .iter()
            .find(|line_item| line_item.orderable().id == orderable_id)
    }

    /// Line items for full supply products.
    pub fn full_supply_line_items(&self) -> impl Iterator<Item = &LineItem> {
        self.line_items.iter().filter(|line_item| line_item.is_full_supply())
    }

    /// Line items for non-full supply products.
    pub fn non_full_supply_line_items(&self) -> impl Iterator<Item = &LineItem> {
        self.line_items.iter().filter(|line_item| !line_item.is_full_supply())
    }

    /// Full supply products that may be added.
    #[must_use]
    pub fn available_full_supply_products(&self) -> &[Orderable] {
        &self.available_full_supply_products
    }

    /// Non-full supply products that may be added.
    #[must_use]
    pub fn available_non_full_supply_products(&self) -> &[Orderable] {
        &self.available_non_full_supply_products
    }

    /// Adds a line item for a product.
    ///
    /// # Errors
    ///
    /// Fails if line items cannot be added in the current status, if the
    /// product already has a line item or is not available, or if it is a
    /// full supply product and the requisition is not an emergency.
    #[instrument(skip_all, fields(requisition = %self.header.id, product = %orderable.product_code))]
    pub fn add_line_item(
        &mut self,
        orderable: Orderable,
        requested_quantity: Option<i64>,
        requested_quantity_explanation: Option<String>,
    ) -> Result<&LineItem, LineItemError> {
        self.check_add(&orderable).inspect_err(|error| warn!(%error, "rejected line item"))?;

        let mut data = LineItemData::new(orderable);
        if let Some(quantity) = requested_quantity {
            data = data.with_value(ColumnKind::RequestedQuantity.name(), quantity);
        }
        if let Some(explanation) = requested_quantity_explanation {
            data = data.with_value(
                ColumnKind::RequestedQuantityExplanation.name(),
                explanation,
            );
        }

        let line_item = LineItem::new(data, &self.context())?;
        let index = self.line_items.len();
        self.line_items.push(line_item);
        debug!(line_items = self.line_items.len(), "added line item");

        Ok(&self.line_items[index])
    }

    fn check_add(&self, orderable: &Orderable) -> Result<(), LineItemError> {
        let status = self.header.status;
        if !can_add_line_item(status) {
            return Err(LineItemError::StatusForbidsMutation(status));
        }

        if self.line_item(orderable.id).is_some() {
            return Err(LineItemError::AlreadyExists(orderable.product_code.clone()));
        }

        let program = orderable.program(self.header.program.id).ok_or_else(|| {
            LineItemError::ProgramNotFound {
                product_code: orderable.product_code.clone(),
                program_code: self.header.program.code.clone(),
            }
        })?;

        let available = if program.full_supply {
            &self.available_full_supply_products
        } else {
            &self.available_non_full_supply_products
        };
        if !available.iter().any(|product| product.id == orderable.id) {
            return Err(LineItemError::NotAvailable(orderable.product_code.clone()));
        }

        if program.full_supply && !self.header.emergency {
            return Err(LineItemError::FullSupplyOnRegularRequisition(
                orderable.product_code.clone(),
            ));
        }

        Ok(())
    }

    /// Removes the line item for a product and returns it.
    ///
    /// # Errors
    ///
    /// Fails if line items cannot be removed in the current status, if there
    /// is no line item for the product, or if it is a full supply line item.
    #[instrument(skip(self), fields(requisition = %self.header.id))]
    pub fn delete_line_item(&mut self, orderable_id: Uuid) -> Result<LineItem, LineItemError> {
        self.check_delete(orderable_id)
            .inspect_err(|error| warn!(%error, "rejected line item deletion"))
            .map(|index| self.line_items.remove(index))
    }

    fn check_delete(&self, orderable_id: Uuid) -> Result<usize, LineItemError> {
        let status = self.header.status;
        if !status.is_editable() {
            return Err(LineItemError::StatusForbidsMutation(status));
        }

        let index = self
            .line_items
            .iter()
            .position(|line_item| line_item.orderable().id == orderable_id)
            .ok_or(LineItemError::NotFound(orderable_id))?;

        let line_item = &self.line_items[index];
        if !can_delete_line_item(status, line_item) {
            return Err(LineItemError::FullSupplyNotDeletable(
                line_item.orderable().product_code.clone(),
            ));
        }

        Ok(index)
    }

    /// Sets a field on a line item, recalculates its dependents and
    /// revalidates the affected fields.
    ///
    /// Returns the names of the recalculated columns.
    ///
    /// # Errors
    ///
    /// Fails if the template has no such column or the requisition has no
    /// line item for the product.
    #[instrument(skip(self, value), fields(requisition = %self.header.id))]
    pub fn update_field(
        &mut self,
        orderable_id: Uuid,
        column: &str,
        value: Option<Value>,
    ) -> Result<Vec<String>, LineItemError> {
        let (context, line_items) = self.split_mut();

        let column = context
            .template
            .column(column)
            .ok_or_else(|| LineItemError::ColumnNotFound(column.to_string()))?;
        let line_item = line_items
            .iter_mut()
            .find(|line_item| line_item.orderable().id == orderable_id)
            .ok_or(LineItemError::NotFound(orderable_id))?;

        line_item.set_value(column.name(), value);
        line_item.update_field_value(column, &context);
        let recalculated = line_item.update_dependent_fields(column, &context);

        validate_line_item_field(line_item, column, &context);
        for name in &recalculated {
            if let Some(dependent) = context.template.column(name) {
                validate_line_item_field(line_item, dependent, &context);
            }
        }

        Ok(recalculated)
    }

    /// Validates every line item. Returns `true` if all are valid.
    pub fn validate(&mut self) -> bool {
        validation::validate_requisition(self)
    }

    /// Whether no line item has recorded errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        validation::are_line_items_valid(&self.line_items)
    }

    /// Marks every line item that can be skipped as skipped.
    ///
    /// Does nothing if the template has no skip column. Returns the number of
    /// line items that were skipped.
    pub fn skip_all_line_items(&mut self) -> usize {
        if !self.template.has_skip_column() {
            return 0;
        }

        let (context, line_items) = self.split_mut();
        let mut skipped = 0;

        for line_item in line_items {
            if !line_item.is_skipped() && line_item.can_be_skipped(&context) {
                line_item.set_skipped(true);
                skipped += 1;
            }
        }

        skipped
    }

    /// Clears the skipped flag on every line item.
    pub fn unskip_all_line_items(&mut self) {
        if !self.template.has_skip_column() {
            return;
        }

        for line_item in &mut self.line_items {
            line_item.set_skipped(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::{
        ColumnSource, ValidationError, ValueType,
        test_support::{header, numeric, orderable, text},
    };

    fn template(header: &Header) -> Template {
        let mut skip = numeric(ColumnKind::Skipped, ColumnSource::UserInput, 0);
        skip.value_type = ValueType::Boolean;
        let mut beginning_balance = numeric(ColumnKind::BeginningBalance, ColumnSource::UserInput, 2);
        beginning_balance.mandatory = true;

        Template::new(
            vec![
                skip,
                text(ColumnKind::ProductCode, ColumnSource::ReferenceData, 1),
                beginning_balance,
                numeric(ColumnKind::TotalReceivedQuantity, ColumnSource::UserInput, 3),
                numeric(ColumnKind::TotalConsumedQuantity, ColumnSource::UserInput, 4),
                numeric(ColumnKind::StockOnHand, ColumnSource::Calculated, 5),
                numeric(ColumnKind::RequestedQuantity, ColumnSource::UserInput, 6),
                text(ColumnKind::RequestedQuantityExplanation, ColumnSource::UserInput, 7),
            ],
            header.status,
            header.emergency,
        )
        .unwrap()
    }

    fn requisition(status: RequisitionStatus, emergency: bool) -> (Requisition, Orderable, Orderable) {
        let mut header = header(status);
        header.emergency = emergency;
        let template = template(&header);
        let existing = orderable(true);
        let full_supply = orderable(true);
        let non_full_supply = orderable(false);

        let requisition = Requisition::new(header, template, [LineItemData::new(existing)])
            .unwrap()
            .with_available_products([full_supply.clone(), non_full_supply.clone()]);

        (requisition, full_supply, non_full_supply)
    }

    #[test_case(RequisitionStatus::Approved)]
    #[test_case(RequisitionStatus::Authorized)]
    #[test_case(RequisitionStatus::InApproval)]
    #[test_case(RequisitionStatus::Released)]
    #[test_case(RequisitionStatus::ReleasedWithoutOrder)]
    #[test_case(RequisitionStatus::Skipped)]
    fn adding_is_gated_by_status(status: RequisitionStatus) {
        let (mut requisition, _, non_full_supply) = requisition(status, false);

        let error = requisition
            .add_line_item(non_full_supply, Some(10), None)
            .unwrap_err();
        assert_eq!(error, LineItemError::StatusForbidsMutation(status));
        assert_eq!(requisition.line_items().len(), 1);
    }

    #[test]
    fn adding_a_duplicate_fails() {
        let (mut requisition, _, _) = requisition(RequisitionStatus::Initiated, false);
        let existing = requisition.line_items()[0].orderable().clone();

        let error = requisition.add_line_item(existing, None, None).unwrap_err();
        assert_eq!(error, LineItemError::AlreadyExists("C100".to_string()));
    }

    #[test]
    fn adding_full_supply_to_regular_requisition_fails() {
        let (mut requisition, full_supply, _) = requisition(RequisitionStatus::Initiated, false);

        let error = requisition.add_line_item(full_supply, None, None).unwrap_err();
        assert_eq!(
            error,
            LineItemError::FullSupplyOnRegularRequisition("C100".to_string())
        );
    }

    #[test]
    fn adding_full_supply_to_emergency_requisition() {
        let (mut requisition, full_supply, _) = requisition(RequisitionStatus::Initiated, true);

        requisition.add_line_item(full_supply, Some(5), None).unwrap();
        assert_eq!(requisition.line_items().len(), 2);
    }

    #[test]
    fn adding_an_unavailable_product_fails() {
        let (mut requisition, _, _) = requisition(RequisitionStatus::Initiated, false);

        let error = requisition
            .add_line_item(orderable(false), None, None)
            .unwrap_err();
        assert_eq!(error, LineItemError::NotAvailable("C100".to_string()));
    }

    #[test_case(RequisitionStatus::Initiated)]
    #[test_case(RequisitionStatus::Submitted)]
    #[test_case(RequisitionStatus::Rejected)]
    fn adding_a_non_full_supply_product(status: RequisitionStatus) {
        let (mut requisition, _, non_full_supply) = requisition(status, false);
        let id = non_full_supply.id;

        let line_item = requisition
            .add_line_item(non_full_supply, Some(40), Some("outbreak".to_string()))
            .unwrap();
        assert_eq!(line_item.value("requestedQuantity"), Some(&Value::Integer(40)));
        assert_eq!(
            line_item.value("requestedQuantityExplanation"),
            Some(&Value::from("outbreak"))
        );
        assert_eq!(line_item.value("beginningBalance"), None);

        assert_eq!(requisition.line_items().len(), 2);
        assert_eq!(requisition.non_full_supply_line_items().count(), 1);
        assert!(requisition.line_item(id).is_some());
    }

    #[test]
    fn deleting_line_items() {
        let (mut requisition, _, non_full_supply) = requisition(RequisitionStatus::Initiated, false);
        let id = non_full_supply.id;
        let full_supply_id = requisition.line_items()[0].orderable().id;

        assert_eq!(
            requisition.delete_line_item(full_supply_id).unwrap_err(),
            LineItemError::FullSupplyNotDeletable("C100".to_string())
        );
        assert_eq!(
            requisition.delete_line_item(id).unwrap_err(),
            LineItemError::NotFound(id)
        );

        requisition.add_line_item(non_full_supply, Some(1), None).unwrap();
        let removed = requisition.delete_line_item(id).unwrap();
        assert_eq!(removed.orderable().id, id);
        assert_eq!(requisition.line_items().len(), 1);
    }

    #[test]
    fn deleting_is_gated_by_status() {
        let (mut requisition, _, _) = requisition(RequisitionStatus::Approved, false);
        let id = requisition.line_items()[0].orderable().id;

        assert_eq!(
            requisition.delete_line_item(id).unwrap_err(),
            LineItemError::StatusForbidsMutation(RequisitionStatus::Approved)
        );
    }

    #[test]
    fn updating_a_field_propagates_and_revalidates() {
        let (mut requisition, _, _) = requisition(RequisitionStatus::Submitted, false);
        let id = requisition.line_items()[0].orderable().id;

        requisition
            .update_field(id, "totalReceivedQuantity", Some(Value::Integer(20)))
            .unwrap();
        requisition
            .update_field(id, "totalConsumedQuantity", Some(Value::Integer(15)))
            .unwrap();
        let recalculated = requisition
            .update_field(id, "beginningBalance", Some(Value::Integer(50)))
            .unwrap();

        assert!(recalculated.contains(&"stockOnHand".to_string()));
        let line_item = requisition.line_item(id).unwrap();
        assert_eq!(line_item.value("stockOnHand"), Some(&Value::Integer(55)));
        assert!(line_item.errors().is_empty());

        requisition.update_field(id, "beginningBalance", None).unwrap();
        let line_item = requisition.line_item(id).unwrap();
        assert_eq!(line_item.value("stockOnHand"), None);
        assert_eq!(
            line_item.error("beginningBalance"),
            Some(&ValidationError::Required)
        );
    }

    #[test]
    fn updating_an_unknown_column_fails() {
        let (mut requisition, _, _) = requisition(RequisitionStatus::Initiated, false);
        let id = requisition.line_items()[0].orderable().id;

        assert_eq!(
            requisition.update_field(id, "facilityScore", None).unwrap_err(),
            LineItemError::ColumnNotFound("facilityScore".to_string())
        );
    }

    #[test]
    fn validating_the_whole_requisition() {
        let (mut requisition, _, _) = requisition(RequisitionStatus::Initiated, false);
        assert!(requisition.is_valid());

        assert!(!requisition.validate());
        assert!(!requisition.is_valid());

        let id = requisition.line_items()[0].orderable().id;
        requisition
            .update_field(id, "beginningBalance", Some(Value::Integer(0)))
            .unwrap();
        requisition
            .update_field(id, "requestedQuantity", Some(Value::Integer(0)))
            .unwrap();
        assert!(requisition.validate());
    }

    #[test]
    fn skipping_every_empty_line_item() {
        let (mut requisition, _, non_full_supply) = requisition(RequisitionStatus::Initiated, false);
        requisition
            .add_line_item(non_full_supply, Some(3), None)
            .unwrap();

        assert_eq!(requisition.skip_all_line_items(), 1);
        assert!(requisition.line_items()[0].is_skipped());
        assert!(!requisition.line_items()[1].is_skipped());

        requisition.unskip_all_line_items();
        assert!(requisition.line_items().iter().all(|line_item| !line_item.is_skipped()));
    }
}
