//! Line items and the field recalculation engine.
//!
//! A [`LineItem`] is one row of a requisition. Its fields are computed
//! against the owning requisition's [`Template`](crate::domain::Template):
//! calculated columns are derived from other fields, and editing a field
//! propagates through the columns that depend on it.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{instrument, trace};
use uuid::Uuid;

use crate::domain::{
    Column, ColumnKind, ColumnSource, Context, Orderable, ProgramOrderable, RequisitionStatus,
    StockAdjustment, ValidationError, Value, ValueType,
    calculation::calculation,
    rights::{Right, RightsProvider},
    value,
};

/// Errors raised when a line item is built or the set of line items is
/// changed in a way the requisition does not allow.
///
/// These are contract violations by the caller, not user-facing validation
/// messages.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineItemError {
    /// The product is not configured for the requisition's program.
    #[error("product {product_code} is not part of program {program_code}")]
    ProgramNotFound {
        /// Code of the product.
        product_code: String,
        /// Code of the requisition's program.
        program_code: String,
    },
    /// Line items cannot be added or removed in this status.
    #[error("line items cannot be added or removed while the requisition is {0}")]
    StatusForbidsMutation(RequisitionStatus),
    /// The requisition already has a line item for the product.
    #[error("a line item for product {0} already exists")]
    AlreadyExists(String),
    /// The product is not in the requisition's list of available products.
    #[error("product {0} is not available for this requisition")]
    NotAvailable(String),
    /// Regular requisitions cannot gain full supply rows.
    #[error("full supply product {0} can only be added to an emergency requisition")]
    FullSupplyOnRegularRequisition(String),
    /// No line item exists for the orderable.
    #[error("no line item for orderable {0}")]
    NotFound(Uuid),
    /// Full supply rows are fixed at initiation.
    #[error("full supply line item {0} cannot be deleted")]
    FullSupplyNotDeletable(String),
    /// The template has no column with the given name.
    #[error("the template has no column '{0}'")]
    ColumnNotFound(String),
}

/// The raw data of a line item before it is evaluated against a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemData {
    /// The product this row is for.
    pub orderable: Orderable,
    /// Field values keyed by column name. Absent means unset.
    pub values: BTreeMap<String, Value>,
    /// Recorded losses and adjustments.
    pub stock_adjustments: Vec<StockAdjustment>,
    /// Adjusted consumption of previous periods, most recent first.
    pub previous_adjusted_consumptions: Vec<i64>,
    /// Number of periods of stock the facility should hold.
    pub max_periods_of_stock: Option<Decimal>,
}

impl LineItemData {
    /// Creates data for a row with no values.
    #[must_use]
    pub const fn new(orderable: Orderable) -> Self {
        Self {
            orderable,
            values: BTreeMap::new(),
            stock_adjustments: Vec::new(),
            previous_adjusted_consumptions: Vec::new(),
            max_periods_of_stock: None,
        }
    }

    /// Sets a field value.
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

/// One row of a requisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    orderable: Orderable,
    program: ProgramOrderable,
    values: BTreeMap<String, Value>,
    stock_adjustments: Vec<StockAdjustment>,
    previous_adjusted_consumptions: Vec<i64>,
    max_periods_of_stock: Option<Decimal>,
    errors: BTreeMap<String, ValidationError>,
}

impl LineItem {
    /// Builds a line item and computes its initial field values.
    ///
    /// Every column shown for the row's supply type is evaluated once, in
    /// template order.
    ///
    /// # Errors
    ///
    /// Returns [`LineItemError::ProgramNotFound`] if the orderable has no
    /// settings for the requisition's program.
    pub fn new(data: LineItemData, context: &Context<'_>) -> Result<Self, LineItemError> {
        let program = data
            .orderable
            .program(context.header.program.id)
            .cloned()
            .ok_or_else(|| LineItemError::ProgramNotFound {
                product_code: data.orderable.product_code.clone(),
                program_code: context.header.program.code.clone(),
            })?;

        let mut line_item = Self {
            orderable: data.orderable,
            program,
            values: data.values,
            stock_adjustments: data.stock_adjustments,
            previous_adjusted_consumptions: data.previous_adjusted_consumptions,
            max_periods_of_stock: data.max_periods_of_stock,
            errors: BTreeMap::new(),
        };

        for column in context.template.columns(!line_item.is_full_supply()) {
            line_item.update_field_value(column, context);
        }

        Ok(line_item)
    }

    /// The product this row is for.
    #[must_use]
    pub const fn orderable(&self) -> &Orderable {
        &self.orderable
    }

    /// The product's settings in the requisition's program.
    #[must_use]
    pub const fn program(&self) -> &ProgramOrderable {
        &self.program
    }

    /// Whether the product is full supply in the requisition's program.
    #[must_use]
    pub const fn is_full_supply(&self) -> bool {
        self.program.full_supply
    }

    /// The value of a field, if set.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// All set field values, keyed by column name.
    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Assigns a field value without recalculating anything.
    ///
    /// Use [`Requisition::update_field`](crate::domain::Requisition::update_field)
    /// or follow up with [`Self::update_dependent_fields`] to keep calculated
    /// columns current.
    pub fn set_value(&mut self, name: &str, value: Option<Value>) {
        match value {
            Some(value) => {
                self.values.insert(name.to_string(), value);
            }
            None => {
                self.values.remove(name);
            }
        }
    }

    /// Whether the row has been marked as not applicable for the period.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(
            self.values.get(ColumnKind::Skipped.name()),
            Some(Value::Bool(true))
        )
    }

    /// Marks the row as skipped or not.
    pub fn set_skipped(&mut self, skipped: bool) {
        self.values
            .insert(ColumnKind::Skipped.name().to_string(), Value::Bool(skipped));
    }

    /// Recorded losses and adjustments.
    #[must_use]
    pub fn stock_adjustments(&self) -> &[StockAdjustment] {
        &self.stock_adjustments
    }

    /// Replaces the losses and adjustments and recalculates the columns that
    /// depend on their total.
    ///
    /// Returns the names of the recalculated columns.
    pub fn update_stock_adjustments(
        &mut self,
        stock_adjustments: Vec<StockAdjustment>,
        context: &Context<'_>,
    ) -> Vec<String> {
        self.stock_adjustments = stock_adjustments;

        let Some(column) = context
            .template
            .column(ColumnKind::TotalLossesAndAdjustments.name())
        else {
            return Vec::new();
        };

        self.update_field_value(column, context);
        self.update_dependent_fields(column, context)
    }

    /// Adjusted consumption of previous periods.
    #[must_use]
    pub fn previous_adjusted_consumptions(&self) -> &[i64] {
        &self.previous_adjusted_consumptions
    }

    /// Number of periods of stock the facility should hold.
    #[must_use]
    pub const fn max_periods_of_stock(&self) -> Option<Decimal> {
        self.max_periods_of_stock
    }

    /// Validation errors keyed by column name. Absent means valid.
    #[must_use]
    pub const fn errors(&self) -> &BTreeMap<String, ValidationError> {
        &self.errors
    }

    /// The validation error recorded for a column, if any.
    #[must_use]
    pub fn error(&self, name: &str) -> Option<&ValidationError> {
        self.errors.get(name)
    }

    pub(crate) fn record_error(&mut self, name: &str, error: Option<ValidationError>) {
        match error {
            Some(error) => {
                self.errors.insert(name.to_string(), error);
            }
            None => {
                self.errors.remove(name);
            }
        }
    }

    /// Recomputes a single field according to its column's source.
    ///
    /// Calculated columns take the result of their registered calculation,
    /// or become unset if none is registered. Other numeric fields keep their
    /// value; blank text in a numeric field is cleared. Text and boolean
    /// fields default to empty text and `false`. Reference data columns are
    /// filled from the product when unset.
    pub fn update_field_value(&mut self, column: &Column, context: &Context<'_>) {
        let name = column.name();

        if column.source() == ColumnSource::Calculated {
            let value = column
                .kind()
                .and_then(calculation)
                .and_then(|calculate| calculate(self, context));
            trace!(column = name, ?value, "recalculated");
            self.set_value(name, value);
            return;
        }

        let value = match self.values.remove(name) {
            Some(value) if column.value_type().is_numeric() && value.is_blank() => None,
            Some(value) => Some(value),
            None => self
                .reference_value(column)
                .or_else(|| default_value(column.value_type())),
        };

        self.set_value(name, value);
    }

    /// Recomputes every column that depends, directly or transitively, on
    /// the given column.
    ///
    /// Each column is recomputed at most once per call, so loops in the
    /// dependency table terminate. Returns the names of the recomputed
    /// columns in the order they were processed.
    #[instrument(level = "debug", skip_all, fields(column = column.name()))]
    pub fn update_dependent_fields(&mut self, column: &Column, context: &Context<'_>) -> Vec<String> {
        let mut visited = BTreeSet::new();
        let mut recomputed = Vec::new();

        self.propagate(column.name(), context, &mut visited, &mut recomputed);

        recomputed
    }

    fn propagate<'t>(
        &mut self,
        changed: &str,
        context: &Context<'t>,
        visited: &mut BTreeSet<&'t str>,
        recomputed: &mut Vec<String>,
    ) {
        let template = context.template;

        for candidate in template.all_columns() {
            if !candidate.depends_on(changed) || visited.contains(candidate.name()) {
                continue;
            }

            visited.insert(candidate.name());
            self.update_field_value(candidate, context);
            recomputed.push(candidate.name().to_string());

            self.propagate(candidate.name(), context, visited, recomputed);
        }
    }

    /// Whether the row may be marked as skipped.
    ///
    /// A row that holds any user-entered data must be cleared first.
    #[must_use]
    pub fn can_be_skipped(&self, context: &Context<'_>) -> bool {
        if !context.header.status.allows_skipping() {
            return false;
        }

        context
            .template
            .columns(!self.is_full_supply())
            .into_iter()
            .filter(|column| column.source() == ColumnSource::UserInput)
            .filter(|column| column.value_type() != ValueType::Boolean)
            .all(|column| value::is_empty(self.value(column.name())))
    }

    /// Whether the current actor may not edit this field.
    ///
    /// Anything not explicitly editable is read-only.
    #[must_use]
    pub fn is_read_only(
        &self,
        column: &Column,
        context: &Context<'_>,
        rights: &impl RightsProvider,
    ) -> bool {
        let status = context.header.status;
        let program_code = context.header.program.code.as_str();

        if status.is_locked() {
            return true;
        }

        if self.is_skipped() && !column.is_skip_column() {
            return true;
        }

        if status.is_in_approval() && column.kind().is_some_and(ColumnKind::is_approval_stage) {
            return !rights.has_right(Right::RequisitionApprove, program_code);
        }

        if column.source() == ColumnSource::UserInput {
            return match status {
                RequisitionStatus::Submitted => {
                    !rights.has_right(Right::RequisitionAuthorize, program_code)
                }
                RequisitionStatus::Initiated | RequisitionStatus::Rejected => {
                    !rights.has_right(Right::RequisitionCreate, program_code)
                }
                _ => true,
            };
        }

        true
    }

    fn reference_value(&self, column: &Column) -> Option<Value> {
        if column.source() != ColumnSource::ReferenceData {
            return None;
        }

        match column.kind()? {
            ColumnKind::ProductCode => Some(Value::from(self.orderable.product_code.as_str())),
            ColumnKind::ProductName => Some(Value::from(self.orderable.full_product_name.as_str())),
            ColumnKind::DispensingUnit => self.orderable.dispensing_unit.as_deref().map(Value::from),
            ColumnKind::PricePerPack => self.program.price_per_pack.map(Value::Decimal),
            _ => None,
        }
    }
}

fn default_value(value_type: ValueType) -> Option<Value> {
    match value_type {
        ValueType::Text => Some(Value::Text(String::new())),
        ValueType::Boolean => Some(Value::Bool(false)),
        ValueType::Numeric | ValueType::Currency => None,
    }
}
