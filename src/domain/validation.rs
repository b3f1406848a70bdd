//! Field validation.
//!
//! Validation never fails loudly. Problems are recorded in the line item's
//! error map under the column name and cleared again once the field passes.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::domain::{
    Column, ColumnKind, ColumnSource, Context, LineItem, Requisition, Value,
    calculation::{calculation, period_days},
    value,
};

/// A problem with the value of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationError {
    /// A value must be entered.
    #[error("this field is required")]
    Required,
    /// The number cannot be represented exactly by clients.
    #[error("the number is too large")]
    NumberTooLarge,
    /// The value is below zero.
    #[error("the value must not be negative")]
    Negative,
    /// More stockout days than the processing period has.
    #[error("the value exceeds the number of days in the period")]
    ValueExceedsPeriodDuration,
    /// A user-entered value disagrees with the value derived from the other
    /// fields.
    #[error("the value does not match the calculated value")]
    ValueDoesNotMatchCalculation,
}

impl ValidationError {
    /// Key used to look up the localized message.
    #[must_use]
    pub const fn message_key(self) -> &'static str {
        match self {
            Self::Required => "requisitionValidation.required",
            Self::NumberTooLarge => "requisitionValidation.numberTooLarge",
            Self::Negative => "requisitionValidation.nonNegative",
            Self::ValueExceedsPeriodDuration => "requisitionValidation.valueExceedsPeriodDuration",
            Self::ValueDoesNotMatchCalculation => {
                "requisitionValidation.valueDoesNotMatchCalculation"
            }
        }
    }
}

/// A rule specific to one column kind.
pub type Validation = fn(&LineItem, ColumnKind, &Context<'_>) -> Option<ValidationError>;

/// The rule registered for a column kind, if any.
#[must_use]
pub const fn validation(kind: ColumnKind) -> Option<Validation> {
    match kind {
        ColumnKind::BeginningBalance
        | ColumnKind::TotalReceivedQuantity
        | ColumnKind::TotalConsumedQuantity
        | ColumnKind::StockOnHand
        | ColumnKind::ApprovedQuantity => Some(non_negative),
        ColumnKind::RequestedQuantity => Some(requested_quantity),
        ColumnKind::RequestedQuantityExplanation => Some(requested_quantity_explanation),
        ColumnKind::TotalStockoutDays => Some(total_stockout_days),
        ColumnKind::TotalLossesAndAdjustments
        | ColumnKind::NumberOfNewPatientsAdded
        | ColumnKind::IdealStockAmount
        | ColumnKind::MaximumStockQuantity
        | ColumnKind::CalculatedOrderQuantity
        | ColumnKind::Remarks
        | ColumnKind::AdjustedConsumption
        | ColumnKind::ProductCode
        | ColumnKind::AverageConsumption
        | ColumnKind::TotalCost
        | ColumnKind::ProductName
        | ColumnKind::CalculatedOrderQuantityIsa
        | ColumnKind::PricePerPack
        | ColumnKind::DispensingUnit
        | ColumnKind::PacksToShip
        | ColumnKind::Total
        | ColumnKind::AdditionalQuantityRequired
        | ColumnKind::Skipped => None,
    }
}

fn non_negative(line_item: &LineItem, kind: ColumnKind, _: &Context<'_>) -> Option<ValidationError> {
    line_item
        .value(kind.name())
        .is_some_and(Value::is_negative)
        .then_some(ValidationError::Negative)
}

fn requested_quantity(
    line_item: &LineItem,
    kind: ColumnKind,
    context: &Context<'_>,
) -> Option<ValidationError> {
    if value::is_empty(line_item.value(kind.name())) {
        let required = !context
            .template
            .is_displayed(ColumnKind::CalculatedOrderQuantity.name())
            || context.header.emergency
            || !line_item.is_full_supply();

        return required.then_some(ValidationError::Required);
    }

    non_negative(line_item, kind, context)
}

fn requested_quantity_explanation(
    line_item: &LineItem,
    kind: ColumnKind,
    context: &Context<'_>,
) -> Option<ValidationError> {
    let required = line_item.is_full_supply()
        && !context.header.emergency
        && context
            .template
            .is_displayed(ColumnKind::CalculatedOrderQuantity.name())
        && !value::is_empty(line_item.value(ColumnKind::RequestedQuantity.name()));

    (required && value::is_empty(line_item.value(kind.name())))
        .then_some(ValidationError::Required)
}

fn total_stockout_days(
    line_item: &LineItem,
    kind: ColumnKind,
    context: &Context<'_>,
) -> Option<ValidationError> {
    if let Some(error) = non_negative(line_item, kind, context) {
        return Some(error);
    }

    line_item
        .value(kind.name())
        .and_then(Value::as_integer)
        .is_some_and(|days| days > period_days(context))
        .then_some(ValidationError::ValueExceedsPeriodDuration)
}

/// Checks a user-entered value against the value its counterpart scheme
/// would calculate.
fn counterpart_mismatch(
    line_item: &LineItem,
    column: &Column,
    kind: ColumnKind,
    context: &Context<'_>,
) -> Option<ValidationError> {
    if column.source() != ColumnSource::UserInput {
        return None;
    }

    let counterpart = context.template.column(kind.counterpart()?.name())?;
    if counterpart.source() == ColumnSource::Calculated || !counterpart.is_displayed() {
        return None;
    }

    let actual = line_item.value(column.name()).and_then(Value::as_integer)?;
    let expected = calculation(kind)?(line_item, context)?.as_integer()?;

    (actual != expected).then_some(ValidationError::ValueDoesNotMatchCalculation)
}

fn field_error(line_item: &LineItem, column: &Column, context: &Context<'_>) -> Option<ValidationError> {
    let kind = column.kind();

    if !column.is_displayed()
        || kind == Some(ColumnKind::TotalLossesAndAdjustments)
        || (context.template.populates_stock_on_hand_from_stock_cards()
            && kind.is_some_and(ColumnKind::is_stock_based))
    {
        return None;
    }

    let value = line_item.value(column.name());

    if column.is_required() && value::is_empty(value) {
        return Some(ValidationError::Required);
    }

    if column.value_type().is_numeric() && value.is_some_and(Value::exceeds_safe_integer) {
        return Some(ValidationError::NumberTooLarge);
    }

    let kind = kind?;

    if let Some(error) = validation(kind).and_then(|validate| validate(line_item, kind, context)) {
        return Some(error);
    }

    counterpart_mismatch(line_item, column, kind, context)
}

/// Validates one field and records the outcome in the line item's errors.
///
/// Returns `true` if the field is valid. Columns that are hidden, the losses
/// and adjustments total, and stock columns fed from stock cards are not
/// validated and always pass.
pub fn validate_line_item_field(
    line_item: &mut LineItem,
    column: &Column,
    context: &Context<'_>,
) -> bool {
    let error = field_error(line_item, column, context);
    line_item.record_error(column.name(), error);
    error.is_none()
}

/// Validates every given column of a line item.
///
/// All columns are checked, so every problem is recorded.
pub fn validate_line_item(
    line_item: &mut LineItem,
    columns: &[&Column],
    context: &Context<'_>,
) -> bool {
    columns.iter().fold(true, |valid, column| {
        validate_line_item_field(line_item, column, context) && valid
    })
}

/// Validates every line item of a requisition against the columns shown for
/// its supply type.
#[instrument(level = "debug", skip_all, fields(requisition = %requisition.id()))]
pub fn validate_requisition(requisition: &mut Requisition) -> bool {
    let (context, line_items) = requisition.split_mut();
    let mut valid = true;

    for line_item in line_items {
        let columns = context.template.columns(!line_item.is_full_supply());
        if !validate_line_item(line_item, &columns, &context) {
            debug!(
                product = %line_item.orderable().product_code,
                errors = line_item.errors().len(),
                "line item is invalid"
            );
            valid = false;
        }
    }

    valid
}

/// Whether a line item has no recorded errors.
///
/// This does not re-run validation.
#[must_use]
pub fn is_line_item_valid(line_item: &LineItem) -> bool {
    line_item.errors().is_empty()
}

/// Whether none of the line items have recorded errors.
pub fn are_line_items_valid<'a>(line_items: impl IntoIterator<Item = &'a LineItem>) -> bool {
    line_items.into_iter().all(is_line_item_valid)
}
