//! Formulas for calculated columns.
//!
//! Every formula reads the other fields of a line item and returns `None`
//! when an input it needs is unset. An explicit zero is a value.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use tracing::warn;

use crate::domain::{ColumnKind, Context, LineItem, Value};

/// Days in one month of a processing period.
pub const DAYS_PER_MONTH: i64 = 30;

/// A formula producing the value of a calculated column.
pub type Calculation = fn(&LineItem, &Context<'_>) -> Option<Value>;

/// The formula registered for a column kind, if it is computable.
#[must_use]
pub const fn calculation(kind: ColumnKind) -> Option<Calculation> {
    match kind {
        ColumnKind::TotalConsumedQuantity => Some(total_consumed_quantity),
        ColumnKind::StockOnHand => Some(stock_on_hand),
        ColumnKind::Total => Some(total),
        ColumnKind::TotalLossesAndAdjustments => Some(total_losses_and_adjustments),
        ColumnKind::AdjustedConsumption => Some(adjusted_consumption),
        ColumnKind::AverageConsumption => Some(average_consumption),
        ColumnKind::MaximumStockQuantity => Some(maximum_stock_quantity),
        ColumnKind::CalculatedOrderQuantity => Some(calculated_order_quantity),
        ColumnKind::CalculatedOrderQuantityIsa => Some(calculated_order_quantity_isa),
        ColumnKind::PacksToShip => Some(packs_to_ship),
        ColumnKind::TotalCost => Some(total_cost),
        ColumnKind::BeginningBalance
        | ColumnKind::TotalReceivedQuantity
        | ColumnKind::NumberOfNewPatientsAdded
        | ColumnKind::IdealStockAmount
        | ColumnKind::RequestedQuantity
        | ColumnKind::ApprovedQuantity
        | ColumnKind::Remarks
        | ColumnKind::ProductCode
        | ColumnKind::ProductName
        | ColumnKind::PricePerPack
        | ColumnKind::DispensingUnit
        | ColumnKind::RequestedQuantityExplanation
        | ColumnKind::TotalStockoutDays
        | ColumnKind::AdditionalQuantityRequired
        | ColumnKind::Skipped => None,
    }
}

/// Number of days in the requisition's processing period.
#[must_use]
pub fn period_days(context: &Context<'_>) -> i64 {
    i64::from(context.header.processing_period.duration_in_months) * DAYS_PER_MONTH
}

/// Sum of a line item's stock adjustments, signed by reason.
///
/// Adjustments with a reason the requisition does not know contribute
/// nothing.
#[must_use]
pub fn adjustment_total(line_item: &LineItem, context: &Context<'_>) -> i64 {
    line_item
        .stock_adjustments()
        .iter()
        .map(|adjustment| {
            context
                .header
                .stock_adjustment_reasons
                .iter()
                .find(|reason| reason.id == adjustment.reason_id)
                .map_or_else(
                    || {
                        warn!(reason = %adjustment.reason_id, "unknown stock adjustment reason");
                        0
                    },
                    |reason| adjustment.signed_quantity(reason),
                )
        })
        .fold(0, i64::saturating_add)
}

fn integer(line_item: &LineItem, kind: ColumnKind) -> Option<i64> {
    line_item.value(kind.name()).and_then(Value::as_integer)
}

fn decimal(line_item: &LineItem, kind: ColumnKind) -> Option<Decimal> {
    line_item.value(kind.name()).and_then(Value::as_decimal)
}

fn losses_and_adjustments(line_item: &LineItem, context: &Context<'_>) -> i64 {
    integer(line_item, ColumnKind::TotalLossesAndAdjustments)
        .unwrap_or_else(|| adjustment_total(line_item, context))
}

/// `beginningBalance + totalReceivedQuantity + totalLossesAndAdjustments - other`
fn stock_balance(line_item: &LineItem, context: &Context<'_>, other: ColumnKind) -> Option<Value> {
    let beginning_balance = integer(line_item, ColumnKind::BeginningBalance)?;
    let received = integer(line_item, ColumnKind::TotalReceivedQuantity)?;
    let other = integer(line_item, other)?;

    beginning_balance
        .checked_add(received)?
        .checked_add(losses_and_adjustments(line_item, context))?
        .checked_sub(other)
        .map(Value::Integer)
}

fn total_consumed_quantity(line_item: &LineItem, context: &Context<'_>) -> Option<Value> {
    stock_balance(line_item, context, ColumnKind::StockOnHand)
}

fn stock_on_hand(line_item: &LineItem, context: &Context<'_>) -> Option<Value> {
    stock_balance(line_item, context, ColumnKind::TotalConsumedQuantity)
}

fn total(line_item: &LineItem, _: &Context<'_>) -> Option<Value> {
    let beginning_balance = integer(line_item, ColumnKind::BeginningBalance)?;
    let received = integer(line_item, ColumnKind::TotalReceivedQuantity)?;

    beginning_balance.checked_add(received).map(Value::Integer)
}

fn total_losses_and_adjustments(line_item: &LineItem, context: &Context<'_>) -> Option<Value> {
    Some(Value::Integer(adjustment_total(line_item, context)))
}

fn adjusted_consumption(line_item: &LineItem, context: &Context<'_>) -> Option<Value> {
    let consumed = integer(line_item, ColumnKind::TotalConsumedQuantity)?;
    let stockout_days = integer(line_item, ColumnKind::TotalStockoutDays).unwrap_or(0);
    let additional = integer(line_item, ColumnKind::AdditionalQuantityRequired).unwrap_or(0);

    let days = period_days(context);
    let days_in_stock = days.checked_sub(stockout_days)?;

    if days_in_stock <= 0 {
        return consumed.checked_add(additional).map(Value::Integer);
    }

    let adjusted = Decimal::from(consumed)
        .checked_mul(Decimal::from(days))?
        .checked_div(Decimal::from(days_in_stock))?
        .ceil()
        .to_i64()?;

    adjusted.checked_add(additional).map(Value::Integer)
}

fn average_consumption(line_item: &LineItem, _: &Context<'_>) -> Option<Value> {
    let adjusted = integer(line_item, ColumnKind::AdjustedConsumption)?;
    let previous = line_item.previous_adjusted_consumptions();

    let sum = previous
        .iter()
        .try_fold(Decimal::from(adjusted), |sum, &value| {
            sum.checked_add(Decimal::from(value))
        })?;
    let periods = Decimal::from(previous.len()) + Decimal::ONE;

    sum.checked_div(periods)?
        .ceil()
        .to_i64()
        .map(Value::Integer)
}

fn maximum_stock_quantity(line_item: &LineItem, _: &Context<'_>) -> Option<Value> {
    let average = integer(line_item, ColumnKind::AverageConsumption)?;
    let periods = line_item.max_periods_of_stock()?;

    Decimal::from(average)
        .checked_mul(periods)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .map(Value::Integer)
}

/// `max(0, target - stockOnHand)`
fn shortfall(line_item: &LineItem, target: ColumnKind) -> Option<Value> {
    let target = integer(line_item, target)?;
    let stock_on_hand = integer(line_item, ColumnKind::StockOnHand)?;

    target
        .checked_sub(stock_on_hand)
        .map(|quantity| Value::Integer(quantity.max(0)))
}

fn calculated_order_quantity(line_item: &LineItem, _: &Context<'_>) -> Option<Value> {
    shortfall(line_item, ColumnKind::MaximumStockQuantity)
}

fn calculated_order_quantity_isa(line_item: &LineItem, _: &Context<'_>) -> Option<Value> {
    shortfall(line_item, ColumnKind::IdealStockAmount)
}

fn packs_to_ship(line_item: &LineItem, context: &Context<'_>) -> Option<Value> {
    let quantity = if context.header.status.is_after_authorize() {
        integer(line_item, ColumnKind::ApprovedQuantity)
    } else if context.header.emergency {
        integer(line_item, ColumnKind::RequestedQuantity)
    } else {
        integer(line_item, ColumnKind::RequestedQuantity)
            .or_else(|| integer(line_item, ColumnKind::CalculatedOrderQuantity))
    };

    Some(Value::Integer(
        line_item.orderable().packs_for(quantity.unwrap_or(0)),
    ))
}

fn total_cost(line_item: &LineItem, _: &Context<'_>) -> Option<Value> {
    let packs = integer(line_item, ColumnKind::PacksToShip)?;
    let price = decimal(line_item, ColumnKind::PricePerPack)?;

    Decimal::from(packs).checked_mul(price).map(Value::Decimal)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use test_case::test_case;

    use super::*;
    use crate::domain::{
        ColumnSource, Header, LineItemData, RequisitionStatus, StockAdjustment, Template,
        test_support::{header, numeric, orderable},
    };

    fn template(header: &Header) -> Template {
        Template::new(
            vec![numeric(ColumnKind::BeginningBalance, ColumnSource::UserInput, 0)],
            header.status,
            header.emergency,
        )
        .unwrap()
    }

    fn evaluate(header: &Header, data: LineItemData, kind: ColumnKind) -> Option<Value> {
        let template = template(header);
        let context = Context {
            header,
            template: &template,
        };
        let line_item = LineItem::new(data, &context).unwrap();
        calculation(kind).and_then(|calculate| calculate(&line_item, &context))
    }

    fn data(values: &[(ColumnKind, i64)]) -> LineItemData {
        values
            .iter()
            .fold(LineItemData::new(orderable(true)), |data, (kind, value)| {
                data.with_value(kind.name(), *value)
            })
    }

    #[test]
    fn formulas_have_inputs() {
        for kind in ColumnKind::ALL {
            if calculation(kind).is_some() {
                assert!(
                    !kind.dependencies().is_empty()
                        || kind == ColumnKind::TotalLossesAndAdjustments,
                    "{kind} has a formula but no inputs"
                );
            }
        }
    }

    #[test]
    fn stock_on_hand_balances_stock() {
        let header = header(RequisitionStatus::Initiated);
        let value = evaluate(
            &header,
            data(&[
                (ColumnKind::BeginningBalance, 50),
                (ColumnKind::TotalReceivedQuantity, 20),
                (ColumnKind::TotalConsumedQuantity, 15),
            ]),
            ColumnKind::StockOnHand,
        );
        assert_eq!(value, Some(Value::Integer(55)));
    }

    #[test]
    fn consumed_is_inverse_of_stock_on_hand() {
        let header = header(RequisitionStatus::Initiated);
        let value = evaluate(
            &header,
            data(&[
                (ColumnKind::BeginningBalance, 50),
                (ColumnKind::TotalReceivedQuantity, 20),
                (ColumnKind::StockOnHand, 55),
            ]),
            ColumnKind::TotalConsumedQuantity,
        );
        assert_eq!(value, Some(Value::Integer(15)));
    }

    #[test]
    fn missing_input_yields_unset() {
        let header = header(RequisitionStatus::Initiated);
        let value = evaluate(
            &header,
            data(&[
                (ColumnKind::BeginningBalance, 50),
                (ColumnKind::TotalConsumedQuantity, 15),
            ]),
            ColumnKind::StockOnHand,
        );
        assert_eq!(value, None);
    }

    #[test]
    fn zero_inputs_are_values() {
        let header = header(RequisitionStatus::Initiated);
        let value = evaluate(
            &header,
            data(&[
                (ColumnKind::BeginningBalance, 0),
                (ColumnKind::TotalReceivedQuantity, 0),
                (ColumnKind::TotalConsumedQuantity, 0),
            ]),
            ColumnKind::StockOnHand,
        );
        assert_eq!(value, Some(Value::Integer(0)));
    }

    #[test]
    fn adjustments_are_signed_by_reason() {
        let header = header(RequisitionStatus::Initiated);
        let credit = header.stock_adjustment_reasons[0].id;
        let debit = header.stock_adjustment_reasons[1].id;
        let mut data = data(&[]);
        data.stock_adjustments = vec![
            StockAdjustment {
                reason_id: credit,
                quantity: 10,
            },
            StockAdjustment {
                reason_id: debit,
                quantity: 4,
            },
            StockAdjustment {
                reason_id: uuid::Uuid::new_v4(),
                quantity: 100,
            },
        ];

        let value = evaluate(&header, data, ColumnKind::TotalLossesAndAdjustments);
        assert_eq!(value, Some(Value::Integer(6)));
    }

    #[test_case(90, 0, 0, 90; "no stockout")]
    #[test_case(90, 30, 0, 135; "one month out of stock")]
    #[test_case(10, 7, 2, 13; "rounds up then adds")]
    #[test_case(90, 90, 5, 95; "out of stock for the whole period")]
    fn adjusted_consumption(consumed: i64, stockout: i64, additional: i64, expected: i64) {
        // three month period
        let header = header(RequisitionStatus::Initiated);
        let value = evaluate(
            &header,
            data(&[
                (ColumnKind::TotalConsumedQuantity, consumed),
                (ColumnKind::TotalStockoutDays, stockout),
                (ColumnKind::AdditionalQuantityRequired, additional),
            ]),
            ColumnKind::AdjustedConsumption,
        );
        assert_eq!(value, Some(Value::Integer(expected)));
    }

    #[test]
    fn average_consumption_includes_previous_periods() {
        let header = header(RequisitionStatus::Initiated);
        let mut data = data(&[(ColumnKind::AdjustedConsumption, 10)]);
        data.previous_adjusted_consumptions = vec![11, 13];

        let value = evaluate(&header, data, ColumnKind::AverageConsumption);
        assert_eq!(value, Some(Value::Integer(12)));

        let value = evaluate(&header, self::data(&[]), ColumnKind::AverageConsumption);
        assert_eq!(value, None);
    }

    #[test]
    fn maximum_stock_rounds_half_away_from_zero() {
        let header = header(RequisitionStatus::Initiated);
        let mut data = data(&[(ColumnKind::AverageConsumption, 5)]);
        data.max_periods_of_stock = Some(Decimal::from_str("2.5").unwrap());

        let value = evaluate(&header, data, ColumnKind::MaximumStockQuantity);
        assert_eq!(value, Some(Value::Integer(13)));
    }

    #[test_case(ColumnKind::CalculatedOrderQuantity, ColumnKind::MaximumStockQuantity)]
    #[test_case(ColumnKind::CalculatedOrderQuantityIsa, ColumnKind::IdealStockAmount)]
    fn order_quantity_never_negative(kind: ColumnKind, target: ColumnKind) {
        let header = header(RequisitionStatus::Initiated);

        let short = evaluate(
            &header,
            data(&[(target, 40), (ColumnKind::StockOnHand, 25)]),
            kind,
        );
        assert_eq!(short, Some(Value::Integer(15)));

        let surplus = evaluate(
            &header,
            data(&[(target, 10), (ColumnKind::StockOnHand, 25)]),
            kind,
        );
        assert_eq!(surplus, Some(Value::Integer(0)));
    }

    #[test_case(RequisitionStatus::Initiated, false, 60; "requested before authorization")]
    #[test_case(RequisitionStatus::Authorized, false, 30; "approved after authorization")]
    #[test_case(RequisitionStatus::Initiated, true, 60; "emergency uses requested")]
    fn packs_to_ship_source(status: RequisitionStatus, emergency: bool, expected_units: i64) {
        let mut header = header(status);
        header.emergency = emergency;
        let value = evaluate(
            &header,
            data(&[
                (ColumnKind::RequestedQuantity, 60),
                (ColumnKind::ApprovedQuantity, 30),
                (ColumnKind::CalculatedOrderQuantity, 90),
            ]),
            ColumnKind::PacksToShip,
        );
        // net content of the fixture product is 10
        assert_eq!(value, Some(Value::Integer(expected_units / 10)));
    }

    #[test]
    fn packs_to_ship_falls_back_to_calculated_order_quantity() {
        let header = header(RequisitionStatus::Initiated);
        let value = evaluate(
            &header,
            data(&[(ColumnKind::CalculatedOrderQuantity, 90)]),
            ColumnKind::PacksToShip,
        );
        assert_eq!(value, Some(Value::Integer(9)));

        let mut emergency = header.clone();
        emergency.emergency = true;
        let value = evaluate(
            &emergency,
            data(&[(ColumnKind::CalculatedOrderQuantity, 90)]),
            ColumnKind::PacksToShip,
        );
        assert_eq!(value, Some(Value::Integer(0)));
    }

    #[test]
    fn total_cost_is_currency() {
        let header = header(RequisitionStatus::Initiated);
        let data = data(&[(ColumnKind::PacksToShip, 3)]).with_value(
            ColumnKind::PricePerPack.name(),
            Decimal::from_str("2.50").unwrap(),
        );

        let value = evaluate(&header, data, ColumnKind::TotalCost);
        assert_eq!(value, Some(Value::Decimal(Decimal::from_str("7.50").unwrap())));
    }
}
