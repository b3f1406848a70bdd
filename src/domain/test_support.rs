//! Fixtures shared by the unit tests.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{
    ColumnDefinition, ColumnKind, ColumnSource, Header, Orderable, ProcessingPeriod, Program,
    ProgramOrderable, ReasonType, RequisitionStatus, StockAdjustmentReason, ValueType,
};

pub const PROGRAM_CODE: &str = "PRG001";
pub const PROGRAM_ID: Uuid = Uuid::from_u128(0x5eed);

/// A three month period with one credit and one debit reason, in that order.
pub fn header(status: RequisitionStatus) -> Header {
    Header {
        id: Uuid::new_v4(),
        status,
        emergency: false,
        program: Program {
            id: PROGRAM_ID,
            code: PROGRAM_CODE.to_string(),
            name: None,
        },
        processing_period: ProcessingPeriod {
            id: Uuid::new_v4(),
            name: "Q1".to_string(),
            duration_in_months: 3,
        },
        stock_adjustment_reasons: vec![
            StockAdjustmentReason {
                id: Uuid::new_v4(),
                name: "Transfer in".to_string(),
                reason_type: ReasonType::Credit,
            },
            StockAdjustmentReason {
                id: Uuid::new_v4(),
                name: "Expired".to_string(),
                reason_type: ReasonType::Debit,
            },
        ],
    }
}

/// Product `C100`, ten units per pack, in [`PROGRAM_ID`].
pub fn orderable(full_supply: bool) -> Orderable {
    Orderable {
        id: Uuid::new_v4(),
        product_code: "C100".to_string(),
        full_product_name: "Paracetamol 500mg".to_string(),
        dispensing_unit: Some("tablet".to_string()),
        net_content: 10,
        pack_rounding_threshold: 0,
        round_to_zero: false,
        programs: vec![ProgramOrderable {
            program_id: PROGRAM_ID,
            full_supply,
            orderable_category_display_name: Some("Analgesics".to_string()),
            orderable_category_display_order: 0,
            display_order: 0,
            price_per_pack: Some(Decimal::new(250, 2)),
        }],
    }
}

pub fn numeric(kind: ColumnKind, source: ColumnSource, order: i32) -> ColumnDefinition {
    definition(kind, source, ValueType::Numeric, order)
}

pub fn text(kind: ColumnKind, source: ColumnSource, order: i32) -> ColumnDefinition {
    definition(kind, source, ValueType::Text, order)
}

fn definition(
    kind: ColumnKind,
    source: ColumnSource,
    value_type: ValueType,
    order: i32,
) -> ColumnDefinition {
    let mut definition = ColumnDefinition::new(kind.into(), source, value_type);
    definition.display_order = order;
    definition
}
