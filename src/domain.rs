//! The requisition computation and validation engine.
//!
//! This module contains the template and column model, line items and their
//! recalculation, field validation, and the status rules that gate changes to
//! a requisition's line items.

mod adjustment;
pub use adjustment::{ReasonType, StockAdjustment, StockAdjustmentReason};

/// Formulas for calculated columns.
pub mod calculation;

mod column;
pub use column::{
    Column, ColumnDefinition, ColumnName, ColumnOption, ColumnSource, EmptyColumnNameError,
    OptionName, ValueType,
};

mod column_kind;
pub use column_kind::{ColumnKind, UnknownColumnError};

mod config;
pub use config::Config;

mod line_item;
pub use line_item::{LineItem, LineItemData, LineItemError};

mod orderable;
pub use orderable::{Orderable, ProgramOrderable};

mod requisition;
pub use requisition::{Context, Header, ProcessingPeriod, Program, Requisition};

/// Rights of the acting user.
pub mod rights;
pub use rights::{GrantedRights, Right, RightsProvider};

mod status;
pub use status::{RequisitionStatus, can_add_line_item, can_delete_line_item};

mod template;
pub use template::{FacilityType, Template, TemplateError};

/// Field validation rules.
pub mod validation;
pub use validation::ValidationError;

/// Field values.
pub mod value;
pub use value::Value;

#[cfg(test)]
mod test_support;
