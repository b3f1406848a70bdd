//! Requisition line item engine
//!
//! Computes, propagates and validates the fields of stock requisition line
//! items against a configurable column template.

pub mod domain;
pub use domain::{
    Column, ColumnDefinition, ColumnKind, Config, Context, LineItem, LineItemError, Requisition,
    RequisitionStatus, Template, TemplateError, ValidationError, Value,
};

/// JSON documents describing requisitions.
pub mod storage;
pub use storage::{LoadError, RequisitionDocument};
