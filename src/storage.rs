/// JSON serialization for requisitions.
pub mod json;

pub use json::{LineItemDocument, LoadError, RequisitionDocument, TemplateDocument};
