use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::{
    ColumnDefinition, FacilityType, Header, LineItem, LineItemData, LineItemError, Orderable,
    Requisition, StockAdjustment, Template, TemplateError, Value,
};

/// A requisition as exchanged with the server, in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequisitionDocument {
    /// Requisition-level data.
    #[serde(flatten)]
    pub header: Header,
    /// The column layout.
    pub template: TemplateDocument,
    /// One entry per product.
    #[serde(default)]
    pub requisition_line_items: Vec<LineItemDocument>,
    /// Full supply products that may be added.
    #[serde(default)]
    pub available_full_supply_products: Vec<Orderable>,
    /// Non-full supply products that may be added.
    #[serde(default)]
    pub available_non_full_supply_products: Vec<Orderable>,
}

/// A template as exchanged with the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDocument {
    /// Stable identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Column definitions keyed by column name.
    pub columns_map: BTreeMap<String, ColumnDefinition>,
    /// Whether stock columns come from the stock ledger.
    #[serde(default)]
    pub populate_stock_on_hand_from_stock_cards: bool,
    /// Facility types the template is assigned to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facility_types: Vec<FacilityType>,
}

/// A line item as exchanged with the server.
///
/// Field values sit at the top level of the object next to the product, keyed
/// by column name. Validation errors are written under `$errors` as message
/// keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemDocument {
    /// The product this row is for.
    pub orderable: Orderable,
    /// Recorded losses and adjustments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stock_adjustments: Vec<StockAdjustment>,
    /// Adjusted consumption of previous periods.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_adjusted_consumptions: Vec<i64>,
    /// Number of periods of stock the facility should hold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_periods_of_stock: Option<Decimal>,
    /// Validation message keys by column name.
    #[serde(default, rename = "$errors", skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
    /// Field values by column name.
    #[serde(flatten)]
    pub values: BTreeMap<String, serde_json::Value>,
}

impl LineItemDocument {
    /// Converts the document into line item data.
    ///
    /// Values that are `null` or not scalars are dropped.
    #[must_use]
    pub fn into_data(self) -> LineItemData {
        let values = self
            .values
            .into_iter()
            .filter_map(|(name, value)| {
                serde_json::from_value::<Value>(value)
                    .ok()
                    .map(|value| (name, value))
            })
            .collect();

        LineItemData {
            orderable: self.orderable,
            values,
            stock_adjustments: self.stock_adjustments,
            previous_adjusted_consumptions: self.previous_adjusted_consumptions,
            max_periods_of_stock: self.max_periods_of_stock,
        }
    }
}

impl From<&LineItem> for LineItemDocument {
    fn from(line_item: &LineItem) -> Self {
        Self {
            orderable: line_item.orderable().clone(),
            stock_adjustments: line_item.stock_adjustments().to_vec(),
            previous_adjusted_consumptions: line_item.previous_adjusted_consumptions().to_vec(),
            max_periods_of_stock: line_item.max_periods_of_stock(),
            errors: line_item
                .errors()
                .iter()
                .map(|(name, error)| (name.clone(), error.message_key().to_string()))
                .collect(),
            values: line_item
                .values()
                .iter()
                .filter_map(|(name, value)| {
                    serde_json::to_value(value)
                        .ok()
                        .map(|value| (name.clone(), value))
                })
                .collect(),
        }
    }
}

impl TemplateDocument {
    /// Builds the template for a requisition with the given header.
    ///
    /// # Errors
    ///
    /// Returns an error if two definitions share a name or the calculated
    /// columns depend on each other in a loop.
    pub fn into_template(self, header: &Header) -> Result<Template, TemplateError> {
        let mut template = Template::new(
            self.columns_map.into_values(),
            header.status,
            header.emergency,
        )?
        .with_stock_cards(self.populate_stock_on_hand_from_stock_cards)
        .with_facility_types(self.facility_types);

        if let Some(id) = self.id {
            template = template.with_id(id);
        }

        Ok(template)
    }
}

impl From<&Template> for TemplateDocument {
    fn from(template: &Template) -> Self {
        Self {
            id: template.id(),
            columns_map: template
                .all_columns()
                .map(|column| (column.name().to_string(), column.definition().clone()))
                .collect(),
            populate_stock_on_hand_from_stock_cards: template
                .populates_stock_on_hand_from_stock_cards(),
            facility_types: template.facility_types().to_vec(),
        }
    }
}

impl RequisitionDocument {
    /// Parses a document from a reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid requisition document.
    pub fn read<R: io::Read>(reader: R) -> Result<Self, LoadError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Loads a document from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|io_error| match io_error.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound,
            _ => LoadError::Io(io_error),
        })?;

        Self::read(BufReader::new(file))
    }

    /// Writes the document to a file as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), LoadError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl Requisition {
    /// Builds a requisition from a document, computing every line item.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is invalid or a line item's product
    /// is not part of the requisition's program.
    pub fn from_document(document: RequisitionDocument) -> Result<Self, LoadError> {
        let template = document.template.into_template(&document.header)?;

        let requisition = Self::new(
            document.header,
            template,
            document
                .requisition_line_items
                .into_iter()
                .map(LineItemDocument::into_data),
        )?
        .with_available_products(
            document
                .available_full_supply_products
                .into_iter()
                .chain(document.available_non_full_supply_products),
        );

        debug!(id = %requisition.id(), "loaded requisition");

        Ok(requisition)
    }
}

impl TryFrom<RequisitionDocument> for Requisition {
    type Error = LoadError;

    fn try_from(document: RequisitionDocument) -> Result<Self, Self::Error> {
        Self::from_document(document)
    }
}

impl From<&Requisition> for RequisitionDocument {
    fn from(requisition: &Requisition) -> Self {
        Self {
            header: requisition.header().clone(),
            template: requisition.template().into(),
            requisition_line_items: requisition
                .line_items()
                .iter()
                .map(LineItemDocument::from)
                .collect(),
            available_full_supply_products: requisition.available_full_supply_products().to_vec(),
            available_non_full_supply_products: requisition
                .available_non_full_supply_products()
                .to_vec(),
        }
    }
}

/// Errors that can occur when loading a requisition document.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The document file was not found.
    #[error("requisition document not found")]
    NotFound,
    /// An I/O error occurred.
    #[error("failed to access requisition document")]
    Io(#[from] io::Error),
    /// The document is not valid JSON or has the wrong shape.
    #[error("failed to parse requisition document")]
    Json(#[from] serde_json::Error),
    /// The template is invalid.
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// A line item could not be built.
    #[error(transparent)]
    LineItem(#[from] LineItemError),
}
