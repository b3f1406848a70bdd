use std::{path::PathBuf, str::FromStr};

use anyhow::{Context as _, anyhow, bail};
use clap::Parser;
use requisition::{
    Config, Requisition, RequisitionDocument, Value,
    domain::ValueType,
    storage::LineItemDocument,
};
use rust_decimal::Decimal;
use tracing::{info, instrument};

#[derive(Debug, Parser)]
#[command(about = "Set a field on a line item and recalculate its dependents")]
pub struct Set {
    /// Path to the requisition document
    file: PathBuf,

    /// Product code of the line item to edit
    #[arg(long)]
    product: String,

    /// Name of the column to set
    #[arg(long)]
    column: String,

    /// The new value. Omit to clear the field.
    #[arg(long)]
    value: Option<String>,

    /// Write the updated requisition back to the file
    #[arg(long)]
    write: bool,

    /// Edit the field even if it is read-only for the configured rights
    #[arg(long)]
    force: bool,
}

impl Set {
    #[instrument(level = "debug", skip(self, config), fields(product = %self.product, column = %self.column))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let document = RequisitionDocument::load(&self.file)
            .with_context(|| format!("failed to load {}", self.file.display()))?;
        let mut requisition = Requisition::from_document(document)?;

        let line_item = requisition
            .line_items()
            .iter()
            .find(|line_item| line_item.orderable().product_code == self.product)
            .ok_or_else(|| anyhow!("no line item for product {}", self.product))?;
        let column = requisition
            .template()
            .column(&self.column)
            .ok_or_else(|| anyhow!("the template has no column '{}'", self.column))?;

        if !self.force && line_item.is_read_only(column, &requisition.context(), config) {
            bail!(
                "'{}' is read-only for product {} while the requisition is {}",
                self.column,
                self.product,
                requisition.status()
            );
        }

        let orderable_id = line_item.orderable().id;
        let value = self
            .value
            .as_deref()
            .map(|raw| parse_value(raw, column.value_type()))
            .transpose()?;

        let recalculated = requisition.update_field(orderable_id, &self.column, value)?;
        info!(?recalculated, "updated field");

        if let Some(line_item) = requisition.line_item(orderable_id) {
            let document = LineItemDocument::from(line_item);
            println!("{}", serde_json::to_string_pretty(&document)?);
        }

        if self.write {
            RequisitionDocument::from(&requisition)
                .save(&self.file)
                .with_context(|| format!("failed to write {}", self.file.display()))?;
        }

        Ok(())
    }
}

fn parse_value(raw: &str, value_type: ValueType) -> anyhow::Result<Value> {
    let value = match value_type {
        ValueType::Numeric => Value::Integer(
            raw.parse()
                .with_context(|| format!("'{raw}' is not a whole number"))?,
        ),
        ValueType::Currency => Value::Decimal(
            Decimal::from_str(raw).with_context(|| format!("'{raw}' is not an amount"))?,
        ),
        ValueType::Boolean => Value::Bool(
            raw.parse()
                .with_context(|| format!("'{raw}' is not true or false"))?,
        ),
        ValueType::Text => Value::Text(raw.to_string()),
    };
    Ok(value)
}
