use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use requisition::{Column, Config, Requisition, RequisitionDocument};

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "List the columns of a requisition's template")]
pub struct Columns {
    /// Path to the requisition document
    file: PathBuf,

    /// Show the columns used for non-full supply products
    #[arg(long)]
    non_full_supply: bool,
}

impl Columns {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let document = RequisitionDocument::load(&self.file)
            .with_context(|| format!("failed to load {}", self.file.display()))?;
        let requisition = Requisition::from_document(document)?;
        let template = requisition.template();

        let columns = if config.show_hidden_columns {
            let reduced = self.non_full_supply || template.is_emergency();
            let mut columns: Vec<&Column> = template
                .all_columns()
                .filter(|column| !reduced || !column.is_full_supply_only())
                .collect();
            columns.sort_by_key(|column| (column.display_order(), column.name().to_string()));
            columns
        } else {
            template.columns(self.non_full_supply)
        };

        println!(
            "{:<32} {:<15} {:<9} {:<8} {}",
            "COLUMN", "SOURCE", "TYPE", "FLAGS", "DEPENDS ON"
        );

        for column in columns {
            let flags = format!(
                "{}{}{}",
                if column.is_displayed() { 'd' } else { '-' },
                if column.is_required() { 'r' } else { '-' },
                if column.is_full_supply_only() { 'f' } else { '-' },
            );
            let dependencies: Vec<_> = column
                .dependencies()
                .filter(|dependency| template.column(dependency).is_some())
                .collect();

            let line = format!(
                "{:<32} {:<15} {:<9} {:<8} {}",
                column.name(),
                format!("{:?}", column.source()),
                format!("{:?}", column.value_type()),
                flags,
                dependencies.join(", ")
            );

            if column.is_displayed() {
                println!("{line}");
            } else {
                println!("{}", line.dim());
            }
        }

        if template.has_skip_column() {
            let behaviour = if template.hide_skipped_line_items() {
                "hidden"
            } else {
                "disabled"
            };
            println!("\n{}", format!("Skipped line items are {behaviour}").dim());
        }

        Ok(())
    }
}
