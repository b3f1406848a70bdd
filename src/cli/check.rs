use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use requisition::{Requisition, RequisitionDocument, ValidationError};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Recompute and validate every line item of a requisition")]
pub struct Check {
    /// Path to the requisition document
    file: PathBuf,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress all output except errors
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
    Summary,
}

#[derive(Debug)]
struct Issue {
    product: String,
    column: String,
    error: ValidationError,
}

impl Check {
    #[instrument(level = "debug", skip(self), fields(file = %self.file.display()))]
    pub fn run(self) -> anyhow::Result<()> {
        let document = RequisitionDocument::load(&self.file)
            .with_context(|| format!("failed to load {}", self.file.display()))?;
        let mut requisition = Requisition::from_document(document)?;

        let valid = requisition.validate();
        let issues = collect_issues(&requisition);

        match self.output {
            OutputFormat::Table => self.output_table(&requisition, &issues),
            OutputFormat::Json => output_json(&requisition, &issues)?,
            OutputFormat::Summary => println!("issues={}", issues.len()),
        }

        if !valid {
            std::process::exit(2);
        }

        Ok(())
    }

    fn output_table(&self, requisition: &Requisition, issues: &[Issue]) {
        if self.quiet {
            return;
        }

        println!(
            "Checking requisition {} ({}, {} line items)\n",
            requisition.id(),
            requisition.status(),
            requisition.line_items().len()
        );

        for line_item in requisition.line_items() {
            let product = &line_item.orderable().product_code;
            let name = &line_item.orderable().full_product_name;

            if line_item.errors().is_empty() {
                println!("{}", format!("✓ {product:<10} {name}").success());
                continue;
            }

            println!("{}", format!("✗ {product:<10} {name}").warning());
            for (column, error) in line_item.errors() {
                println!(
                    "    {column}: {error} {}",
                    format!("({})", error.message_key()).dim()
                );
            }
        }

        let invalid = requisition
            .line_items()
            .iter()
            .filter(|line_item| !line_item.errors().is_empty())
            .count();

        if issues.is_empty() {
            println!("\n{}", "All line items are valid".success());
        } else {
            println!(
                "\n{}",
                format!(
                    "Summary: {invalid} of {} line items invalid, {} issues",
                    requisition.line_items().len(),
                    issues.len()
                )
                .error()
            );
        }
    }
}

fn collect_issues(requisition: &Requisition) -> Vec<Issue> {
    requisition
        .line_items()
        .iter()
        .flat_map(|line_item| {
            line_item.errors().iter().map(|(column, error)| Issue {
                product: line_item.orderable().product_code.clone(),
                column: column.clone(),
                error: *error,
            })
        })
        .collect()
}

fn output_json(requisition: &Requisition, issues: &[Issue]) -> anyhow::Result<()> {
    use serde_json::json;

    let issues: Vec<_> = issues
        .iter()
        .map(|issue| {
            json!({
                "product": issue.product,
                "column": issue.column,
                "error": issue.error.message_key(),
            })
        })
        .collect();

    let total = issues.len();
    let output = json!({
        "requisition": requisition.id(),
        "status": if total == 0 { "valid" } else { "invalid" },
        "issues": issues,
        "summary": {
            "line_items": requisition.line_items().len(),
            "total_issues": total,
        }
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
