//! `produce models schema|list`

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde_json::Value;
use tabled::{settings::Style, Table, Tabled};

use produce_connector::{FieldType, ModelDefinition, ModelKind};
use produce_core::{manifest, LocalPlatform, ModelStore};
use produce_server::registrations;

#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Print every declared model and its fields.
    Schema(SchemaArgs),
    /// Print synced records of one document model.
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct SchemaArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Model name, with or without the type prefix (`Post`, `ExamplePost`).
    pub model: String,

    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "model")]
    model: String,
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "field")]
    field: String,
    #[tabled(rename = "type")]
    ty: String,
    #[tabled(rename = "required")]
    required: bool,
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "created")]
    created: String,
    #[tabled(rename = "summary")]
    summary: String,
}

pub fn run(command: ModelsCommand) -> Result<()> {
    let home = super::home_dir()?;
    let extension = registrations(manifest::load_at(&home)?);
    let prefix = extension.manifest().connector.type_prefix.as_str();
    let models = extension.models();

    match command {
        ModelsCommand::Schema(args) => {
            if args.json {
                return super::print_json(&models);
            }
            let rows: Vec<FieldRow> = models.iter().flat_map(|m| field_rows(prefix, m)).collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
        ModelsCommand::List(args) => {
            let model = resolve_document(prefix, models, &args.model)?;
            let records = LocalPlatform::at(&home).list(model.name)?;
            if args.json {
                return super::print_json(&records);
            }
            if records.is_empty() {
                println!(
                    "{} no {} records; run `produce sync --initial` first",
                    "·".dimmed(),
                    model.name
                );
                return Ok(());
            }
            let rows: Vec<RecordRow> = records.iter().map(record_row).collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
    }
    Ok(())
}

fn resolve_document<'a>(
    prefix: &str,
    models: &'a [ModelDefinition],
    name: &str,
) -> Result<&'a ModelDefinition> {
    let bare = name.strip_prefix(prefix).unwrap_or(name);
    let found = models.iter().find(|m| m.name.eq_ignore_ascii_case(bare));
    match found {
        Some(model) if model.kind == ModelKind::Document => Ok(model),
        Some(model) => bail!("'{}' is an embedded object model, not a document", model.name),
        None => bail!("unknown model '{name}'"),
    }
}

fn field_rows(prefix: &str, model: &ModelDefinition) -> Vec<FieldRow> {
    model
        .fields
        .iter()
        .map(|f| {
            let base = match &f.ty {
                FieldType::String => "string".to_string(),
                FieldType::Reference(target) => format!("ref {prefix}{target}"),
                FieldType::Object(target) => format!("{prefix}{target}"),
            };
            FieldRow {
                model: format!("{prefix}{}", model.name),
                kind: format!("{:?}", model.kind).to_lowercase(),
                field: f.name.to_string(),
                ty: if f.list { format!("[{base}]") } else { base },
                required: f.required,
            }
        })
        .collect()
}

fn record_row(record: &Value) -> RecordRow {
    let text = |key: &str| {
        record
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or("-")
            .to_string()
    };
    let summary = record
        .get("name")
        .or_else(|| record.get("title"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    RecordRow {
        id: text("id"),
        status: text("_status"),
        created: text("_createdAt"),
        summary,
    }
}
