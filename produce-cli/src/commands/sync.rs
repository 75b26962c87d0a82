//! `produce sync [--initial] [--json]`

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use produce_core::{manifest, LocalPlatform};
use produce_server::registrations;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Treat this run as the first sync of an empty store.
    #[arg(long)]
    pub initial: bool,

    /// Emit the sync report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct UpsertRow {
    #[tabled(rename = "model")]
    model: String,
    #[tabled(rename = "id")]
    id: String,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let manifest = manifest::load_at(&home).context("failed to load extension manifest")?;
        let store = LocalPlatform::at(&home);

        let report = registrations(manifest)
            .sync(&store, self.initial, Utc::now())
            .context("sync failed")?;

        if self.json {
            return super::print_json(&report);
        }

        let mode = serde_json::to_value(report.mode)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        println!(
            "{} {} sync upserted {} record(s)",
            "✓".green(),
            mode,
            report.upserted.len()
        );
        let rows: Vec<UpsertRow> = report
            .upserted
            .iter()
            .map(|u| UpsertRow {
                model: u.model.clone(),
                id: u.id.to_string(),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
        Ok(())
    }
}
