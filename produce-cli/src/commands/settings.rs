//! `produce settings get|set`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde_json::{Map, Value};

use produce_server::Procedure;

use super::SiteArgs;

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the team's validated settings.
    Get(GetArgs),
    /// Validate and save team settings (shallow merge over what is stored).
    Set(SetArgs),
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub target: SiteArgs,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    #[command(flatten)]
    pub target: SiteArgs,

    /// Full settings object as JSON; overrides the individual flags.
    #[arg(long, value_name = "JSON")]
    pub input: Option<String>,

    #[arg(long = "string", value_name = "TEXT")]
    pub example_string: Option<String>,

    #[arg(long = "secret", value_name = "TEXT")]
    pub example_secret: Option<String>,

    #[arg(long = "boolean", value_name = "BOOL")]
    pub example_boolean: Option<bool>,

    #[arg(long = "number", value_name = "NUMBER")]
    pub example_number: Option<f64>,
}

impl SetArgs {
    /// Only the given keys; the router reports anything missing.
    fn input(&self) -> Result<Value> {
        if let Some(raw) = &self.input {
            return serde_json::from_str(raw).context("--input is not valid JSON");
        }
        let mut obj = Map::new();
        if let Some(v) = &self.example_string {
            obj.insert("exampleString".into(), Value::from(v.as_str()));
        }
        if let Some(v) = &self.example_secret {
            obj.insert("exampleSecret".into(), Value::from(v.as_str()));
        }
        if let Some(v) = self.example_boolean {
            obj.insert("exampleBoolean".into(), Value::from(v));
        }
        if let Some(v) = self.example_number {
            obj.insert("exampleNumber".into(), Value::from(v));
        }
        Ok(Value::Object(obj))
    }
}

pub fn run(command: SettingsCommand) -> Result<()> {
    match command {
        SettingsCommand::Get(args) => {
            let transport = args.target.transport()?;
            let data = super::call(
                transport.as_ref(),
                Procedure::TeamSettingsQuery.path(),
                args.target.context(),
                Value::Null,
            )?;
            if data.is_null() {
                println!("{} no valid team settings stored", "·".dimmed());
                return Ok(());
            }
            super::print_json(&data)
        }
        SettingsCommand::Set(args) => {
            let input = args.input()?;
            let transport = args.target.transport()?;
            super::call(
                transport.as_ref(),
                Procedure::TeamSettingsMutate.path(),
                args.target.context(),
                input,
            )?;
            println!("{} Team settings saved", "✓".green());
            Ok(())
        }
    }
}
