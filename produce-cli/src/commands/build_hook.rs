//! `produce build-hook status|enable|disable`

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use serde_json::Value;

use produce_server::{Acknowledgement, Procedure, StatusOutput};

use super::SiteArgs;

#[derive(Subcommand, Debug)]
pub enum BuildHookCommand {
    /// Whether the build event handler is enabled for the site.
    Status(SiteArgs),
    /// Set the flag variable on the site.
    Enable(SiteArgs),
    /// Remove the flag variable from the site.
    Disable(SiteArgs),
}

pub fn run(command: BuildHookCommand) -> Result<()> {
    let (procedure, target) = match command {
        BuildHookCommand::Status(t) => (Procedure::BuildEventHandlerStatus, t),
        BuildHookCommand::Enable(t) => (Procedure::BuildEventHandlerEnable, t),
        BuildHookCommand::Disable(t) => (Procedure::BuildEventHandlerDisable, t),
    };

    let transport = target.transport()?;
    let data = super::call(transport.as_ref(), procedure.path(), target.context(), Value::Null)?;

    if procedure == Procedure::BuildEventHandlerStatus {
        let status: StatusOutput =
            serde_json::from_value(data).context("unexpected status payload")?;
        if status.enabled {
            println!("build event handler: {}", "enabled".green());
        } else {
            println!("build event handler: {}", "disabled".yellow());
        }
    } else {
        let ack: Acknowledgement =
            serde_json::from_value(data).context("unexpected acknowledgement payload")?;
        println!("{} {}", "✓".green(), ack.message);
    }
    Ok(())
}
