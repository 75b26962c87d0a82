//! `produce hooks run|inject`
//!
//! With `--team` and `--site` the flag is read from the site's stored
//! variables; otherwise from this process's environment.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use produce_core::types::{SiteId, TeamId};
use produce_core::{manifest, FlagLookup, LocalPlatform, ProcessEnv};
use produce_server::{init_tracing, registrations, BuildEvent, Extension, HookOutcome, SiteFlags};

#[derive(Subcommand, Debug)]
pub enum HooksCommand {
    /// Run every handler registered for a build event.
    Run(RunArgs),
    /// List the function bundles that would be injected.
    Inject(FlagSource),
}

#[derive(Args, Debug, Default)]
pub struct FlagSource {
    #[arg(long, requires = "site")]
    pub team: Option<String>,

    #[arg(long, requires = "team")]
    pub site: Option<String>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// onPreBuild, onBuild, onPostBuild, onSuccess, onError or onEnd.
    pub event: BuildEvent,

    #[command(flatten)]
    pub flags: FlagSource,
}

pub fn run(command: HooksCommand) -> Result<()> {
    let home = super::home_dir()?;
    let extension =
        registrations(manifest::load_at(&home).context("failed to load extension manifest")?);
    let store = LocalPlatform::at(&home);

    match command {
        HooksCommand::Run(args) => {
            init_tracing();
            with_flags(&store, &args.flags, |flags| run_event(&extension, args.event, flags))
        }
        HooksCommand::Inject(source) => with_flags(&store, &source, |flags| {
            list_injected(&extension, flags);
            Ok(())
        }),
    }
}

fn with_flags<F>(store: &LocalPlatform, source: &FlagSource, f: F) -> Result<()>
where
    F: FnOnce(&dyn FlagLookup) -> Result<()>,
{
    match (&source.team, &source.site) {
        (Some(team), Some(site)) => {
            let flags = SiteFlags::new(store, TeamId::from(team.as_str()), SiteId::from(site.as_str()));
            f(&flags)
        }
        _ => f(&ProcessEnv),
    }
}

fn run_event(extension: &Extension, event: BuildEvent, flags: &dyn FlagLookup) -> Result<()> {
    let outcomes = extension.run_build_event(event, flags);
    if outcomes.is_empty() {
        println!("{} no handlers registered for {event}", "·".dimmed());
        return Ok(());
    }
    for (i, outcome) in outcomes.iter().enumerate() {
        let label = match outcome {
            HookOutcome::Completed => "completed".green(),
            HookOutcome::Skipped => "skipped (flag not set)".yellow(),
        };
        println!("{event} handler #{}: {label}", i + 1);
    }
    Ok(())
}

fn list_injected(extension: &Extension, flags: &dyn FlagLookup) {
    let bundles = extension.functions_to_inject(flags);
    if bundles.is_empty() {
        println!("{} no function bundles injected (flag not set)", "·".dimmed());
        return;
    }
    for bundle in bundles {
        println!(
            "{} {:?}: {} (prefix {})",
            "✓".green(),
            bundle.kind,
            bundle.directory.display(),
            bundle.prefix
        );
    }
}
