//! Produce: local harness for the extension.
//!
//! # Usage
//!
//! ```text
//! produce init
//! produce sync [--initial] [--json]
//! produce models schema|list <model> [--json]
//! produce settings get|set --team <id> [--via-server]
//! produce build-hook status|enable|disable --team <id> --site <id> [--via-server]
//! produce hooks run <event> [--team <id> --site <id>]
//! produce hooks inject [--team <id> --site <id>]
//! produce ui site --team <id> --site <id> [--toggle] [--templates <dir>]
//! produce ui visual-editor [--templates <dir>]
//! produce server start|stop|status
//! produce rpc <path> [--input <json>] [--team <id>] [--site <id>]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    build_hook::BuildHookCommand, hooks::HooksCommand, init::InitArgs, models::ModelsCommand,
    rpc::RpcArgs, server::ServerCommand, settings::SettingsCommand, sync::SyncArgs, ui::UiCommand,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "produce",
    version,
    about = "Run the extension's connector, hooks, settings router and surfaces locally",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the default extension manifest to ~/.produce/extension.yaml.
    Init(InitArgs),

    /// Run one connector sync cycle into the local store.
    Sync(SyncArgs),

    /// Inspect connector models and synced records.
    Models {
        #[command(subcommand)]
        command: ModelsCommand,
    },

    /// Read or write team settings.
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// Check or flip the build event handler flag for a site.
    BuildHook {
        #[command(subcommand)]
        command: BuildHookCommand,
    },

    /// Invoke registered build event handlers and injection predicates.
    Hooks {
        #[command(subcommand)]
        command: HooksCommand,
    },

    /// Render a configuration surface.
    Ui {
        #[command(subcommand)]
        command: UiCommand,
    },

    /// Manage the settings RPC server.
    Server {
        #[command(subcommand)]
        command: ServerCommand,
    },

    /// Call a router procedure directly.
    Rpc(RpcArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Models { command } => commands::models::run(command),
        Commands::Settings { command } => commands::settings::run(command),
        Commands::BuildHook { command } => commands::build_hook::run(command),
        Commands::Hooks { command } => commands::hooks::run(command),
        Commands::Ui { command } => commands::ui::run(command),
        Commands::Server { command } => commands::server::run(command),
        Commands::Rpc(args) => args.run(),
    }
}
