//! `produce server start|stop|status`

use anyhow::{Context, Result};
use clap::Subcommand;

use produce_server::paths::socket_path;
use produce_server::{request_status, request_stop, start_blocking, ServerError};

#[derive(Subcommand, Debug)]
pub enum ServerCommand {
    /// Run the RPC server in the foreground.
    Start,
    /// Ask a running server to shut down.
    Stop,
    /// Query a running server.
    Status,
}

pub fn run(command: ServerCommand) -> Result<()> {
    let home = super::home_dir()?;

    match command {
        ServerCommand::Start => {
            start_blocking(&home).context("server exited with error")?;
        }
        ServerCommand::Stop => match request_stop(&home) {
            Ok(()) => println!("server stop requested"),
            Err(ServerError::ServerNotRunning { .. }) => println!("server is not running"),
            Err(err) => return Err(err).context("failed to stop server"),
        },
        ServerCommand::Status => match request_status(&home) {
            Ok(status) => super::print_json(&status)?,
            Err(ServerError::ServerNotRunning { .. }) => {
                super::print_json(&serde_json::json!({
                    "running": false,
                    "socket": socket_path(&home).display().to_string(),
                }))?;
            }
            Err(err) => return Err(err).context("failed to query server status"),
        },
    }

    Ok(())
}
