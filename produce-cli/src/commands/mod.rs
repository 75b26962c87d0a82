//! Subcommands and the pieces they share.

pub mod build_hook;
pub mod hooks;
pub mod init;
pub mod models;
pub mod rpc;
pub mod server;
pub mod settings;
pub mod sync;
pub mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use serde_json::Value;

use produce_core::types::{RequestContext, SiteId, TeamId};
use produce_core::{manifest, LocalPlatform};
use produce_server::{AppRouter, InProcessTransport, RpcRequest, RpcTransport, SocketTransport};

pub(crate) fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// Team/site context plus where to send the call.
#[derive(Args, Debug, Clone, Default)]
pub struct SiteArgs {
    /// Team (account) id.
    #[arg(long)]
    pub team: Option<String>,

    /// Site id.
    #[arg(long)]
    pub site: Option<String>,

    /// Send the call to a running `produce server` instead of the local store.
    #[arg(long)]
    pub via_server: bool,
}

impl SiteArgs {
    pub fn context(&self) -> RequestContext {
        RequestContext::new(
            self.team.clone().map(TeamId::from),
            self.site.clone().map(SiteId::from),
        )
    }

    pub fn transport(&self) -> Result<Box<dyn RpcTransport>> {
        let home = home_dir()?;
        if self.via_server {
            return Ok(Box::new(SocketTransport::new(home)));
        }
        Ok(Box::new(InProcessTransport::new(Arc::new(local_router(&home)?))))
    }
}

/// Router over `~/.produce`, gated on the manifest's flag key.
pub(crate) fn local_router(home: &std::path::Path) -> Result<AppRouter> {
    let manifest = manifest::load_at(home).context("failed to load extension manifest")?;
    Ok(AppRouter::new(Arc::new(LocalPlatform::at(home))).with_flag_key(manifest.flag_key))
}

/// Call `path` and unwrap the response into its data.
pub(crate) fn call(
    transport: &dyn RpcTransport,
    path: &str,
    context: RequestContext,
    input: Value,
) -> Result<Value> {
    let request = RpcRequest::new(path, context).with_input(input);
    transport
        .call(&request)
        .and_then(|response| response.into_data())
        .with_context(|| format!("{path} failed"))
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to render JSON")?
    );
    Ok(())
}
