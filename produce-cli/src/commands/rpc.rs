//! `produce rpc <path>`: raw access to any router procedure.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use super::SiteArgs;

#[derive(Args, Debug)]
pub struct RpcArgs {
    /// Procedure path, e.g. `buildEventHandler.status`.
    pub path: String,

    /// Procedure input as JSON.
    #[arg(long, value_name = "JSON")]
    pub input: Option<String>,

    #[command(flatten)]
    pub target: SiteArgs,
}

impl RpcArgs {
    pub fn run(self) -> Result<()> {
        let input = match &self.input {
            Some(raw) => serde_json::from_str(raw).context("--input is not valid JSON")?,
            None => Value::Null,
        };
        let transport = self.target.transport()?;
        let data = super::call(transport.as_ref(), &self.path, self.target.context(), input)?;
        super::print_json(&data)
    }
}
