//! `produce init`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use produce_core::manifest::{self, manifest_path_at};
use produce_server::registrations;

#[derive(Args, Debug)]
pub struct InitArgs {}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let (manifest, created) =
            manifest::init_at(&home).context("failed to write extension manifest")?;
        let path = manifest_path_at(&home);

        if created {
            println!("{} Wrote {}", "✓".green(), path.display());
        } else {
            println!("{} Manifest already exists: {}", "·".dimmed(), path.display());
        }

        let extension = registrations(manifest);
        println!("  extension:      {}", extension.manifest().name);
        println!("  document types: {}", extension.document_types().join(", "));
        println!("  flag key:       {}", extension.manifest().flag_key);
        for bundle in extension.function_bundles() {
            println!(
                "  {:?} functions: {} (prefix {})",
                bundle.kind,
                bundle.directory.display(),
                bundle.prefix
            );
        }
        Ok(())
    }
}
