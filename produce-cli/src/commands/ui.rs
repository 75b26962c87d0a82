//! `produce ui site|visual-editor`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use produce_core::manifest;
use produce_ui::{SiteConfigurationPanel, SurfaceContext, SurfaceRenderer, VisualEditorConfiguration};

use super::SiteArgs;

#[derive(Subcommand, Debug)]
pub enum UiCommand {
    /// Site configuration surface (build event handler toggle).
    Site(SiteUiArgs),
    /// Visual editor configuration surface.
    VisualEditor(TemplateArgs),
}

#[derive(Args, Debug, Default)]
pub struct TemplateArgs {
    /// Directory of `.tera` files overriding the embedded templates.
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SiteUiArgs {
    #[command(flatten)]
    pub target: SiteArgs,

    #[command(flatten)]
    pub templates: TemplateArgs,

    /// Press the panel's button once before rendering.
    #[arg(long)]
    pub toggle: bool,
}

pub fn run(command: UiCommand) -> Result<()> {
    match command {
        UiCommand::Site(args) => {
            let home = super::home_dir()?;
            let name = manifest::load_at(&home)
                .context("failed to load extension manifest")?
                .name;
            let transport = args.target.transport()?;

            let mut panel =
                SiteConfigurationPanel::new(transport.as_ref(), args.target.context(), name);
            panel.load();
            if args.toggle {
                panel.toggle();
            }
            render(&args.templates, &panel.view())
        }
        UiCommand::VisualEditor(templates) => {
            render(&templates, &VisualEditorConfiguration.view())
        }
    }
}

fn render(templates: &TemplateArgs, view: &SurfaceContext) -> Result<()> {
    let renderer = match &templates.templates {
        Some(dir) => SurfaceRenderer::with_overrides(dir),
        None => SurfaceRenderer::new(),
    }
    .context("failed to load surface templates")?;
    println!("{}", renderer.render(view).context("failed to render surface")?);
    Ok(())
}
