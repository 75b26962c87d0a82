//! Tera engine for the surfaces.
//!
//! Embedded templates are keyed by name; a user directory may replace any of
//! them by providing a `.tera` file at the same relative path.
//!
//! | Surface                     | Template                                  |
//! |-----------------------------|-------------------------------------------|
//! | SiteConfiguration           | `surfaces/site_configuration.tera`        |
//! | VisualEditorConfiguration   | `surfaces/visual_editor_configuration.tera` |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use crate::context::SurfaceContext;
use crate::error::RenderError;
use crate::surfaces::Surface;

// ---------------------------------------------------------------------------
// Embedded templates
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("shared/_card.tera", include_str!("templates/_partials/card.tera")),
    (
        "surfaces/site_configuration.tera",
        include_str!("templates/site_configuration.tera"),
    ),
    (
        "surfaces/visual_editor_configuration.tera",
        include_str!("templates/visual_editor_configuration.tera"),
    ),
];

// ---------------------------------------------------------------------------
// Template loading
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() && path.extension().and_then(|s| s.to_str()) == Some("tera") {
            out.push(path);
        }
    }
    Ok(())
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;

    let mut templates = Vec::with_capacity(files.len());
    for path in files {
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((normalize_template_name(rel), contents.replace("\r\n", "\n")));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = TPLS
        .iter()
        .map(|(name, content)| (normalize_template_name(Path::new(name)), (*content).to_string()))
        .collect();
    if let Some(dir) = user_template_dir {
        templates.extend(load_user_templates(dir)?);
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(TemplateEngine {
            tera: build_tera(user_template_dir)?,
        })
    }

    pub fn render(&self, ctx: &SurfaceContext) -> Result<String, RenderError> {
        let surface: Surface = ctx.surface.parse()?;
        let tera_ctx = ctx.to_tera_context()?;
        let rendered = self.tera.render(surface.template_name(), &tera_ctx)?;
        Ok(rendered.trim_end().to_string())
    }
}

// ---------------------------------------------------------------------------
// SurfaceRenderer
// ---------------------------------------------------------------------------

/// Embedded templates only. Build once and reuse.
pub struct SurfaceRenderer {
    engine: TemplateEngine,
}

impl SurfaceRenderer {
    pub fn new() -> Result<Self, RenderError> {
        Ok(SurfaceRenderer {
            engine: TemplateEngine::new(None)?,
        })
    }

    /// Embedded templates, overridden by any found under `dir`.
    pub fn with_overrides(dir: &Path) -> Result<Self, RenderError> {
        Ok(SurfaceRenderer {
            engine: TemplateEngine::new(Some(dir))?,
        })
    }

    pub fn render(&self, ctx: &SurfaceContext) -> Result<String, RenderError> {
        self.engine.render(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ButtonVariant, CardCtx};

    fn site_ctx(cards: Vec<CardCtx>) -> SurfaceContext {
        SurfaceContext {
            surface: Surface::SiteConfiguration.key().to_string(),
            heading: "Site configuration".into(),
            loading: false,
            cards,
        }
    }

    #[test]
    fn embedded_templates_parse() {
        SurfaceRenderer::new().expect("embedded templates should compile");
    }

    #[test]
    fn card_renders_title_body_and_button() {
        let renderer = SurfaceRenderer::new().unwrap();
        let out = renderer
            .render(&site_ctx(vec![CardCtx::titled("Disable for site").with_button(
                "Disable",
                ButtonVariant::Danger,
                "buildEventHandler.disable",
            )]))
            .unwrap();
        assert!(out.contains("== Site configuration =="), "{out}");
        assert!(out.contains("+-- Disable for site"), "{out}");
        assert!(out.contains("[ Disable ] (danger) -> buildEventHandler.disable"), "{out}");
    }

    #[test]
    fn loading_hides_cards() {
        let renderer = SurfaceRenderer::new().unwrap();
        let mut ctx = site_ctx(vec![CardCtx::titled("Enable for site")]);
        ctx.loading = true;
        let out = renderer.render(&ctx).unwrap();
        assert!(out.contains("(loading...)"));
        assert!(!out.contains("Enable for site"));
    }

    #[test]
    fn unknown_surface_is_an_error() {
        let renderer = SurfaceRenderer::new().unwrap();
        let mut ctx = site_ctx(vec![]);
        ctx.surface = "dashboard".into();
        assert!(matches!(
            renderer.render(&ctx),
            Err(RenderError::UnknownSurface(_))
        ));
    }

    #[test]
    fn no_crlf_in_output() {
        let renderer = SurfaceRenderer::new().unwrap();
        let out = renderer
            .render(&site_ctx(vec![CardCtx::titled("x").with_body("y")]))
            .unwrap();
        assert!(!out.contains('\r'));
    }
}
