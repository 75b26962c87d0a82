//! # produce-ui
//!
//! The extension's two configuration surfaces, rendered through Tera.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use produce_core::types::{RequestContext, SiteId, TeamId};
//! use produce_core::LocalPlatform;
//! use produce_server::{AppRouter, InProcessTransport};
//! use produce_ui::{SiteConfigurationPanel, SurfaceRenderer};
//!
//! fn show(home: &std::path::Path) {
//!     let router = AppRouter::new(Arc::new(LocalPlatform::at(home)));
//!     let transport = InProcessTransport::new(Arc::new(router));
//!     let ctx = RequestContext::new(Some(TeamId::from("t")), Some(SiteId::from("s")));
//!
//!     let mut panel = SiteConfigurationPanel::new(&transport, ctx, "produce");
//!     panel.load();
//!     if let Ok(renderer) = SurfaceRenderer::new() {
//!         if let Ok(text) = renderer.render(&panel.view()) {
//!             println!("{text}");
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod surfaces;

pub use context::{ButtonCtx, ButtonVariant, CardCtx, SurfaceContext};
pub use engine::{SurfaceRenderer, TemplateEngine};
pub use error::RenderError;
pub use surfaces::{PanelStatus, SiteConfigurationPanel, Surface, VisualEditorConfiguration};
