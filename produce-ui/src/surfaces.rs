//! Site and visual-editor configuration surfaces.
//!
//! Panels talk to the settings router through an [`RpcTransport`], so the
//! same code drives an in-process router or a running server. Failed calls
//! become an error card; nothing here aborts a render.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use produce_core::types::RequestContext;
use produce_server::{Procedure, RpcRequest, RpcTransport, StatusOutput};

use crate::context::{ButtonVariant, CardCtx, SurfaceContext};
use crate::error::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    SiteConfiguration,
    VisualEditorConfiguration,
}

impl Surface {
    pub fn all() -> &'static [Surface] {
        &[Surface::SiteConfiguration, Surface::VisualEditorConfiguration]
    }

    pub fn key(&self) -> &'static str {
        match self {
            Surface::SiteConfiguration => "site-configuration",
            Surface::VisualEditorConfiguration => "visual-editor-configuration",
        }
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            Surface::SiteConfiguration => "surfaces/site_configuration.tera",
            Surface::VisualEditorConfiguration => "surfaces/visual_editor_configuration.tera",
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Surface {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Surface::all()
            .iter()
            .copied()
            .find(|surface| surface.key() == s)
            .ok_or_else(|| RenderError::UnknownSurface(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// SiteConfiguration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelStatus {
    Loading,
    Loaded { enabled: bool },
    Failed { message: String },
}

pub struct SiteConfigurationPanel<'a> {
    transport: &'a dyn RpcTransport,
    context: RequestContext,
    extension_name: String,
    status: PanelStatus,
}

impl<'a> SiteConfigurationPanel<'a> {
    pub fn new(
        transport: &'a dyn RpcTransport,
        context: RequestContext,
        extension_name: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            context,
            extension_name: extension_name.into(),
            status: PanelStatus::Loading,
        }
    }

    pub fn status(&self) -> &PanelStatus {
        &self.status
    }

    /// Query `buildEventHandler.status` and replace the cached status.
    pub fn load(&mut self) -> &PanelStatus {
        self.status = match self.call(Procedure::BuildEventHandlerStatus) {
            Ok(data) => match serde_json::from_value::<StatusOutput>(data) {
                Ok(out) => PanelStatus::Loaded {
                    enabled: out.enabled,
                },
                Err(err) => PanelStatus::Failed {
                    message: format!("unexpected status payload: {err}"),
                },
            },
            Err(message) => PanelStatus::Failed { message },
        };
        &self.status
    }

    /// Flip the flag, then re-query status. A panel that has not loaded is
    /// loaded first; one that still cannot report a status is left alone.
    pub fn toggle(&mut self) -> &PanelStatus {
        if !matches!(self.status, PanelStatus::Loaded { .. }) {
            self.load();
        }
        let PanelStatus::Loaded { enabled } = self.status else {
            return &self.status;
        };

        let procedure = if enabled {
            Procedure::BuildEventHandlerDisable
        } else {
            Procedure::BuildEventHandlerEnable
        };
        match self.call(procedure) {
            Ok(_) => self.load(),
            Err(message) => {
                self.status = PanelStatus::Failed { message };
                &self.status
            }
        }
    }

    pub fn view(&self) -> SurfaceContext {
        let cards = match &self.status {
            PanelStatus::Loading => Vec::new(),
            PanelStatus::Loaded { enabled: false } => vec![CardCtx::titled("Enable for site")
                .with_button(
                    "Enable",
                    ButtonVariant::Primary,
                    Procedure::BuildEventHandlerEnable.path(),
                )],
            PanelStatus::Loaded { enabled: true } => vec![
                CardCtx::titled("Disable for site").with_button(
                    "Disable",
                    ButtonVariant::Danger,
                    Procedure::BuildEventHandlerDisable.path(),
                ),
                CardCtx::titled(format!("Example Section for {}", self.extension_name))
                    .with_body("This is an example site configuration."),
            ],
            PanelStatus::Failed { message } => vec![CardCtx {
                error: true,
                ..CardCtx::titled("Something went wrong").with_body(message.clone())
            }],
        };

        SurfaceContext {
            surface: Surface::SiteConfiguration.key().to_string(),
            heading: "Site configuration".to_string(),
            loading: self.status == PanelStatus::Loading,
            cards,
        }
    }

    fn call(&self, procedure: Procedure) -> Result<Value, String> {
        let request = RpcRequest::new(procedure.path(), self.context.clone());
        match self.transport.call(&request).and_then(|r| r.into_data()) {
            Ok(data) => Ok(data),
            Err(err) => {
                tracing::warn!(procedure = %procedure, error = %err, "site configuration call failed");
                Err(err.to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// VisualEditorConfiguration
// ---------------------------------------------------------------------------

/// Static placeholder surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisualEditorConfiguration;

impl VisualEditorConfiguration {
    pub fn view(&self) -> SurfaceContext {
        SurfaceContext {
            surface: Surface::VisualEditorConfiguration.key().to_string(),
            heading: "Visual editor configuration".to_string(),
            loading: false,
            cards: vec![CardCtx::titled("My Visual Editor Configuration").with_body("Hello, world!")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use produce_core::types::{SiteId, TeamId};
    use produce_core::MemoryPlatform;
    use produce_server::{AppRouter, InProcessTransport};

    fn transport() -> (Arc<MemoryPlatform>, InProcessTransport) {
        let store = Arc::new(MemoryPlatform::new());
        let router = AppRouter::new(store.clone());
        (store, InProcessTransport::new(Arc::new(router)))
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Some(TeamId::from("t")), Some(SiteId::from("s")))
    }

    #[test]
    fn surface_keys_roundtrip() {
        for s in Surface::all() {
            assert_eq!(s.key().parse::<Surface>().unwrap(), *s);
        }
    }

    #[test]
    fn unloaded_panel_is_loading() {
        let (store, transport) = transport();
        let panel = SiteConfigurationPanel::new(&transport, ctx(), "produce");
        let view = panel.view();
        assert!(view.loading);
        assert!(view.cards.is_empty());
        assert_eq!(store.calls(), 0);
    }

    #[test]
    fn disabled_site_offers_enable() {
        let (_store, transport) = transport();
        let mut panel = SiteConfigurationPanel::new(&transport, ctx(), "produce");
        assert_eq!(panel.load(), &PanelStatus::Loaded { enabled: false });

        let view = panel.view();
        assert_eq!(view.cards.len(), 1);
        let button = view.card("Enable for site").and_then(|c| c.button.clone()).unwrap();
        assert_eq!(button.label, "Enable");
        assert_eq!(button.variant, ButtonVariant::Primary);
    }

    #[test]
    fn toggle_flips_and_requeries() {
        let (_store, transport) = transport();
        let mut panel = SiteConfigurationPanel::new(&transport, ctx(), "produce");

        assert_eq!(panel.toggle(), &PanelStatus::Loaded { enabled: true });
        let view = panel.view();
        assert_eq!(view.cards.len(), 2);
        assert_eq!(
            view.card("Disable for site").and_then(|c| c.button.as_ref()).map(|b| b.variant),
            Some(ButtonVariant::Danger)
        );
        assert!(view.card("Example Section for produce").is_some());

        assert_eq!(panel.toggle(), &PanelStatus::Loaded { enabled: false });
    }

    #[test]
    fn missing_site_renders_error_card() {
        let (_store, transport) = transport();
        let team_only = RequestContext::new(Some(TeamId::from("t")), None);
        let mut panel = SiteConfigurationPanel::new(&transport, team_only, "produce");

        assert!(matches!(panel.load(), PanelStatus::Failed { .. }));
        let view = panel.view();
        assert!(!view.loading);
        assert!(view.cards[0].error);
        assert!(view.cards[0]
            .body
            .as_deref()
            .is_some_and(|b| b.contains("Both teamId and siteId are required")));
    }

    #[test]
    fn failed_toggle_keeps_panel_renderable() {
        let (store, transport) = transport();
        let mut panel = SiteConfigurationPanel::new(&transport, ctx(), "produce");
        panel.load();
        store.set_fail_writes(true);

        assert!(matches!(panel.toggle(), PanelStatus::Failed { .. }));
        assert_eq!(panel.view().cards.len(), 1);
    }

    #[test]
    fn visual_editor_is_static() {
        let view = VisualEditorConfiguration.view();
        let card = view.card("My Visual Editor Configuration").unwrap();
        assert_eq!(card.body.as_deref(), Some("Hello, world!"));
    }
}
