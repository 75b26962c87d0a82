//! Render payload shared by every surface template.

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonVariant {
    Primary,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonCtx {
    pub label: String,
    pub variant: ButtonVariant,
    /// Procedure the button invokes.
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardCtx {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub button: Option<ButtonCtx>,
    #[serde(default)]
    pub error: bool,
}

impl CardCtx {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: None,
            button: None,
            error: false,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_button(mut self, label: &str, variant: ButtonVariant, action: &str) -> Self {
        self.button = Some(ButtonCtx {
            label: label.to_string(),
            variant,
            action: action.to_string(),
        });
        self
    }
}

/// One surface, ready to render.
///
/// `loading` renders a placeholder instead of the cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceContext {
    /// Template key, e.g. `site-configuration`.
    pub surface: String,
    pub heading: String,
    pub loading: bool,
    pub cards: Vec<CardCtx>,
}

impl SurfaceContext {
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        Ok(tera::Context::from_serialize(self)?)
    }

    pub fn card(&self, title: &str) -> Option<&CardCtx> {
        self.cards.iter().find(|c| c.title == title)
    }
}
