use std::fmt;

use thiserror::Error;

/// Opaque reference to a named view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct View {
    name: String,
}

impl View {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Body and content type produced by a [`TemplateRenderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedView {
    pub content_type: &'static str,
    pub body: String,
}

impl RenderedView {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            content_type: "text/html; charset=utf-8",
            body: body.into(),
        }
    }
}

/// Capability that turns a [`View`] reference into response content.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, view: &View) -> Result<RenderedView, RenderError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("view not found: {0}")]
    NotFound(String),
    #[error("failed to render template: {0}")]
    Template(String),
}
