use askama::Template;
use metrics::counter;
use notifier_core::{RenderError, RenderedView, TemplateRenderer, View};
use tracing::debug;

use crate::router::NOTIFICATION_STREAM_PATH;

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Template)]
#[template(path = "welcome.html")]
struct WelcomeTemplate<'a> {
    app_name: &'a str,
    version: &'a str,
    stream_path: &'a str,
}

/// Renders views from the templates compiled into the binary.
#[derive(Debug, Clone)]
pub struct AskamaRenderer {
    app_name: String,
}

impl AskamaRenderer {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl TemplateRenderer for AskamaRenderer {
    fn render(&self, view: &View) -> Result<RenderedView, RenderError> {
        let body = match view.name() {
            "welcome" => WelcomeTemplate {
                app_name: &self.app_name,
                version: BUILD_VERSION,
                stream_path: NOTIFICATION_STREAM_PATH,
            }
            .render()
            .map_err(|err| RenderError::Template(err.to_string()))?,
            other => return Err(RenderError::NotFound(other.to_string())),
        };

        counter!("views_rendered_total", "view" => view.name().to_string()).increment(1);
        debug!(stage = "view", view = %view, bytes = body.len(), "view rendered");
        Ok(RenderedView::html(body))
    }
}
