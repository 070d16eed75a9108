//! Domain layer shared by the HTTP application.
//!
//! The controller talks to its collaborators only through the
//! [`EventPublisher`] and [`TemplateRenderer`] capabilities so the host
//! decides how events are delivered and views are rendered.

pub mod controller;
pub mod event;
pub mod view;

pub use controller::ServerController;
pub use event::{EventPublisher, Notification, PublishError, NOTIFICATIONS_KIND};
pub use view::{RenderError, RenderedView, TemplateRenderer, View};
