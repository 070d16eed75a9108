use std::sync::Arc;

use crate::event::{EventPublisher, Notification, PublishError};
use crate::view::View;

const INDEX_PAYLOAD: &str = "test";
const FETCH_VIEW: &str = "welcome";

/// Request handler for the `server` actions.
///
/// Holds no per-request state; every call builds its values from constants
/// and hands them off immediately.
#[derive(Clone)]
pub struct ServerController {
    publisher: Arc<dyn EventPublisher>,
}

impl ServerController {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    /// Publishes a single `Notifications` event with the `"test"` payload.
    pub fn index(&self) -> Result<(), PublishError> {
        self.publisher.publish(Notification::new(INDEX_PAYLOAD))
    }

    /// Returns the view the host should render.
    pub fn fetch(&self) -> View {
        View::named(FETCH_VIEW)
    }
}
