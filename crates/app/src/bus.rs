use std::time::Duration;

use axum::response::sse::{Event, KeepAlive};
use metrics::counter;
use notifier_core::{EventPublisher, Notification, PublishError};
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{debug, warn};

const EVENT_NAME: &str = "notifications";

/// In-process event bus fanning notifications out to every live subscriber.
#[derive(Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventPublisher for NotificationBus {
    fn publish(&self, event: Notification) -> Result<(), PublishError> {
        counter!("notifications_published_total").increment(1);
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(stage = "bus", receivers, "notification published");
            }
            // No listeners is a normal state for fire-and-forget delivery.
            Err(broadcast::error::SendError(event)) => {
                debug!(stage = "bus", id = %event.id, "notification published without listeners");
            }
        }
        Ok(())
    }
}

fn to_sse_event(notification: &Notification) -> Result<Event, serde_json::Error> {
    let data = serde_json::to_string(notification)?;
    Ok(Event::default()
        .event(EVENT_NAME)
        .id(notification.id.to_string())
        .data(data))
}

/// Yields every notification published after subscription.
///
/// Lagged subscribers skip the events they missed and keep receiving.
fn live_notifications(bus: &NotificationBus) -> impl Stream<Item = Notification> + Send + 'static {
    BroadcastStream::new(bus.subscribe()).filter_map(|result| match result {
        Ok(notification) => Some(notification),
        Err(err) => {
            warn!(stage = "bus", error = %err, "notification stream lagged");
            None
        }
    })
}

/// Streams live notifications as SSE events named `notifications`.
pub fn notification_stream(
    bus: &NotificationBus,
) -> impl Stream<Item = Result<Event, serde_json::Error>> + Send + 'static {
    live_notifications(bus).map(|notification| to_sse_event(&notification))
}

pub fn stream_keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(Duration::from_secs(20))
        .text("heartbeat")
}
