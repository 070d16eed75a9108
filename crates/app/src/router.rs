use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{sse::Sse, IntoResponse},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use notifier_core::{ServerController, TemplateRenderer};
use tracing::info;

use crate::bus::{notification_stream, stream_keep_alive, NotificationBus};
use crate::problem::AppError;
use crate::telemetry;

pub const NOTIFICATION_STREAM_PATH: &str = "/notifications/stream";

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    bus: NotificationBus,
    renderer: Arc<dyn TemplateRenderer>,
    controller: ServerController,
}

impl AppState {
    pub fn new(
        metrics: PrometheusHandle,
        bus: NotificationBus,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        let controller = ServerController::new(Arc::new(bus.clone()));
        Self {
            metrics,
            bus,
            renderer,
            controller,
        }
    }

    #[cfg(test)]
    pub fn with_controller(mut self, controller: ServerController) -> Self {
        self.controller = controller;
        self
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    pub fn renderer(&self) -> &dyn TemplateRenderer {
        self.renderer.as_ref()
    }

    pub fn controller(&self) -> &ServerController {
        &self.controller
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/server", get(server_index))
        .route("/server/fetch", get(server_fetch))
        .route(NOTIFICATION_STREAM_PATH, get(notifications))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

async fn server_index(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.controller().index()?;
    info!(stage = "controller", action = "index", "notification dispatched");
    Ok(StatusCode::OK)
}

async fn server_fetch(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let view = state.controller().fetch();
    let rendered = state.renderer().render(&view)?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, rendered.content_type)],
        rendered.body,
    ))
}

async fn notifications(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<axum::response::sse::Event, serde_json::Error>>> {
    let stream = notification_stream(state.bus());
    info!(
        stage = "bus",
        listeners = state.bus().subscriber_count(),
        "notification listener attached"
    );
    Sse::new(stream).keep_alive(stream_keep_alive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use notifier_core::{
        EventPublisher, Notification, PublishError, RenderError, RenderedView, View,
        NOTIFICATIONS_KIND,
    };
    use tokio::time::{self, Duration};
    use tower::ServiceExt;

    use crate::views::AskamaRenderer;

    fn setup_state() -> AppState {
        let metrics = telemetry::init_metrics().expect("metrics init");
        AppState::new(
            metrics,
            NotificationBus::new(16),
            Arc::new(AskamaRenderer::new("Notifier")),
        )
    }

    async fn body_text(response: axum::response::Response) -> String {
        let collected = response
            .into_body()
            .collect()
            .await
            .expect("body should read");
        String::from_utf8(collected.to_bytes().to_vec()).expect("utf-8")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    struct ClosedPublisher;

    impl EventPublisher for ClosedPublisher {
        fn publish(&self, _event: Notification) -> Result<(), PublishError> {
            Err(PublishError::Closed)
        }
    }

    struct MissingViewRenderer;

    impl TemplateRenderer for MissingViewRenderer {
        fn render(&self, view: &View) -> Result<RenderedView, RenderError> {
            Err(RenderError::NotFound(view.name().to_string()))
        }
    }

    struct BrokenRenderer;

    impl TemplateRenderer for BrokenRenderer {
        fn render(&self, _view: &View) -> Result<RenderedView, RenderError> {
            Err(RenderError::Template("syntax error".to_string()))
        }
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let app = app_router(setup_state());

        let response = app
            .oneshot(get("/healthz"))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_exports_build_info() {
        let app = app_router(setup_state());

        let response = app
            .oneshot(get("/metrics"))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("app_build_info"));
        assert!(body.contains("app_uptime_seconds"));
    }

    #[tokio::test]
    async fn index_publishes_one_notification() {
        let state = setup_state();
        let mut receiver = state.bus().subscribe();
        let app = app_router(state);

        let response = app
            .oneshot(get("/server"))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.is_empty());

        let event = receiver.recv().await.expect("event delivered");
        assert_eq!(event.kind(), NOTIFICATIONS_KIND);
        assert_eq!(event.payload(), "test");
        assert!(receiver.try_recv().is_err(), "only one event expected");
    }

    #[tokio::test]
    async fn index_maps_publish_failure_to_problem() {
        let state =
            setup_state().with_controller(ServerController::new(Arc::new(ClosedPublisher)));
        let app = app_router(state);

        let response = app
            .oneshot(get("/server"))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );
        let body: serde_json::Value =
            serde_json::from_str(&body_text(response).await).expect("json body");
        assert_eq!(body["type"], "publish_failed");
    }

    #[tokio::test]
    async fn fetch_renders_welcome_view() {
        let app = app_router(setup_state());

        let response = app
            .oneshot(get("/server/fetch"))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        let body = body_text(response).await;
        assert!(body.contains("<h1 id=\"welcome\">Notifier</h1>"));
    }

    #[tokio::test]
    async fn fetch_does_not_publish() {
        let state = setup_state();
        let mut receiver = state.bus().subscribe();
        let app = app_router(state);

        let response = app
            .oneshot(get("/server/fetch"))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn fetch_maps_missing_view_to_not_found() {
        let metrics = telemetry::init_metrics().expect("metrics init");
        let state = AppState::new(
            metrics,
            NotificationBus::new(4),
            Arc::new(MissingViewRenderer),
        );
        let app = app_router(state);

        let response = app
            .oneshot(get("/server/fetch"))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value =
            serde_json::from_str(&body_text(response).await).expect("json body");
        assert_eq!(body["type"], "view_not_found");
        assert_eq!(body["title"], "Not Found");
    }

    #[tokio::test]
    async fn fetch_maps_template_failure_to_server_error() {
        let metrics = telemetry::init_metrics().expect("metrics init");
        let state = AppState::new(metrics, NotificationBus::new(4), Arc::new(BrokenRenderer));
        let app = app_router(state);

        let response = app
            .oneshot(get("/server/fetch"))
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value =
            serde_json::from_str(&body_text(response).await).expect("json body");
        assert_eq!(body["type"], "render_failed");
    }

    #[tokio::test]
    async fn notification_stream_emits_published_events() {
        let state = setup_state();
        let bus = state.bus().clone();
        let app = app_router(state);

        let mut response = app
            .oneshot(get(NOTIFICATION_STREAM_PATH))
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::OK);

        let notification = Notification::new("test");
        let notification_id = notification.id;
        let publish = tokio::spawn(async move {
            time::sleep(Duration::from_millis(25)).await;
            bus.publish(notification).expect("publish");
        });

        let text = next_frame_text(&mut response, Duration::from_secs(1)).await;
        assert!(text.contains("event: notifications"));
        assert!(text.contains("\"payload\":\"test\""));
        assert!(text.contains(&format!("id: {notification_id}")));

        publish.await.expect("publish task");
    }

    async fn next_frame_text(response: &mut axum::response::Response, wait: Duration) -> String {
        let frame = time::timeout(wait, response.body_mut().frame())
            .await
            .expect("stream produced chunk")
            .expect("chunk ok")
            .expect("chunk available");
        let data = match frame.into_data() {
            Ok(data) => data,
            Err(_) => panic!("expected data frame"),
        };
        String::from_utf8(data.to_vec()).expect("utf-8")
    }

    #[tokio::test]
    async fn lagging_listener_resumes_with_latest_event() {
        let metrics = telemetry::init_metrics().expect("metrics init");
        let state = AppState::new(
            metrics,
            NotificationBus::new(1),
            Arc::new(AskamaRenderer::new("Notifier")),
        );
        let bus = state.bus().clone();
        let app = app_router(state);

        let mut response = app
            .oneshot(get(NOTIFICATION_STREAM_PATH))
            .await
            .expect("handler should respond");

        let kept = Notification::new("kept");
        let kept_id = kept.id;
        bus.publish(Notification::new("dropped")).expect("publish");
        bus.publish(kept).expect("publish");

        let text = next_frame_text(&mut response, Duration::from_secs(1)).await;
        assert!(text.contains("\"payload\":\"kept\""));
        assert!(!text.contains("dropped"));
        assert!(text.contains(&format!("id: {kept_id}")));
    }

    #[tokio::test(start_paused = true)]
    async fn notification_stream_sends_heartbeat_when_idle() {
        let app = app_router(setup_state());

        let mut response = app
            .oneshot(get(NOTIFICATION_STREAM_PATH))
            .await
            .expect("handler should respond");

        let text = next_frame_text(&mut response, Duration::from_secs(25)).await;
        assert!(text.contains(":heartbeat"));
    }

    #[tokio::test]
    async fn actions_are_counted_in_metrics() {
        let state = setup_state();
        let app = app_router(state);

        let response = app
            .clone()
            .oneshot(get("/server"))
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(get("/server/fetch"))
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get("/metrics"))
            .await
            .expect("handler should respond");
        let body = body_text(response).await;
        assert!(body.contains("notifications_published_total"));
        assert!(body.contains("views_rendered_total{view=\"welcome\"}"));
    }
}
