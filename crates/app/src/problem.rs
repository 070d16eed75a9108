use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use notifier_core::{PublishError, RenderError};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
struct ProblemDetails {
    #[serde(rename = "type")]
    problem_type: &'static str,
    title: &'static str,
    detail: String,
}

pub struct ProblemResponse {
    status: StatusCode,
    body: ProblemDetails,
}

impl ProblemResponse {
    pub fn new<S: Into<String>>(status: StatusCode, problem_type: &'static str, detail: S) -> Self {
        Self {
            status,
            body: ProblemDetails {
                problem_type,
                title: status.canonical_reason().unwrap_or("error"),
                detail: detail.into(),
            },
        }
    }
}

impl IntoResponse for ProblemResponse {
    fn into_response(self) -> Response {
        let mut response = Json(self.body).into_response();
        *response.status_mut() = self.status;
        response.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

/// Errors escaping a controller action, mapped once for every route.
#[derive(Debug)]
pub enum AppError {
    Publish(PublishError),
    Render(RenderError),
}

impl From<PublishError> for AppError {
    fn from(value: PublishError) -> Self {
        Self::Publish(value)
    }
}

impl From<RenderError> for AppError {
    fn from(value: RenderError) -> Self {
        Self::Render(value)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let problem = match self {
            Self::Render(RenderError::NotFound(name)) => ProblemResponse::new(
                StatusCode::NOT_FOUND,
                "view_not_found",
                format!("view '{name}' does not exist"),
            ),
            Self::Render(err) => {
                error!(stage = "view", error = %err, "view rendering failed");
                ProblemResponse::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "render_failed",
                    err.to_string(),
                )
            }
            Self::Publish(err) => {
                error!(stage = "bus", error = %err, "event publishing failed");
                ProblemResponse::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "publish_failed",
                    err.to_string(),
                )
            }
        };
        problem.into_response()
    }
}
