//! Shell error type rendered as an HTML page.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::controller::ControllerError;
use crate::handoff::HandoffError;
use crate::shell::pages::render_error_page;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ShellError {
    fn into_response(self) -> Response {
        let (status, title, message) = match &self {
            ShellError::NotFound(path) => {
                tracing::debug!(path, "Shell route not found");
                (
                    StatusCode::NOT_FOUND,
                    "Page not found",
                    "The page you requested does not exist.",
                )
            }
            ShellError::Internal(detail) => {
                tracing::error!(detail, "Shell internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong",
                    "An internal error occurred. Please try again.",
                )
            }
        };

        (status, Html(render_error_page(title, message))).into_response()
    }
}

impl From<ControllerError> for ShellError {
    fn from(err: ControllerError) -> Self {
        ShellError::Internal(err.to_string())
    }
}

impl From<HandoffError> for ShellError {
    fn from(err: HandoffError) -> Self {
        ShellError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ShellError {
    fn from(err: tokio::task::JoinError) -> Self {
        ShellError::Internal(format!("submission task failed: {err}"))
    }
}
