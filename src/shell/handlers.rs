//! Route handlers for the form, the result view and health.

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::Serialize;

use crate::controller::SubmitOutcome;
use crate::navigation::Route;
use crate::shell::context::{ShellContext, ShellSession};
use crate::shell::error::ShellError;
use crate::shell::pages::{render_form_page, render_result_page};

fn form_response(session: &ShellSession, status: StatusCode) -> Result<Response, ShellError> {
    let snapshot = session.controller.snapshot()?;
    Ok((status, Html(render_form_page(&snapshot))).into_response())
}

/// Attach the session cookie to responses of a session opened by this request.
fn with_session_cookie(session: &ShellSession, created: bool, mut response: Response) -> Response {
    if created {
        match HeaderValue::from_str(&session.cookie()) {
            Ok(value) => {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!(session = %session.id, "Invalid session cookie: {e}"),
        }
    }
    response
}

/// `GET /`: a fresh form instance.
///
/// While the session has an exchange in flight the pending form is shown
/// instead, so a second tab cannot discard the first tab's result.
pub async fn evaluation_page(
    State(ctx): State<ShellContext>,
    headers: HeaderMap,
) -> Result<Response, ShellError> {
    let (session, created) = ctx.session(&headers)?;
    if session.controller.is_pending() {
        tracing::debug!(session = %session.id, "Submission in flight, keeping the form instance");
    } else {
        session.controller.mount()?;
    }
    let response = form_response(&session, StatusCode::OK)?;
    Ok(with_session_cookie(&session, created, response))
}

/// `POST /evaluation`: apply the posted fields and submit.
///
/// The exchange runs in its own task: a browser that goes away mid-request
/// does not cancel it.
pub async fn submit_evaluation(
    State(ctx): State<ShellContext>,
    headers: HeaderMap,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, ShellError> {
    let (session, created) = ctx.session(&headers)?;
    if session.controller.ensure_mounted()? {
        tracing::debug!(session = %session.id, "Reopened form instance for submission");
    }
    let unknown = session
        .controller
        .apply_fields(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
    if !unknown.is_empty() {
        tracing::debug!(?unknown, "Ignoring unknown form keys");
    }

    let controller = session.controller.clone();
    let outcome = tokio::spawn(async move { controller.submit().await }).await??;

    let status = match outcome {
        SubmitOutcome::Navigated => {
            let route = session.navigator.take_pending().unwrap_or(Route::Result);
            let response = Redirect::to(route.path()).into_response();
            return Ok(with_session_cookie(&session, created, response));
        }
        SubmitOutcome::Ignored | SubmitOutcome::Discarded => {
            let response = Redirect::to(Route::Evaluation.path()).into_response();
            return Ok(with_session_cookie(&session, created, response));
        }
        SubmitOutcome::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SubmitOutcome::Failed(_) => StatusCode::BAD_GATEWAY,
        SubmitOutcome::ResultNotStored => StatusCode::INTERNAL_SERVER_ERROR,
        SubmitOutcome::AlreadyPending => StatusCode::CONFLICT,
    };
    let response = form_response(&session, status)?;
    Ok(with_session_cookie(&session, created, response))
}

/// `POST /evaluation/reset`
pub async fn reset_evaluation(
    State(ctx): State<ShellContext>,
    headers: HeaderMap,
) -> Result<Response, ShellError> {
    let (session, created) = ctx.session(&headers)?;
    let status = if session.controller.reset()? {
        StatusCode::OK
    } else {
        StatusCode::CONFLICT
    };
    let response = form_response(&session, status)?;
    Ok(with_session_cookie(&session, created, response))
}

/// `GET /result`: consume the handed-off result.
pub async fn result_page(
    State(ctx): State<ShellContext>,
    headers: HeaderMap,
) -> Result<Response, ShellError> {
    let (session, created) = ctx.session(&headers)?;
    let response = match session.handoff().take()? {
        Some(result) => {
            session.controller.unmount()?;
            Html(render_result_page(&result)).into_response()
        }
        None => Redirect::to(Route::Evaluation.path()).into_response(),
    };
    Ok(with_session_cookie(&session, created, response))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub submission_pending: bool,
    pub prediction_service_reachable: bool,
}

/// `GET /health`
pub async fn health(State(ctx): State<ShellContext>) -> Result<Json<HealthResponse>, ShellError> {
    let prediction_service_reachable = match ctx.client.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(kind = e.kind().as_str(), error = %e, "Prediction service not reachable");
            false
        }
    };

    Ok(Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        submission_pending: ctx.any_pending()?,
        prediction_service_reachable,
    }))
}

pub async fn not_found(uri: Uri) -> ShellError {
    ShellError::NotFound(uri.path().to_string())
}
