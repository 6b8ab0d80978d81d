//! Shell router.
//!
//! Returns a composable `Router`. Pages that carry patient data are
//! served with `Cache-Control: no-store`.

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::shell::context::ShellContext;
use crate::shell::handlers;

pub fn build_shell_router(ctx: ShellContext) -> Router {
    let patient_data = Router::new()
        .route("/evaluation", post(handlers::submit_evaluation))
        .route("/evaluation/reset", post(handlers::reset_evaluation))
        .route("/result", get(handlers::result_page))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    Router::new()
        .route("/", get(handlers::evaluation_page))
        .route("/health", get(handlers::health))
        .merge(patient_data)
        .fallback(handlers::not_found)
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::controller::SUBMIT_ERROR_MESSAGE;
    use crate::form::{filled_form, FieldId};
    use crate::prediction::{MockPredictionClient, PredictionError};
    use crate::shell::context::{ShellSession, SESSION_COOKIE};

    fn test_ctx(client: MockPredictionClient) -> (ShellContext, Arc<MockPredictionClient>) {
        let client = Arc::new(client);
        (ShellContext::new(client.clone()), client)
    }

    fn filled_body() -> String {
        filled_form()
            .iter()
            .map(|(field, value)| format!("{}={}", field.key(), value))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn post_form(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn with_cookie(mut request: Request<Body>, session: &ShellSession) -> Request<Body> {
        let cookie = format!("{SESSION_COOKIE}={}", session.id);
        request
            .headers_mut()
            .insert(header::COOKIE, HeaderValue::from_str(&cookie).unwrap());
        request
    }

    /// `name=value` part of the response's `Set-Cookie`.
    fn issued_cookie(response: &axum::response::Response) -> String {
        let value = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("response should open a session")
            .to_str()
            .unwrap();
        value.split(';').next().unwrap().to_string()
    }

    fn cookie_request(mut request: Request<Body>, cookie: &str) -> Request<Body> {
        request
            .headers_mut()
            .insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        request
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    async fn wait_until_pending(session: &ShellSession) {
        for _ in 0..200 {
            if session.controller.is_pending() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("submission never became pending");
    }

    fn location(response: &axum::response::Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn form_page_renders_and_opens_a_session() {
        let (ctx, _) = test_ctx(MockPredictionClient::new(json!({})));
        let app = build_shell_router(ctx.clone());

        let resp = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(issued_cookie(&resp).starts_with(SESSION_COOKIE));
        assert_eq!(ctx.session_count(), 1);
        let html = body_text(resp).await;
        assert!(html.contains("Risk Evaluation"));
        assert!(html.contains(r#"name="age""#));
        assert!(html.contains("Calculate risk"));
    }

    #[tokio::test]
    async fn known_session_gets_no_new_cookie() {
        let (ctx, _) = test_ctx(MockPredictionClient::new(json!({})));
        let session = ctx.open_session().unwrap();

        let resp = build_shell_router(ctx.clone())
            .oneshot(with_cookie(get_request("/"), &session))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(ctx.session_count(), 1);
    }

    #[tokio::test]
    async fn successful_submit_redirects_to_result() {
        let (ctx, client) = test_ctx(MockPredictionClient::new(json!({ "risk": "high" })));
        let session = ctx.open_session().unwrap();
        let app = build_shell_router(ctx.clone());

        let resp = app
            .clone()
            .oneshot(with_cookie(post_form("/evaluation", filled_body()), &session))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/result");
        assert_eq!(client.call_count(), 1);
        assert_eq!(
            session.handoff().peek_json().as_deref(),
            Some(r#"{"risk":"high"}"#)
        );

        let resp = app
            .clone()
            .oneshot(with_cookie(get_request("/result"), &session))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");
        let html = body_text(resp).await;
        assert!(html.contains("Evaluation Result"));
        assert!(html.contains("&quot;risk&quot;: &quot;high&quot;"));

        // Consumed: a reload goes back to the form.
        let resp = app
            .oneshot(with_cookie(get_request("/result"), &session))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/");
    }

    #[tokio::test]
    async fn resubmit_after_back_from_result_is_evaluated() {
        let (ctx, client) = test_ctx(MockPredictionClient::new(json!({ "risk": "low" })));
        let app = build_shell_router(ctx.clone());

        let resp = app.clone().oneshot(get_request("/")).await.unwrap();
        let cookie = issued_cookie(&resp);

        let resp = app
            .clone()
            .oneshot(cookie_request(post_form("/evaluation", filled_body()), &cookie))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/result");

        let resp = app
            .clone()
            .oneshot(cookie_request(get_request("/result"), &cookie))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        // Back to the still-filled form, submitted again.
        let body = filled_body().replace("age=45", "age=52");
        let resp = app
            .clone()
            .oneshot(cookie_request(post_form("/evaluation", body), &cookie))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/result");
        assert_eq!(client.call_count(), 2);
        assert_eq!(client.last_observation().unwrap().age, 52);

        let resp = app
            .oneshot(cookie_request(get_request("/result"), &cookie))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("&quot;risk&quot;: &quot;low&quot;"));
    }

    #[tokio::test]
    async fn empty_result_redirects_to_form() {
        let (ctx, _) = test_ctx(MockPredictionClient::new(json!({})));
        let resp = build_shell_router(ctx)
            .oneshot(get_request("/result"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/");
    }

    #[tokio::test]
    async fn invalid_input_returns_422_without_calling_service() {
        let (ctx, client) = test_ctx(MockPredictionClient::new(json!({})));
        let body = filled_body().replace("age=45", "age=");

        let resp = build_shell_router(ctx)
            .oneshot(post_form("/evaluation", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(resp).await.contains("Age is required"));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn service_rejection_returns_502_with_generic_message() {
        let (ctx, _) = test_ctx(MockPredictionClient::failing(
            PredictionError::ServerRejected {
                status: 422,
                body: "detail".into(),
            },
        ));

        let resp = build_shell_router(ctx)
            .oneshot(post_form("/evaluation", filled_body()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let html = body_text(resp).await;
        assert!(html.contains(SUBMIT_ERROR_MESSAGE));
        // Typed values survive the failure.
        assert!(html.contains(r#"name="age" value="45""#));
        assert!(html.contains(r#"name="weekly_exercise_hours" value="3.5""#));
    }

    #[tokio::test]
    async fn second_submit_while_pending_returns_409() {
        let (ctx, client) = test_ctx(MockPredictionClient::new(json!({})).gated());
        let session = ctx.open_session().unwrap();
        let app = build_shell_router(ctx.clone());

        let first = tokio::spawn(
            app.clone()
                .oneshot(with_cookie(post_form("/evaluation", filled_body()), &session)),
        );
        wait_until_pending(&session).await;

        let resp = app
            .clone()
            .oneshot(with_cookie(post_form("/evaluation", filled_body()), &session))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let html = body_text(resp).await;
        assert!(html.contains(r#"class="btn btn-submit" disabled>Calculating...</button>"#));

        let reset = app
            .clone()
            .oneshot(with_cookie(post_form("/evaluation/reset", String::new()), &session))
            .await
            .unwrap();
        assert_eq!(reset.status(), StatusCode::CONFLICT);

        client.release();
        let resp = first.await.unwrap().unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn form_reload_during_flight_keeps_the_result() {
        let (ctx, client) = test_ctx(MockPredictionClient::new(json!({ "risk": "high" })).gated());
        let session = ctx.open_session().unwrap();
        let app = build_shell_router(ctx.clone());

        let first = tokio::spawn(
            app.clone()
                .oneshot(with_cookie(post_form("/evaluation", filled_body()), &session)),
        );
        wait_until_pending(&session).await;

        // Same browser, another tab opens the form.
        let resp = app
            .clone()
            .oneshot(with_cookie(get_request("/"), &session))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Calculating..."));

        client.release();
        let resp = first.await.unwrap().unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/result");
        assert_eq!(
            session.handoff().peek_json().as_deref(),
            Some(r#"{"risk":"high"}"#)
        );
    }

    #[tokio::test]
    async fn sessions_keep_separate_forms_and_results() {
        let (ctx, client) = test_ctx(MockPredictionClient::new(json!({ "risk": "low" })).gated());
        let a = ctx.open_session().unwrap();
        let b = ctx.open_session().unwrap();
        let app = build_shell_router(ctx.clone());

        let first = tokio::spawn(
            app.clone()
                .oneshot(with_cookie(post_form("/evaluation", filled_body()), &a)),
        );
        wait_until_pending(&a).await;

        let resp = app
            .clone()
            .oneshot(with_cookie(get_request("/"), &b))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Calculate risk"));

        // B is idle, so its reset is not refused.
        b.controller.set_field(FieldId::Age, "80").unwrap();
        let resp = app
            .clone()
            .oneshot(with_cookie(post_form("/evaluation/reset", String::new()), &b))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(a.controller.form().unwrap().get(FieldId::Age), "45");

        let resp = app.clone().oneshot(get_request("/health")).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(json["submission_pending"], true);

        client.release();
        let resp = first.await.unwrap().unwrap();
        assert_eq!(location(&resp), "/result");
        assert!(!a.handoff().is_empty());
        assert!(b.handoff().is_empty());

        let resp = app
            .oneshot(with_cookie(get_request("/result"), &b))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/");
    }

    #[tokio::test]
    async fn abandoned_request_still_completes_submission() {
        let (ctx, client) = test_ctx(MockPredictionClient::new(json!({ "risk": "low" })).gated());
        let session = ctx.open_session().unwrap();
        let app = build_shell_router(ctx.clone());

        let request = tokio::spawn(
            app.oneshot(with_cookie(post_form("/evaluation", filled_body()), &session)),
        );
        wait_until_pending(&session).await;
        request.abort();
        let _ = request.await;

        client.release();
        for _ in 0..200 {
            if !session.handoff().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!session.handoff().is_empty());
        assert!(!session.controller.is_pending());
    }

    #[tokio::test]
    async fn reset_restores_defaults() {
        let (ctx, _) = test_ctx(MockPredictionClient::new(json!({})));
        let session = ctx.open_session().unwrap();
        session.controller.set_field(FieldId::Age, "70").unwrap();

        let resp = build_shell_router(ctx.clone())
            .oneshot(with_cookie(post_form("/evaluation/reset", String::new()), &session))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(session.controller.form().unwrap().get(FieldId::Age), "");
    }

    #[tokio::test]
    async fn health_reports_service_reachability() {
        let (ctx, _) = test_ctx(MockPredictionClient::new(json!({})));
        let resp = build_shell_router(ctx)
            .oneshot(get_request("/health"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], crate::config::APP_VERSION);
        assert_eq!(json["submission_pending"], false);
        assert_eq!(json["prediction_service_reachable"], true);

        let (ctx, _) = test_ctx(MockPredictionClient::failing(PredictionError::Unreachable(
            "down".into(),
        )));
        let resp = build_shell_router(ctx)
            .oneshot(get_request("/health"))
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(json["prediction_service_reachable"], false);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (ctx, _) = test_ctx(MockPredictionClient::new(json!({})));
        let resp = build_shell_router(ctx)
            .oneshot(get_request("/admin"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_text(resp).await.contains("Page not found"));
    }
}
