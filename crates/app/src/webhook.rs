//! Webhook intake
//!
//! Turns upstream trigger events into jobs and enqueues them. Headers are
//! looked up case-insensitively, so payloads forwarded by Lambda Function
//! URLs (which lower-case header names) need no translation. Signature
//! verification happens upstream of this service.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use runnerq_jobs::{Job, JobStore, TargetStore};

use crate::{AppError, AppState};

pub const EVENT_HEADER: &str = "x-github-event";
pub const ENTERPRISE_HOST_HEADER: &str = "x-github-enterprise-host";

/// Routes accepting trigger events. Function URLs deliver to `/`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handle_github_event))
        .route("/github/events", post(handle_github_event))
}

#[derive(Debug, Deserialize)]
struct TriggerPayload {
    action: Option<String>,
    repository: Option<RepositoryRef>,
}

#[derive(Debug, Deserialize)]
struct RepositoryRef {
    full_name: String,
}

/// Whether an event/action pair asks for a runner
fn wants_runner(event: &str, action: Option<&str>) -> bool {
    matches!(
        (event, action),
        ("check_run", Some("created")) | ("workflow_job", Some("queued"))
    )
}

async fn handle_github_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let event = headers
        .get(EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest(format!("missing {} header", EVENT_HEADER)))?;

    if event == "ping" {
        return Ok((StatusCode::OK, Json(json!({ "status": "pong" }))));
    }

    let raw = std::str::from_utf8(&body)
        .map_err(|_| AppError::BadRequest("payload is not valid UTF-8".to_string()))?;
    let payload: TriggerPayload = serde_json::from_str(raw)
        .map_err(|e| AppError::BadRequest(format!("invalid {} payload: {}", event, e)))?;

    if !wants_runner(event, payload.action.as_deref()) {
        tracing::debug!(event, action = ?payload.action, "Ignoring event");
        return Ok((StatusCode::OK, Json(json!({ "status": "ignored" }))));
    }

    let repository = payload
        .repository
        .ok_or_else(|| AppError::BadRequest("payload has no repository".to_string()))?
        .full_name;

    let Some(target) = state.datastore.get_target_by_scope(&repository).await? else {
        tracing::info!(repository = %repository, "No target registered for repository");
        return Ok((StatusCode::OK, Json(json!({ "status": "no_target" }))));
    };
    if !target.is_active() {
        tracing::info!(repository = %repository, status = %target.status, "Target not accepting jobs");
        return Ok((StatusCode::OK, Json(json!({ "status": "target_inactive" }))));
    }

    let source_domain = headers
        .get(ENTERPRISE_HOST_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let job = Job::new(repository, raw, target.id, source_domain);
    let job_id = job.id;
    state.datastore.enqueue_job(job).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "status": "enqueued", "job_id": job_id })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_app;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use runnerq_sqs::mock::MockQueueTransport;
    use runnerq_sqs::{convert_job, QueueConfig, QueueDatastore, SqsJobStore};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> (Router, MockQueueTransport) {
        let transport = MockQueueTransport::new();
        let config = QueueConfig::new("https://sqs.local/jobs.fifo", "us-east-1");
        let datastore =
            QueueDatastore::new(SqsJobStore::with_transport(transport.clone(), &config));
        (create_app(Arc::new(datastore)), transport)
    }

    fn event(name: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/github/events")
            .header("X-GitHub-Event", name)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const CHECK_RUN_CREATED: &str =
        r#"{"action":"created","repository":{"full_name":"acme/app"},"check_run":{"id":1}}"#;

    #[tokio::test]
    async fn test_health_check() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ping_answers_pong() {
        let (app, transport) = app();
        let response = app.oneshot(event("ping", "{}")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "pong");
        assert_eq!(transport.depth(), 0);
    }

    #[tokio::test]
    async fn test_check_run_created_enqueues_job() {
        let (app, transport) = app();
        let response = app.oneshot(event("check_run", CHECK_RUN_CREATED)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "enqueued");

        let bodies = transport.bodies();
        assert_eq!(bodies.len(), 1);
        let job = convert_job(&bodies[0]).unwrap();
        assert_eq!(job.repository, "acme/app");
        assert_eq!(job.trigger_payload, CHECK_RUN_CREATED);
        assert_eq!(job.source_domain, None);
        assert_eq!(body["job_id"], job.id.to_string());
    }

    #[tokio::test]
    async fn test_lower_case_headers_and_enterprise_host() {
        let (app, transport) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("x-github-event", "workflow_job")
            .header("x-github-enterprise-host", "ghe.example.com")
            .body(Body::from(
                r#"{"action":"queued","repository":{"full_name":"acme/app"}}"#,
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let job = convert_job(&transport.bodies()[0]).unwrap();
        assert_eq!(job.source_domain.as_deref(), Some("ghe.example.com"));
    }

    #[tokio::test]
    async fn test_other_actions_are_ignored() {
        let (app, transport) = app();
        let response = app
            .oneshot(event(
                "check_run",
                r#"{"action":"completed","repository":{"full_name":"acme/app"}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(json_body(response).await["status"], "ignored");
        assert_eq!(transport.depth(), 0);
    }

    #[tokio::test]
    async fn test_missing_event_header_is_bad_request() {
        let (app, _) = app();
        let request = Request::post("/github/events")
            .body(Body::from(CHECK_RUN_CREATED))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_malformed_payload_is_bad_request() {
        let (app, _) = app();
        let response = app.oneshot(event("check_run", "{oops")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_enqueue_failure_is_dispatch_failure() {
        let (app, transport) = app();
        transport.fail_next_send("ThrottlingException");

        let response = app.oneshot(event("check_run", CHECK_RUN_CREATED)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"]["code"], "DISPATCH_FAILED");
    }
}
