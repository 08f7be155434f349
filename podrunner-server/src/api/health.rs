use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::ApiContextRef;

pub fn router() -> Router<ApiContextRef> {
    Router::new().route("/", get(health_check))
}

#[derive(Debug, Serialize)]
struct HealthCheckResponse {
    status: &'static str,
    namespace: String,
    /// Pod creations and deletions still running in the background
    pending_deletions: usize,
}

async fn health_check(State(context): State<ApiContextRef>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: if context.shutdown.is_cancelled() {
            "SHUTTING_DOWN"
        } else {
            "OK"
        },
        namespace: context.config.namespace.clone(),
        pending_deletions: context.gateway.deletions().len(),
    })
}
