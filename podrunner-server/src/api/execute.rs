use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use podrunner_core::{ExecutionRequest, ExecutionResult};
use tracing::{info, instrument};

use crate::{error::ApiError, ApiContextRef};

pub fn router() -> Router<ApiContextRef> {
    Router::new().route("/", post(execute))
}

/// Run the requested container to completion and return its exit code and output.
///
/// The body is decoded as JSON whatever its declared content type.
#[instrument(skip_all)]
async fn execute(
    State(context): State<ApiContextRef>,
    body: Bytes,
) -> Result<Json<ExecutionResult>, ApiError> {
    let request: ExecutionRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidBody(e.to_string()))?;
    info!(image = %request.image, command = %request.command, "Received execution request");

    // shutdown cancels every in-flight execution
    let cancel = context.shutdown.child_token();
    let result = context.gateway.execute(request, &cancel).await?;

    Ok(Json(result))
}
