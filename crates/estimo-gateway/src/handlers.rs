use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use estimo_core::{QueryError, QueryErrorKind, QueryRequest, QueryStage};
use estimo_llm::LlmProvider;
use serde::Serialize;

use super::server::AppState;

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a QueryError,
}

/// Failed query rendered as `{ "error": { kind, stage, message } }`.
pub(crate) struct ApiError {
    status: StatusCode,
    error: QueryError,
}

impl From<QueryError> for ApiError {
    fn from(error: QueryError) -> Self {
        let status = match error.kind {
            QueryErrorKind::InvalidQuery => StatusCode::BAD_REQUEST,
            QueryErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            QueryErrorKind::Embedding | QueryErrorKind::Generation => StatusCode::BAD_GATEWAY,
            QueryErrorKind::DimensionMismatch => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, error }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            StatusCode::PAYLOAD_TOO_LARGE
        } else {
            StatusCode::BAD_REQUEST
        };
        Self {
            status,
            error: QueryError::new(
                QueryErrorKind::InvalidQuery,
                QueryStage::Validating,
                rejection.body_text(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: &self.error })).into_response()
    }
}

pub(crate) async fn root_handler() -> impl IntoResponse {
    Json(RootResponse {
        message: "Check the docs on: /health and POST /query",
    })
}

pub(crate) async fn health_handler<E, G>(State(state): State<AppState<E, G>>) -> impl IntoResponse
where
    E: LlmProvider + 'static,
    G: LlmProvider + 'static,
{
    Json(state.pipeline.health())
}

pub(crate) async fn query_handler<E, G>(
    State(state): State<AppState<E, G>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Response, ApiError>
where
    E: LlmProvider + 'static,
    G: LlmProvider + 'static,
{
    let Json(request) = payload?;
    match state.pipeline.answer_query(&request.query).await {
        Ok(response) => Ok(Json(response).into_response()),
        Err(e) => {
            tracing::warn!(kind = %e.kind, stage = %e.stage, "query failed: {}", e.message);
            Err(e.into())
        }
    }
}
