use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use estimo_core::Pipeline;
use estimo_llm::LlmProvider;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, query_handler, root_handler};
use super::server::AppState;

/// Assemble the gateway routes around a ready pipeline.
///
/// Origins that are not valid header values are skipped with a warning.
/// An empty origin list installs no CORS layer.
pub fn build_router<E, G>(
    pipeline: Arc<Pipeline<E, G>>,
    max_body_size: usize,
    cors_origins: &[String],
) -> Router
where
    E: LlmProvider + 'static,
    G: LlmProvider + 'static,
{
    let state = AppState { pipeline };

    let router = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler::<E, G>))
        .route("/query", post(query_handler::<E, G>))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("ignoring invalid CORS origin '{origin}': {e}");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return router;
    }

    router.layer(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
    )
}
