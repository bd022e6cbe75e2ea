pub mod handlers;
pub mod logging;
pub mod target;

use std::sync::Arc;

use axum::middleware as axum_middleware;
use axum::routing::get;
use axum::Router;

use crate::relay::Forwarder;

use self::handlers::AppState;

/// Build the axum router: a public health probe plus the deployment
/// relay routes, with request logging layered outermost.
pub fn build_router(forwarder: Forwarder, base_url: String, api_key: String) -> Router {
    let state = Arc::new(AppState {
        forwarder,
        base_url,
        api_key,
    });

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/v1/deployments/{deployment}/{*operation}",
            get(handlers::relay_get)
                .post(handlers::relay_post)
                .delete(handlers::relay_delete),
        )
        .layer(axum_middleware::from_fn(logging::logging_middleware))
        .with_state(state)
}
