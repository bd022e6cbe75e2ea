use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{error, info, warn};

/// Request logging middleware. Health probes are skipped; the log level
/// follows the response status class.
pub async fn logging_middleware(req: Request<Body>, next: Next) -> Response {
    let path = req.uri().path().to_string();

    if path == "/health" {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match status {
        500.. => error!(method, path, status, elapsed_ms, "handled request"),
        400..=499 => warn!(method, path, status, elapsed_ms, "handled request"),
        _ => info!(method, path, status, elapsed_ms, "handled request"),
    }

    response
}
