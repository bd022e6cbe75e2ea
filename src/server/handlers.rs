use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, RawQuery, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use tracing::error;

use crate::protocol::{ErrorResponse, HealthResponse};
use crate::relay::{
    content, query, Deployment, Forwarder, ProxyResult, RelayBody, RelayError, RequestContext,
};
use crate::server::target::build_target_url;

/// Header carrying the caller identifier used for usage attribution.
const CLIENT_ID_HEADER: &str = "x-client-id";

/// Shared application state.
pub struct AppState {
    pub forwarder: Forwarder,
    pub base_url: String,
    pub api_key: String,
}

/// Health check handler.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        upstream: Some(state.base_url.clone()),
    })
}

/// GET relay: JSON buffered, octet-stream relayed, anything else 415.
pub async fn relay_get(
    State(state): State<Arc<AppState>>,
    Path((deployment, operation)): Path<(String, String)>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let call = match prepare(&state, deployment, &operation, raw_query.as_deref(), &headers) {
        Ok(call) => call,
        Err(resp) => return resp,
    };

    let result = state
        .forwarder
        .forward_get(
            &call.target,
            &state.api_key,
            &call.params,
            &call.ctx,
            &call.deployment,
        )
        .await;
    render(&call.deployment, result)
}

/// DELETE relay: response always buffered.
pub async fn relay_delete(
    State(state): State<Arc<AppState>>,
    Path((deployment, operation)): Path<(String, String)>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let call = match prepare(&state, deployment, &operation, raw_query.as_deref(), &headers) {
        Ok(call) => call,
        Err(resp) => return resp,
    };

    let result = state
        .forwarder
        .forward_delete(
            &call.target,
            &state.api_key,
            &call.params,
            &call.ctx,
            &call.deployment,
        )
        .await;
    render(&call.deployment, result)
}

/// POST relay. A JSON body carrying `"stream": true` switches to the
/// streaming forward, which hands the response back at header arrival.
pub async fn relay_post(
    State(state): State<Arc<AppState>>,
    Path((deployment, operation)): Path<(String, String)>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let call = match prepare(&state, deployment, &operation, raw_query.as_deref(), &headers) {
        Ok(call) => call,
        Err(resp) => return resp,
    };

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => return write_error(StatusCode::BAD_REQUEST, "invalid json body"),
    };

    let streaming = payload
        .get("stream")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let result = if streaming {
        state
            .forwarder
            .forward_post_streaming(
                &call.target,
                &state.api_key,
                payload,
                &call.params,
                &call.ctx,
                &call.deployment,
            )
            .await
    } else {
        state
            .forwarder
            .forward_post(
                &call.target,
                &state.api_key,
                payload,
                &call.params,
                &call.ctx,
                &call.deployment,
            )
            .await
    };
    render(&call.deployment, result)
}

/// Per-call inputs shared by every relay handler.
struct CallParts {
    deployment: Deployment,
    ctx: RequestContext,
    params: Vec<(String, String)>,
    target: String,
}

fn prepare(
    state: &AppState,
    deployment: String,
    operation: &str,
    raw_query: Option<&str>,
    headers: &HeaderMap,
) -> Result<CallParts, Response> {
    let deployment = Deployment(deployment);
    let target = build_target_url(&state.base_url, &deployment, operation).map_err(|err| {
        error!(
            deployment = %deployment,
            base_url = state.base_url.as_str(),
            error = %err,
            "failed to build upstream url"
        );
        write_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    })?;

    Ok(CallParts {
        ctx: request_context(headers),
        params: query::parse_pairs(raw_query.unwrap_or("")),
        deployment,
        target,
    })
}

fn request_context(headers: &HeaderMap) -> RequestContext {
    let id = headers
        .get(CLIENT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("anonymous");
    RequestContext(id.to_string())
}

/// Map a relay outcome onto the outward response. Transport failures and
/// timeouts own distinct gateway statuses; everything else passes the
/// upstream status through.
fn render(deployment: &Deployment, result: Result<ProxyResult, RelayError>) -> Response {
    match result {
        Ok(outcome) => proxy_response(outcome),
        Err(RelayError::Timeout) => {
            error!(deployment = %deployment, "upstream request timed out");
            write_error(StatusCode::GATEWAY_TIMEOUT, "upstream timeout")
        }
        Err(RelayError::Transport(err)) => {
            error!(deployment = %deployment, error = %err, "upstream request failed");
            write_error(StatusCode::BAD_GATEWAY, "upstream unavailable")
        }
        Err(RelayError::Url(err)) => {
            error!(deployment = %deployment, error = %err, "invalid upstream url");
            write_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

fn proxy_response(outcome: ProxyResult) -> Response {
    match outcome.body {
        RelayBody::Buffered(text) => {
            let mut builder = Response::builder().status(outcome.status);
            if !text.is_empty() {
                builder = builder.header(CONTENT_TYPE, content::APPLICATION_JSON);
            }
            builder
                .body(Body::from(text))
                .unwrap_or_else(|_| Response::new(Body::empty()))
        }
        RelayBody::Stream {
            content_type,
            bytes,
        } => Response::builder()
            .status(outcome.status)
            .header(CONTENT_TYPE, content_type)
            .body(Body::from_stream(bytes))
            .unwrap_or_else(|_| Response::new(Body::empty())),
    }
}

fn write_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
