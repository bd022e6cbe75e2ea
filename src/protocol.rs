use serde::Serialize;

/// Error response returned by the relay surface.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,
}

/// Usage report delivered to the metrics collector endpoint. The body is
/// absent for streamed responses, whose token accounting happens
/// out-of-band.
#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub client_id: String,
    pub deployment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
}
