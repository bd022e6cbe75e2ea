use thiserror::Error;

/// Failures while forwarding a call to the upstream endpoint.
///
/// Non-2xx upstream responses are not errors; their status and body pass
/// through verbatim. These variants cover the transport itself.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid upstream url: {0}")]
    Url(String),
}
