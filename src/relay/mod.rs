pub mod content;
pub mod error;
pub mod query;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use http::header::CONTENT_TYPE;
use http::StatusCode;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::metrics::UsageCollector;

pub use content::ContentKind;
pub use error::RelayError;

/// Header carrying the upstream API key. The key never appears anywhere
/// else — not in the URL, not in the body.
pub const API_KEY_HEADER: &str = "api-key";

/// Opaque identifier of the calling client, used only for usage
/// attribution.
#[derive(Debug, Clone)]
pub struct RequestContext(pub String);

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend target (model/route) a call is destined for.
#[derive(Debug, Clone)]
pub struct Deployment(pub String);

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bytes relayed incrementally from the upstream; dropping the stream
/// closes the upstream connection.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Response body handed back to the service layer.
pub enum RelayBody {
    /// Full body read into memory.
    Buffered(String),
    /// Body relayed chunk by chunk; the buffered marker is empty.
    Stream {
        content_type: &'static str,
        bytes: ByteStream,
    },
}

impl fmt::Debug for RelayBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayBody::Buffered(text) => f.debug_tuple("Buffered").field(text).finish(),
            RelayBody::Stream { content_type, .. } => f
                .debug_struct("Stream")
                .field("content_type", content_type)
                .finish_non_exhaustive(),
        }
    }
}

/// Outcome of one forwarded call: the upstream status plus either a
/// buffered body or a live byte stream.
#[derive(Debug)]
pub struct ProxyResult {
    pub status: StatusCode,
    pub body: RelayBody,
}

impl ProxyResult {
    fn buffered(status: StatusCode, text: String) -> Self {
        Self {
            status,
            body: RelayBody::Buffered(text),
        }
    }

    fn streamed(status: StatusCode, content_type: &'static str, bytes: ByteStream) -> Self {
        Self {
            status,
            body: RelayBody::Stream { content_type, bytes },
        }
    }

    /// Buffered body text; empty for streamed bodies, whose content has
    /// already been handed over as a stream.
    pub fn body_text(&self) -> &str {
        match &self.body {
            RelayBody::Buffered(text) => text,
            RelayBody::Stream { .. } => "",
        }
    }
}

/// One outbound request, built fresh per call and never reused.
pub struct OutboundRequest {
    method: Method,
    url: Url,
    api_key: String,
    body: Option<Value>,
}

impl OutboundRequest {
    /// Parse the target URL and apply the filtered query parameters.
    /// Pairs with empty values are dropped here, before anything touches
    /// the wire.
    pub fn new(
        method: Method,
        target: &str,
        api_key: &str,
        params: &[(String, String)],
    ) -> Result<Self, RelayError> {
        let mut url = Url::parse(target).map_err(|err| RelayError::Url(err.to_string()))?;
        url.set_query(query::filter_join(params).as_deref());

        Ok(Self {
            method,
            url,
            api_key: api_key.to_string(),
            body: None,
        })
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn builder(&self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        let mut builder = client
            .request(self.method.clone(), self.url.clone())
            .header(API_KEY_HEADER, &self.api_key);

        if let Some(body) = &self.body {
            builder = builder.json(body);
        }

        builder
    }
}

/// Forwarder tuning. The header deadline bounds connection establishment
/// and response-header arrival; body buffering and stream relay run
/// unbounded after that.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub header_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            header_timeout: Duration::from_secs(60),
        }
    }
}

/// Relays individual calls to the upstream endpoint.
///
/// Holds no mutable state: every call builds its own request, so the
/// forwarder is safe to share across tasks. Connection pooling lives
/// inside the reqwest client.
pub struct Forwarder {
    client: reqwest::Client,
    collector: Option<Arc<dyn UsageCollector>>,
    header_timeout: Duration,
}

impl Forwarder {
    pub fn new(client: reqwest::Client, collector: Option<Arc<dyn UsageCollector>>) -> Self {
        Self::with_config(client, collector, RelayConfig::default())
    }

    pub fn with_config(
        client: reqwest::Client,
        collector: Option<Arc<dyn UsageCollector>>,
        config: RelayConfig,
    ) -> Self {
        Self {
            client,
            collector,
            header_timeout: config.header_timeout,
        }
    }

    /// GET forward. The handling path depends on the upstream content
    /// type: JSON is buffered, octet-stream is relayed as a byte stream,
    /// anything else is refused with 415 regardless of the upstream
    /// status.
    pub async fn forward_get(
        &self,
        target: &str,
        api_key: &str,
        params: &[(String, String)],
        ctx: &RequestContext,
        deployment: &Deployment,
    ) -> Result<ProxyResult, RelayError> {
        let outbound = OutboundRequest::new(Method::GET, target, api_key, params)?;
        let resp = self.execute(&outbound).await?;
        let status = resp.status();
        let kind = content::classify(declared_content_type(&resp));

        match kind {
            ContentKind::Json => {
                let body = resp.text().await?;
                debug!(
                    deployment = %deployment,
                    client = %ctx,
                    status = status.as_u16(),
                    "relayed GET"
                );
                Ok(ProxyResult::buffered(status, body))
            }
            ContentKind::Binary => {
                debug!(
                    deployment = %deployment,
                    client = %ctx,
                    status = status.as_u16(),
                    "streaming GET body"
                );
                Ok(ProxyResult::streamed(
                    status,
                    content::OCTET_STREAM,
                    relay_stream(resp),
                ))
            }
            ContentKind::Unsupported => {
                warn!(
                    deployment = %deployment,
                    content_type = declared_content_type(&resp).unwrap_or("<none>"),
                    "refusing unsupported upstream content type"
                );
                Ok(ProxyResult::buffered(
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    String::new(),
                ))
            }
        }
    }

    /// DELETE forward; the response is assumed small and structured, so
    /// it is always buffered whole, whatever its content type.
    pub async fn forward_delete(
        &self,
        target: &str,
        api_key: &str,
        params: &[(String, String)],
        ctx: &RequestContext,
        deployment: &Deployment,
    ) -> Result<ProxyResult, RelayError> {
        let outbound = OutboundRequest::new(Method::DELETE, target, api_key, params)?;
        let resp = self.execute(&outbound).await?;
        let status = resp.status();
        let body = resp.text().await?;

        debug!(
            deployment = %deployment,
            client = %ctx,
            status = status.as_u16(),
            "relayed DELETE"
        );
        Ok(ProxyResult::buffered(status, body))
    }

    /// Buffered POST forward. The full response body is read back and
    /// included in the usage report, then returned verbatim — non-2xx
    /// statuses included.
    pub async fn forward_post(
        &self,
        target: &str,
        api_key: &str,
        body: Value,
        params: &[(String, String)],
        ctx: &RequestContext,
        deployment: &Deployment,
    ) -> Result<ProxyResult, RelayError> {
        let outbound = OutboundRequest::new(Method::POST, target, api_key, params)?.with_body(body);
        let resp = self.execute(&outbound).await?;
        let status = resp.status();
        let text = resp.text().await?;

        self.report_usage(ctx, deployment, Some(&text));
        debug!(
            deployment = %deployment,
            client = %ctx,
            status = status.as_u16(),
            "relayed POST"
        );
        Ok(ProxyResult::buffered(status, text))
    }

    /// Streaming POST forward. Returns as soon as response headers
    /// arrive; the body is handed back as a stream to be copied to the
    /// client chunk by chunk. Token accounting is unavailable at this
    /// point, so the usage report carries no body.
    pub async fn forward_post_streaming(
        &self,
        target: &str,
        api_key: &str,
        body: Value,
        params: &[(String, String)],
        ctx: &RequestContext,
        deployment: &Deployment,
    ) -> Result<ProxyResult, RelayError> {
        let outbound = OutboundRequest::new(Method::POST, target, api_key, params)?.with_body(body);
        let resp = self.execute(&outbound).await?;
        let status = resp.status();

        self.report_usage(ctx, deployment, None);
        debug!(
            deployment = %deployment,
            client = %ctx,
            status = status.as_u16(),
            "streaming POST response"
        );
        Ok(ProxyResult::streamed(
            status,
            content::APPLICATION_JSON,
            relay_stream(resp),
        ))
    }

    /// Send the request with the header deadline applied. No retries: a
    /// transport failure surfaces to the service layer as-is.
    async fn execute(&self, outbound: &OutboundRequest) -> Result<reqwest::Response, RelayError> {
        match tokio::time::timeout(self.header_timeout, outbound.builder(&self.client).send()).await
        {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(err)) => Err(RelayError::Transport(err)),
            Err(_) => Err(RelayError::Timeout),
        }
    }

    fn report_usage(&self, ctx: &RequestContext, deployment: &Deployment, body: Option<&str>) {
        if let Some(collector) = &self.collector {
            collector.log_api_usage(ctx, deployment, body);
        }
    }
}

fn declared_content_type(resp: &reqwest::Response) -> Option<&str> {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
}

/// Relay the response body as a byte stream, chunk order preserved.
/// Read errors surface through the stream; a failed chunk ends the relay.
fn relay_stream(resp: reqwest::Response) -> ByteStream {
    resp.bytes_stream()
        .map(|chunk| {
            chunk.map_err(|err| {
                warn!(error = %err, "error reading upstream response");
                std::io::Error::other(err)
            })
        })
        .boxed()
}
