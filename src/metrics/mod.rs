pub mod http;

pub use http::HttpUsageCollector;

use crate::relay::{Deployment, RequestContext};

/// Usage-accounting sink, invoked once per POST-family forward after the
/// upstream responds.
///
/// Reporting is best-effort: an implementation must neither block nor
/// fail the response path. Buffered forwards pass the response body for
/// token extraction; streaming forwards pass `None` and are reconciled
/// out-of-band.
pub trait UsageCollector: Send + Sync {
    fn log_api_usage(
        &self,
        ctx: &RequestContext,
        deployment: &Deployment,
        response_body: Option<&str>,
    );
}
