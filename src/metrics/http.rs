use std::time::Duration;

use tracing::warn;

use crate::protocol::UsageReport;
use crate::relay::{Deployment, RequestContext};

use super::UsageCollector;

/// Collector that POSTs usage reports to an external endpoint.
///
/// Delivery happens on a detached task with a bounded timeout, so a slow
/// or failing collector never holds up the forwarded response.
pub struct HttpUsageCollector {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpUsageCollector {
    pub fn new(endpoint: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build usage report client");

        Self { endpoint, client }
    }
}

impl UsageCollector for HttpUsageCollector {
    fn log_api_usage(
        &self,
        ctx: &RequestContext,
        deployment: &Deployment,
        response_body: Option<&str>,
    ) {
        let report = UsageReport {
            client_id: ctx.0.clone(),
            deployment: deployment.0.clone(),
            response_body: response_body.map(|body| body.to_string()),
        };
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();

        tokio::spawn(async move {
            match client.post(&endpoint).json(&report).send().await {
                Ok(resp) if !resp.status().is_success() => {
                    warn!(
                        status = resp.status().as_u16(),
                        "usage collector rejected report"
                    );
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "failed to deliver usage report");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_report_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/usage"))
            .and(body_partial_json(serde_json::json!({
                "client_id": "client-1",
                "deployment": "chat-large",
                "response_body": "{\"usage\":{}}",
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let collector = HttpUsageCollector::new(format!("{}/usage", server.uri()));
        collector.log_api_usage(
            &RequestContext("client-1".into()),
            &Deployment("chat-large".into()),
            Some("{\"usage\":{}}"),
        );

        // Delivery is detached; poll until the mock has seen it.
        for _ in 0..50 {
            if !server.received_requests().await.unwrap_or_default().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_streaming_report_omits_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/usage"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let collector = HttpUsageCollector::new(format!("{}/usage", server.uri()));
        collector.log_api_usage(
            &RequestContext("client-1".into()),
            &Deployment("chat-large".into()),
            None,
        );

        let mut seen = Vec::new();
        for _ in 0..50 {
            seen = server.received_requests().await.unwrap_or_default();
            if !seen.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(seen.len(), 1);
        let report: serde_json::Value = serde_json::from_slice(&seen[0].body).unwrap();
        assert!(report.get("response_body").is_none());
    }
}
