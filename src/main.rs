mod config;
mod metrics;
mod protocol;
mod relay;
mod server;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::{trim_base_url, Config};
use metrics::{HttpUsageCollector, UsageCollector};
use relay::Forwarder;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    // Configure logging
    match config.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(env_filter())
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(env_filter()).init();
        }
    }

    // Validate required config
    let base_url = match &config.upstream_base_url {
        Some(url) => trim_base_url(url),
        None => {
            error!("UPSTREAM_BASE_URL is required");
            std::process::exit(1);
        }
    };

    let api_key = match &config.upstream_api_key {
        Some(key) => {
            if std::env::var("UPSTREAM_API_KEY").is_err() {
                warn!("upstream API key provided via command-line flag - use UPSTREAM_API_KEY env var in production");
            }
            key.clone()
        }
        None => {
            error!("UPSTREAM_API_KEY is required");
            std::process::exit(1);
        }
    };

    // Usage collector
    let collector: Option<Arc<dyn UsageCollector>> = match &config.usage_endpoint {
        Some(endpoint) => {
            info!(endpoint = endpoint.as_str(), "usage reporting enabled");
            Some(Arc::new(HttpUsageCollector::new(endpoint.clone())))
        }
        None => None,
    };

    // Outbound HTTP client; connection pooling stays inside the transport
    let http_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .build()
        .expect("failed to build HTTP client");

    let forwarder = Forwarder::new(http_client, collector);

    info!(upstream = base_url.as_str(), "forwarding to upstream");

    let app = server::build_router(forwarder, base_url, api_key);

    let addr = normalize_addr(&config.addr);
    let listener = TcpListener::bind(&addr).await.unwrap_or_else(|e| {
        error!(addr = addr, error = %e, "failed to bind");
        std::process::exit(1);
    });

    info!(addr = addr, "server starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "server error");
            std::process::exit(1);
        });

    info!("server stopped");
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Accept a bare ":8080" listen address alongside full host:port forms.
fn normalize_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
