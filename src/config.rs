use clap::Parser;

/// Inference relay — forwards deployment-scoped calls to one upstream
/// inference endpoint.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Config {
    /// Listen address (e.g. ":8080" or "0.0.0.0:8080")
    #[arg(long, default_value = ":8080", env = "ADDR")]
    pub addr: String,

    /// Log format: "text" or "json"
    #[arg(long, default_value = "text", env = "LOG_FORMAT")]
    pub log_format: String,

    /// Upstream inference endpoint base URL
    #[arg(long, env = "UPSTREAM_BASE_URL")]
    pub upstream_base_url: Option<String>,

    /// Upstream API key, sent as the `api-key` request header
    #[arg(long, env = "UPSTREAM_API_KEY")]
    pub upstream_api_key: Option<String>,

    /// Usage collector endpoint; leave unset to disable usage reporting
    #[arg(long, env = "USAGE_ENDPOINT")]
    pub usage_endpoint: Option<String>,
}

/// Strip trailing slashes so later path joins never produce `//`.
pub fn trim_base_url(raw: &str) -> String {
    raw.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_base_url_strips_trailing_slash() {
        assert_eq!(
            trim_base_url("https://inference.example.com/"),
            "https://inference.example.com"
        );
        assert_eq!(
            trim_base_url("https://inference.example.com/api///"),
            "https://inference.example.com/api"
        );
    }

    #[test]
    fn test_trim_base_url_untouched_without_slash() {
        assert_eq!(
            trim_base_url("https://inference.example.com/api"),
            "https://inference.example.com/api"
        );
    }
}
