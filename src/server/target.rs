use url::Url;

use crate::relay::Deployment;

/// Build the upstream URL for a deployment operation: the configured
/// base joined with `deployments/{deployment}/{operation}`. Any query on
/// the base is discarded; forwarded parameters are applied separately by
/// the relay core.
pub fn build_target_url(
    base_url: &str,
    deployment: &Deployment,
    operation: &str,
) -> Result<String, String> {
    let mut parsed = Url::parse(base_url).map_err(|e| e.to_string())?;

    let root = parsed.path().trim_matches('/').to_string();
    let operation = operation.trim_matches('/');

    let mut path = String::from("/");
    for segment in [root.as_str(), "deployments", deployment.0.as_str(), operation] {
        if segment.is_empty() {
            continue;
        }
        if !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(segment);
    }

    parsed.set_path(&path);
    parsed.set_query(None);

    Ok(parsed.to_string())
}
