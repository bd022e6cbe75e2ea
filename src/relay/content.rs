/// Content types the relay knows how to deliver.
pub const APPLICATION_JSON: &str = "application/json";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Handling class for an upstream response, decided by its declared
/// content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Small structured response, buffered whole.
    Json,
    /// Binary payload, relayed as a byte stream without buffering.
    Binary,
    /// Anything else; refused with 415.
    Unsupported,
}

/// Classify a declared content type. Parameters such as `charset` are
/// ignored; a missing header classifies as unsupported.
pub fn classify(content_type: Option<&str>) -> ContentKind {
    let Some(value) = content_type else {
        return ContentKind::Unsupported;
    };

    let essence = value.split(';').next().unwrap_or("").trim();
    if essence.eq_ignore_ascii_case(APPLICATION_JSON) {
        ContentKind::Json
    } else if essence.eq_ignore_ascii_case(OCTET_STREAM) {
        ContentKind::Binary
    } else {
        ContentKind::Unsupported
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_json() {
        assert_eq!(classify(Some("application/json")), ContentKind::Json);
        assert_eq!(
            classify(Some("application/json; charset=utf-8")),
            ContentKind::Json
        );
        assert_eq!(classify(Some("Application/JSON")), ContentKind::Json);
    }

    #[test]
    fn test_classify_binary() {
        assert_eq!(
            classify(Some("application/octet-stream")),
            ContentKind::Binary
        );
    }

    #[test]
    fn test_classify_unsupported() {
        assert_eq!(classify(Some("text/plain")), ContentKind::Unsupported);
        assert_eq!(classify(Some("text/event-stream")), ContentKind::Unsupported);
        assert_eq!(classify(Some("")), ContentKind::Unsupported);
        assert_eq!(classify(None), ContentKind::Unsupported);
    }
}
