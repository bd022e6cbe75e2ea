/// Split a raw query string into ordered key/value pairs.
///
/// Pairs are kept byte-for-byte: no percent decoding, so surviving
/// parameters reach the upstream exactly as the client sent them. A
/// parameter without `=` gets an empty value.
pub fn parse_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (part.to_string(), String::new()),
        })
        .collect()
}

/// Join parameters as `key=value` pairs separated by `&`, dropping any
/// pair whose value is empty. Returns `None` when nothing survives, so
/// the caller can clear the query component entirely.
pub fn filter_join(params: &[(String, String)]) -> Option<String> {
    let joined = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_pairs_ordered() {
        assert_eq!(
            parse_pairs("a=1&b=2&c=3"),
            pairs(&[("a", "1"), ("b", "2"), ("c", "3")])
        );
    }

    #[test]
    fn test_parse_pairs_missing_value() {
        assert_eq!(parse_pairs("a=1&b&c="), pairs(&[("a", "1"), ("b", ""), ("c", "")]));
    }

    #[test]
    fn test_parse_pairs_empty() {
        assert!(parse_pairs("").is_empty());
    }

    #[test]
    fn test_parse_pairs_no_decoding() {
        assert_eq!(
            parse_pairs("name=a%20b"),
            pairs(&[("name", "a%20b")])
        );
    }

    #[test]
    fn test_filter_join_drops_empty_values() {
        let params = pairs(&[("api-version", "2024-01-01"), ("foo", "")]);
        assert_eq!(filter_join(&params).as_deref(), Some("api-version=2024-01-01"));
    }

    #[test]
    fn test_filter_join_keeps_order() {
        let params = pairs(&[("b", "2"), ("a", "1"), ("gone", ""), ("c", "3")]);
        assert_eq!(filter_join(&params).as_deref(), Some("b=2&a=1&c=3"));
    }

    #[test]
    fn test_filter_join_all_empty() {
        let params = pairs(&[("a", ""), ("b", "")]);
        assert_eq!(filter_join(&params), None);
        assert_eq!(filter_join(&[]), None);
    }
}
