use crate::base::{ChannelError, Result};

/// Create a standard HTTP client with timeout
pub fn create_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(|e| ChannelError::Error(format!("Failed to build HTTP client: {}", e)))
}

/// Longest rate-limit wait honored before retrying
pub const MAX_RETRY_AFTER_SECS: f64 = 60.0;

/// Read the `retry-after` header (seconds, possibly fractional), capped at
/// [`MAX_RETRY_AFTER_SECS`]
pub fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> Option<f64> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| secs.min(MAX_RETRY_AFTER_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_retry_after_secs() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after_secs(&headers), None);

        headers.insert("retry-after", HeaderValue::from_static("1.5"));
        assert_eq!(retry_after_secs(&headers), Some(1.5));

        headers.insert("retry-after", HeaderValue::from_static("soon"));
        assert_eq!(retry_after_secs(&headers), None);

        headers.insert("retry-after", HeaderValue::from_static("-3"));
        assert_eq!(retry_after_secs(&headers), None);
    }

    #[test]
    fn test_retry_after_huge_value_is_capped() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("1e20"));
        let secs = retry_after_secs(&headers).unwrap();
        assert_eq!(secs, MAX_RETRY_AFTER_SECS);
        // Must not panic when turned into a sleep
        assert_eq!(std::time::Duration::from_secs_f64(secs).as_secs(), 60);
    }
}
