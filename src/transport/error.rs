//! Outbound HTTP error types.

use thiserror::Error;

/// Errors that can occur while sending a request.
///
/// An HTTP error status is not an error here; only failures to obtain a
/// response at all are.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection failures, DNS resolution errors and other network-level issues.
    #[error("Network error: {0}")]
    Network(String),

    /// The request took longer than its timeout.
    #[error("Request timed out")]
    Timeout,

    /// The URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Certificate validation or handshake failures.
    #[error("TLS/SSL error: {0}")]
    Tls(String),

    /// The request could not be constructed (bad method, header, ...).
    #[error("Request build error: {0}")]
    Build(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_builder() {
            TransportError::Build(message)
        } else if message.contains("certificate") || message.contains("TLS") || message.contains("SSL")
        {
            TransportError::Tls(message)
        } else {
            TransportError::Network(message)
        }
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        TransportError::InvalidUrl(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            TransportError::Network("Connection refused".to_string()).to_string(),
            "Network error: Connection refused"
        );
        assert_eq!(TransportError::Timeout.to_string(), "Request timed out");
        assert_eq!(
            TransportError::InvalidUrl("not a url".to_string()).to_string(),
            "Invalid URL: not a url"
        );
    }

    #[test]
    fn test_from_url_parse_error() {
        let err: TransportError = url::Url::parse("no scheme").unwrap_err().into();
        assert!(matches!(err, TransportError::InvalidUrl(_)));
    }
}
