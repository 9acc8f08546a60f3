use std::result;

use thiserror::Error;

/// Error types for Web of Science client operations
#[derive(Error, Debug)]
pub enum WosError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// XML payload could not be deserialized
    #[error("XML deserialization failed: {0}")]
    DeserializeError(#[from] quick_xml::DeError),

    /// XML parsing failed
    #[error("XML parsing failed: {0}")]
    XmlError(String),

    /// A query operation was attempted without a session token
    #[error("Session not open. Invoke connect() before.")]
    SessionNotOpen,

    /// A premium-only operation was invoked on a lite client
    #[error("Premium API required for {operation}, not available in lite mode")]
    PremiumRequired { operation: &'static str },

    /// The operation cannot work with the lite response shape
    #[error("{operation} is not implemented for WOS Lite")]
    NotSupportedInLite { operation: &'static str },

    /// The remote service answered with a SOAP fault
    #[error("SOAP fault {code}: {message}")]
    SoapFault { code: String, message: String },

    /// Non-success HTTP status without a SOAP fault body
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    /// Invalid query or pagination parameters
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Extraction path could not be parsed
    #[error("Invalid path expression: {0}")]
    InvalidPath(String),
}

pub type Result<T> = result::Result<T, WosError>;

impl WosError {
    /// Whether a caller-side retry has a reasonable chance of succeeding.
    ///
    /// The client itself never retries; this is a hint for callers that wrap
    /// operations in their own retry policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            WosError::RequestError(err) => {
                if err.is_timeout() || err.is_connect() {
                    return true;
                }

                if let Some(status) = err.status() {
                    return status.is_server_error() || status.as_u16() == 429;
                }

                !err.is_builder() && !err.is_redirect() && !err.is_decode()
            }

            WosError::ApiError { status, .. } => (500..600).contains(status) || *status == 429,

            // Faults carry the service's own verdict; throttling faults are
            // reported with a message naming the limit.
            WosError::SoapFault { message, .. } => {
                let lower_msg = message.to_lowercase();
                lower_msg.contains("throttle") || lower_msg.contains("temporarily unavailable")
            }

            WosError::DeserializeError(_)
            | WosError::XmlError(_)
            | WosError::SessionNotOpen
            | WosError::PremiumRequired { .. }
            | WosError::NotSupportedInLite { .. }
            | WosError::InvalidQuery(_)
            | WosError::InvalidPath(_) => false,
        }
    }

    /// Short human readable classification of the error
    pub fn retry_reason(&self) -> &str {
        match self {
            WosError::RequestError(err) if err.is_timeout() => "Request timeout",
            WosError::RequestError(err) if err.is_connect() => "Connection error",
            WosError::RequestError(_) => "Network error",
            WosError::ApiError { status, .. } => match status {
                429 => "Rate limit exceeded",
                500..=599 => "Server error",
                _ => "Client error",
            },
            WosError::SoapFault { .. } if self.is_retryable() => "Service throttled",
            WosError::SoapFault { .. } => "Remote fault",
            WosError::DeserializeError(_) | WosError::XmlError(_) => "Invalid XML response",
            WosError::SessionNotOpen => "Session not open",
            WosError::PremiumRequired { .. } | WosError::NotSupportedInLite { .. } => {
                "Capability not available"
            }
            WosError::InvalidQuery(_) | WosError::InvalidPath(_) => "Invalid input",
        }
    }
}
