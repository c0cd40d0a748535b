use thiserror::Error;

/// Type alias for Result with CourierError
pub type Result<T> = std::result::Result<T, CourierError>;

/// Error types for the conversion-and-delivery pipeline
#[derive(Error, Debug)]
pub enum CourierError {
    /// Gmail API returned an error
    #[error("Gmail API error: {0}")]
    ApiError(String),

    /// Authentication failed (missing credentials file, corrupt token cache, refresh failure)
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Rate limit exceeded - should retry after specified seconds
    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server returned 5xx error
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Bad request (400) - typically an invalid recipient or malformed payload
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden (403) - quota or permission problems on the sending account
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Payload rejected as too large (413) - attachments exceed the provider limit
    #[error("Message too large: {0}")]
    PayloadTooLarge(String),

    /// External converter could not be spawned or crashed
    #[error("Converter error: {0}")]
    ConverterError(String),

    /// An attachment path could not be read
    #[error("Attachment error for {path}: {message}")]
    AttachmentError { path: String, message: String },

    /// Message assembly or encoding failed
    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic catch-all error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl CourierError {
    /// Check if the error is transient and a later retry could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CourierError::RateLimitExceeded { .. }
                | CourierError::ServerError { .. }
                | CourierError::NetworkError(_)
        )
    }

    /// Check if the error is permanent and should not be retried
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Check if the error originated on the provider side rather than locally
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            CourierError::ApiError(_)
                | CourierError::RateLimitExceeded { .. }
                | CourierError::ServerError { .. }
                | CourierError::BadRequest(_)
                | CourierError::Forbidden(_)
                | CourierError::PayloadTooLarge(_)
        )
    }
}

/// Parse the Retry-After header from an HTTP response
///
/// Only the delay-seconds form (e.g. "120") is parsed; a missing or
/// malformed header yields a default of 5 seconds.
fn parse_retry_after_header<B>(response: &hyper::Response<B>) -> u64 {
    const DEFAULT_RETRY_AFTER: u64 = 5;

    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

impl From<google_gmail1::Error> for CourierError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            // HTTP response with status code (non-success responses)
            google_gmail1::Error::Failure(ref response) => {
                let status = response.status();
                let status_code = status.as_u16();
                let message = format!(
                    "HTTP {}: {}",
                    status_code,
                    status.canonical_reason().unwrap_or("Unknown")
                );

                match status_code {
                    // Rate limiting - transient
                    429 => {
                        let retry_after = parse_retry_after_header(response);
                        CourierError::RateLimitExceeded { retry_after }
                    }
                    // Bad request
                    400 => CourierError::BadRequest(message),
                    // Forbidden (includes sending quota exhaustion)
                    403 => CourierError::Forbidden(message),
                    // Payload too large
                    413 => CourierError::PayloadTooLarge(message),
                    // Server errors - transient
                    500..=599 => CourierError::ServerError {
                        status: status_code,
                        message,
                    },
                    // Other non-success status codes
                    _ => CourierError::ApiError(message),
                }
            }
            // BadRequest variant (request not understood by server)
            google_gmail1::Error::BadRequest(ref err) => CourierError::BadRequest(format!("{}", err)),
            // Network/connection errors - transient
            google_gmail1::Error::HttpError(ref err) => {
                CourierError::NetworkError(format!("Connection error: {}", err))
            }
            // IO errors - transient
            google_gmail1::Error::Io(err) => CourierError::NetworkError(err.to_string()),
            // All other errors
            _ => CourierError::ApiError(error.to_string()),
        }
    }
}
