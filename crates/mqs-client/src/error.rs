//! Error types for MQS operations.
//!
//! Errors fall into four groups:
//!
//! - **Local/transport errors** raised while building, signing, issuing or
//!   decoding a request. They are never retried by this crate.
//! - **Service errors** reported by the server in an `Error` body and
//!   classified through a static code table into an [`ErrorKind`].
//! - **Validation errors** raised before any network call.
//! - **Configuration errors** raised while constructing a client.

use crate::message::ErrorMessageResponse;
use thiserror::Error;

/// Comprehensive error type for all MQS operations
#[derive(Debug, Error)]
pub enum MqsError {
    #[error("Failed to marshal request body: {message}")]
    Marshal { message: String },

    #[error("Failed to build authorization header: {0}")]
    AuthHeader(#[from] SigningError),

    #[error("Failed to build HTTP request for '{resource}': {message}")]
    RequestBuild { resource: String, message: String },

    #[error("Connection failed for '{resource}': {message}")]
    Connection { resource: String, message: String },

    #[error("Request for '{resource}' timed out: {message}")]
    Timeout { resource: String, message: String },

    #[error("Failed to read response body for '{resource}': {message}")]
    ReadBody { resource: String, message: String },

    #[error("Failed to decode error response (status {status}) for '{resource}': {message}")]
    ErrorResponseDecode {
        status: u16,
        resource: String,
        message: String,
    },

    #[error("Failed to decode response for '{resource}': {message}")]
    Decode { resource: String, message: String },

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Receive worker pool for queue '{queue}' is already running")]
    PoolAlreadyRunning { queue: String },
}

impl MqsError {
    /// Check if error is transient and a caller-side retry may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::Timeout { .. } => true,
            Self::Service(service) => service.is_transient(),
            Self::Marshal { .. }
            | Self::AuthHeader(_)
            | Self::RequestBuild { .. }
            | Self::ReadBody { .. }
            | Self::ErrorResponseDecode { .. }
            | Self::Decode { .. }
            | Self::Validation(_)
            | Self::Configuration(_)
            | Self::PoolAlreadyRunning { .. } => false,
        }
    }

    /// Get the classified service error, if the server reported one
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::Service(service) => Some(service),
            _ => None,
        }
    }

    /// Get the server error kind, if the server reported one
    pub fn kind(&self) -> Option<ErrorKind> {
        self.service_error().map(|service| service.kind)
    }
}

// ============================================================================
// Service Errors
// ============================================================================

/// Structured kind of a server-reported error.
///
/// Produced by [`ErrorKind::classify`] from the `Code` element of an error
/// response. Codes that are not in the table map to
/// [`ErrorKind::Unrecognized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AccessDenied,
    InvalidAccessKeyId,
    InternalError,
    InvalidAuthorizationHeader,
    InvalidDateHeader,
    InvalidArgument,
    InvalidDigest,
    InvalidRequestUrl,
    InvalidQueryString,
    MalformedXml,
    MissingAuthorizationHeader,
    MissingDateHeader,
    MissingVersionHeader,
    MissingReceiptHandle,
    MissingVisibilityTimeout,
    MessageNotExist,
    QueueAlreadyExist,
    QueueDeletedRecently,
    InvalidQueueName,
    InvalidVersionHeader,
    InvalidContentType,
    QueueNameLengthError,
    QueueNotExist,
    ReceiptHandleError,
    SignatureDoesNotMatch,
    TimeExpired,
    RateLimitExceeded,
    /// The server returned a code this client does not know
    Unrecognized,
}

/// Server error codes and the kinds they classify to.
///
/// `InvalidDegist` is spelled the way the server sends it.
pub const ERROR_CODES: &[(&str, ErrorKind)] = &[
    ("AccessDenied", ErrorKind::AccessDenied),
    ("InvalidAccessKeyId", ErrorKind::InvalidAccessKeyId),
    ("InternalError", ErrorKind::InternalError),
    ("InvalidAuthorizationHeader", ErrorKind::InvalidAuthorizationHeader),
    ("InvalidDateHeader", ErrorKind::InvalidDateHeader),
    ("InvalidArgument", ErrorKind::InvalidArgument),
    ("InvalidDegist", ErrorKind::InvalidDigest),
    ("InvalidRequestURL", ErrorKind::InvalidRequestUrl),
    ("InvalidQueryString", ErrorKind::InvalidQueryString),
    ("MalformedXML", ErrorKind::MalformedXml),
    ("MissingAuthorizationHeader", ErrorKind::MissingAuthorizationHeader),
    ("MissingDateHeader", ErrorKind::MissingDateHeader),
    ("MissingVersionHeader", ErrorKind::MissingVersionHeader),
    ("MissingReceiptHandle", ErrorKind::MissingReceiptHandle),
    ("MissingVisibilityTimeout", ErrorKind::MissingVisibilityTimeout),
    ("MessageNotExist", ErrorKind::MessageNotExist),
    ("QueueAlreadyExist", ErrorKind::QueueAlreadyExist),
    ("QueueDeletedRecently", ErrorKind::QueueDeletedRecently),
    ("InvalidQueueName", ErrorKind::InvalidQueueName),
    ("InvalidVersionHeader", ErrorKind::InvalidVersionHeader),
    ("InvalidContentType", ErrorKind::InvalidContentType),
    ("QueueNameLengthError", ErrorKind::QueueNameLengthError),
    ("QueueNotExist", ErrorKind::QueueNotExist),
    ("ReceiptHandleError", ErrorKind::ReceiptHandleError),
    ("SignatureDoesNotMatch", ErrorKind::SignatureDoesNotMatch),
    ("TimeExpired", ErrorKind::TimeExpired),
    ("QpsLimitExceeded", ErrorKind::RateLimitExceeded),
];

impl ErrorKind {
    /// Map a server error code to its kind
    pub fn classify(code: &str) -> Self {
        ERROR_CODES
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, kind)| *kind)
            .unwrap_or(Self::Unrecognized)
    }

    /// Get the server code for this kind, `None` for [`ErrorKind::Unrecognized`]
    pub fn code(&self) -> Option<&'static str> {
        ERROR_CODES
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(code, _)| *code)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code() {
            Some(code) => write!(f, "{}", code),
            None => write!(f, "Unrecognized"),
        }
    }
}

/// Error reported by the MQS service.
///
/// Keeps every field the server sent, plus the HTTP status and the resource
/// path, whether or not the code was recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "MQS service error for '{resource}' (status {status}, kind {kind}): code: {code}, message: {message}, request id: {request_id}, host id: {host_id}"
)]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub status: u16,
    pub code: String,
    pub message: String,
    pub request_id: String,
    pub host_id: String,
    pub resource: String,
}

impl ServiceError {
    /// Classify a decoded error response
    pub fn from_response(response: ErrorMessageResponse, status: u16, resource: &str) -> Self {
        Self {
            kind: ErrorKind::classify(&response.code),
            status,
            code: response.code,
            message: response.message,
            request_id: response.request_id,
            host_id: response.host_id,
            resource: resource.to_string(),
        }
    }

    /// Check if the server condition is likely to clear on its own
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::InternalError | ErrorKind::RateLimitExceeded | ErrorKind::TimeExpired
        )
    }
}

// ============================================================================
// Local Errors
// ============================================================================

/// Errors while computing a request signature
#[derive(Debug, Clone, Error)]
pub enum SigningError {
    #[error("Failed to initialise HMAC: {message}")]
    InvalidKey { message: String },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },
}

/// Validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {value} (allowed {min}..={max})")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
