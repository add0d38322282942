//! Requester error types and handling

use thiserror::Error;

/// Errors surfaced by [`Requester`](crate::Requester) calls.
///
/// Only dispatch-level failures end up here. Body decode failures are
/// recovered by falling back to text and never reach the caller.
#[derive(Error, Debug)]
pub enum RequesterError {
    /// The requester was closed before the call was made
    #[error("Requester is closed")]
    Closed,

    /// Header name or value rejected by the HTTP layer
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Base URL or endpoint that cannot form an absolute URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Request body could not be serialized
    #[error("JSON error: {0}")]
    Json(String),

    /// Transport failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type for requester operations
pub type RequesterResult<T> = Result<T, RequesterError>;

/// Error category for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequesterErrorCategory {
    /// Connection-related errors (DNS, TCP, TLS)
    Connection,
    /// Timeout errors
    Timeout,
    /// Invalid request construction
    Request,
    /// Failure while receiving the response
    Response,
    /// Call made against a closed requester
    Lifecycle,
    /// Unknown/other errors
    Unknown,
}

impl RequesterError {
    /// Categorize the error for reporting
    pub fn category(&self) -> RequesterErrorCategory {
        match self {
            RequesterError::Closed => RequesterErrorCategory::Lifecycle,
            RequesterError::InvalidHeader(_)
            | RequesterError::InvalidUrl(_)
            | RequesterError::Json(_)
            | RequesterError::UrlParse(_) => RequesterErrorCategory::Request,
            RequesterError::Reqwest(e) => {
                if e.is_connect() {
                    RequesterErrorCategory::Connection
                } else if e.is_timeout() {
                    RequesterErrorCategory::Timeout
                } else if e.is_body() || e.is_decode() {
                    RequesterErrorCategory::Response
                } else if e.is_request() || e.is_builder() {
                    RequesterErrorCategory::Request
                } else {
                    RequesterErrorCategory::Unknown
                }
            }
        }
    }

    /// Full error message including every `source()` in the chain
    pub fn diagnostic(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            let cause_msg = cause.to_string();
            // thiserror's #[from] variants repeat the inner message
            if !message.ends_with(&cause_msg) {
                message.push_str(": ");
                message.push_str(&cause_msg);
            }
            source = cause.source();
        }
        message
    }

    /// Diagnostic message with credentials and tokens removed
    pub fn sanitized_message(&self) -> String {
        sanitize_error_message(&self.diagnostic())
    }
}

/// Sanitize error messages by removing sensitive information
fn sanitize_error_message(msg: &str) -> String {
    use regex::Regex;
    use std::sync::OnceLock;

    static URL_CREDS_RE: OnceLock<Regex> = OnceLock::new();
    static AUTH_HEADER_RE: OnceLock<Regex> = OnceLock::new();
    static KEY_PARAM_RE: OnceLock<Regex> = OnceLock::new();

    let url_creds_re = URL_CREDS_RE
        .get_or_init(|| Regex::new(r"(https?)://[^@/\s:]+:[^@/\s]+@").expect("valid regex"));
    let auth_header_re = AUTH_HEADER_RE.get_or_init(|| {
        Regex::new(r"(?i)(authorization:\s*bearer|bearer)\s*[:=]?\s*\S+").expect("valid regex")
    });
    // separator required: a bare "token" path segment is not a secret
    let key_param_re = KEY_PARAM_RE.get_or_init(|| {
        Regex::new(r"(?i)(api[_-]?key|token)\s*[:=]\s*[^\s&)]+").expect("valid regex")
    });

    let sanitized = url_creds_re.replace_all(msg, "$1://[REDACTED]@");
    let sanitized = auth_header_re.replace_all(&sanitized, "$1: [REDACTED]");
    let sanitized = key_param_re.replace_all(&sanitized, "$1=[REDACTED]");

    sanitized.to_string()
}
