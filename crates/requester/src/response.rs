//! Response types and body decoding

use crate::error::RequesterResult;
use crate::logging::RequestLogger;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Body of a JSON response
    Json(Value),
    /// Anything else, or JSON that failed to decode
    Text(String),
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(v) => Some(v),
            ResponseBody::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(t) => Some(t),
            ResponseBody::Json(_) => None,
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, ResponseBody::Json(_))
    }
}

/// Buffered response with its body already decoded
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status_code: u16,

    /// Final URL (may differ from the resolved URL due to redirects)
    pub url: String,

    /// Response headers
    pub headers: HashMap<String, String>,

    /// JSON or text body
    pub body: ResponseBody,

    /// Time until response headers arrived, in milliseconds
    pub latency_ms: u64,
}

impl HttpResponse {
    /// Check if status is success (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Check if status is client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code)
    }

    /// Check if status is server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code)
    }

    /// Get latency as Duration
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    /// Get a header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get content type
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Deserialize a JSON body into `T`
    pub fn json_as<T: serde::de::DeserializeOwned>(&self) -> Option<serde_json::Result<T>> {
        self.body.as_json().map(|v| T::deserialize(v))
    }

    /// `(status, body)` pair
    pub fn into_parts(self) -> (u16, ResponseBody) {
        (self.status_code, self.body)
    }
}

/// Whether a content type negotiates as JSON
pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || mime.ends_with("+json")
}

/// Decode a body: JSON when the content type says so, text otherwise.
///
/// A JSON content type with an empty body decodes to `null`. One with an
/// undecodable body falls back to text and is recorded at debug level.
pub fn decode_body(
    content_type: Option<&str>,
    body: &[u8],
    url: &str,
    logger: &RequestLogger,
) -> ResponseBody {
    if !is_json_content_type(content_type) {
        logger.decode_fallback(
            url,
            &format!("content type {} is not JSON", content_type.unwrap_or("<none>")),
        );
        return ResponseBody::Text(String::from_utf8_lossy(body).into_owned());
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return ResponseBody::Json(Value::Null);
    }

    match serde_json::from_slice(body) {
        Ok(value) => ResponseBody::Json(value),
        Err(e) => {
            logger.decode_fallback(url, &e.to_string());
            ResponseBody::Text(String::from_utf8_lossy(body).into_owned())
        }
    }
}

/// Read and decode a reqwest response
pub(crate) async fn from_reqwest(
    response: reqwest::Response,
    latency_ms: u64,
    logger: &RequestLogger,
) -> RequesterResult<HttpResponse> {
    let status_code = response.status().as_u16();
    let url = response.url().to_string();

    let mut headers = HashMap::new();
    for (name, value) in response.headers().iter() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.to_string(), v.to_string());
        }
    }

    let bytes = response.bytes().await?;
    let content_type = headers.get("content-type").map(String::as_str);
    let body = decode_body(content_type, &bytes, &url, logger);

    Ok(HttpResponse {
        status_code,
        url,
        headers,
        body,
        latency_ms,
    })
}
