//! Per-call request construction

use crate::client::Requester;
use crate::error::{RequesterError, RequesterResult};
use crate::response::HttpResponse;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// HTTP verbs exposed by the requester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Returns the method as a string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            _ => Err(format!("Invalid HTTP method: {}", s)),
        }
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Delete => http::Method::DELETE,
        }
    }
}

/// Convert string pairs into a header map, rejecting invalid names/values
/// and names that repeat case-insensitively
pub fn to_header_map<'a, I>(headers: I) -> RequesterResult<HeaderMap>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let (header_name, header_value) = parse_header(name, value)?;
        if map.insert(header_name, header_value).is_some() {
            return Err(RequesterError::InvalidHeader(format!(
                "{}: duplicate header name",
                name.to_ascii_lowercase()
            )));
        }
    }
    Ok(map)
}

fn parse_header(name: &str, value: &str) -> RequesterResult<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| RequesterError::InvalidHeader(format!("{}: {}", name, e)))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| RequesterError::InvalidHeader(format!("{}: {}", name, e)))?;
    Ok((header_name, header_value))
}

/// A single call against a [`Requester`].
///
/// Headers set here override the requester's default headers with the same
/// name; other defaults are still sent. Construction errors are held until
/// [`send`](RequestBuilder::send) so calls can be chained.
///
/// ```ignore
/// let response = requester
///     .request(HttpMethod::Post, "widgets")
///     .header("X-Request-Id", "abc")
///     .json(&serde_json::json!({"name": "bolt"}))
///     .send()
///     .await?;
/// ```
#[derive(Debug)]
pub struct RequestBuilder {
    requester: Requester,
    pub(crate) method: HttpMethod,
    pub(crate) endpoint: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<serde_json::Value>,
    error: Option<RequesterError>,
}

impl RequestBuilder {
    pub(crate) fn new(requester: Requester, method: HttpMethod, endpoint: &str) -> Self {
        Self {
            requester,
            method,
            endpoint: endpoint.to_string(),
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    /// Add a per-call header
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if self.error.is_none() {
            match parse_header(name.as_ref(), value.as_ref()) {
                Ok((name, value)) => {
                    self.headers.insert(name, value);
                }
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// Add several per-call headers
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in headers {
            self = self.header(name, value);
        }
        self
    }

    /// Set a JSON request body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        if self.error.is_none() {
            match serde_json::to_value(body) {
                Ok(value) => self.body = Some(value),
                Err(e) => self.error = Some(RequesterError::Json(e.to_string())),
            }
        }
        self
    }

    /// Dispatch the request
    pub async fn send(self) -> RequesterResult<HttpResponse> {
        let RequestBuilder {
            requester,
            method,
            endpoint,
            headers,
            body,
            error,
        } = self;

        if let Some(err) = error {
            requester.logger().dispatch_failure(method, &endpoint, &err);
            return Err(err);
        }

        requester.execute(method, &endpoint, headers, body).await
    }
}
