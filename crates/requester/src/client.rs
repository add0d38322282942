//! Requester: base-URL aware HTTP session with request logging

use crate::config::RequesterConfig;
use crate::error::{RequesterError, RequesterResult};
use crate::join::UrlResolver;
use crate::logging::RequestLogger;
use crate::request::{to_header_map, HttpMethod, RequestBuilder};
use crate::response::{from_reqwest, HttpResponse};
use http::header::HeaderMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Async HTTP requester holding one transport session for its lifetime
///
/// Every call resolves the endpoint against the base URL, logs `"<status> <url>"`
/// (INFO for 200, WARN otherwise) and returns the response with its body
/// decoded. Dispatch failures are logged and returned; decode failures fall
/// back to text.
///
/// Clones share the same session. [`close`](Requester::close) releases it for
/// all of them.
///
/// # Example
///
/// ```ignore
/// use requester::{LogTarget, Requester, RequesterConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), requester::RequesterError> {
///     let config = RequesterConfig::new()
///         .base_url("http://api.example.com/")
///         .log(LogTarget::make_writer(std::io::stderr));
///
///     Requester::new(config)?
///         .scoped(|requester| async move {
///             let (status, body) = requester.get("widgets/42").await?.into_parts();
///             println!("{} {:?}", status, body);
///             Ok(())
///         })
///         .await
/// }
/// ```
#[derive(Clone)]
pub struct Requester {
    inner: Arc<RequesterInner>,
}

struct RequesterInner {
    session: RwLock<Option<reqwest::Client>>,
    resolver: UrlResolver,
    logger: RequestLogger,
}

impl Requester {
    /// Create a requester and open its session
    pub fn new(config: RequesterConfig) -> RequesterResult<Self> {
        let RequesterConfig {
            base_url,
            headers,
            join_policy,
            log,
            user_agent,
        } = config;

        let logger = RequestLogger::new(log);
        let resolver = UrlResolver::new(base_url.as_deref(), join_policy)?;
        let default_headers = to_header_map(&headers)?;

        let session = reqwest::Client::builder()
            .default_headers(default_headers)
            .user_agent(user_agent)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            inner: Arc::new(RequesterInner {
                session: RwLock::new(Some(session)),
                resolver,
                logger,
            }),
        })
    }

    /// Create a requester with default configuration
    pub fn default_requester() -> RequesterResult<Self> {
        Self::new(RequesterConfig::default())
    }

    /// Get the base URL endpoints are joined against
    pub fn base_url(&self) -> Option<&str> {
        self.inner.resolver.base()
    }

    /// The instance-scoped logger
    pub fn logger(&self) -> &RequestLogger {
        &self.inner.logger
    }

    /// Resolve an endpoint to the URL a request would be sent to
    pub fn resolve(&self, endpoint: &str) -> RequesterResult<Url> {
        self.inner.resolver.resolve(endpoint)
    }

    /// Send a GET request
    pub async fn get(&self, endpoint: &str) -> RequesterResult<HttpResponse> {
        self.request(HttpMethod::Get, endpoint).send().await
    }

    /// Send a POST request with JSON body
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> RequesterResult<HttpResponse> {
        self.request(HttpMethod::Post, endpoint).json(body).send().await
    }

    /// Send a PUT request with JSON body
    pub async fn put<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> RequesterResult<HttpResponse> {
        self.request(HttpMethod::Put, endpoint).json(body).send().await
    }

    /// Send a DELETE request
    pub async fn delete(&self, endpoint: &str) -> RequesterResult<HttpResponse> {
        self.request(HttpMethod::Delete, endpoint).send().await
    }

    /// Create a request builder for per-call headers or bodies on any verb
    pub fn request(&self, method: HttpMethod, endpoint: &str) -> RequestBuilder {
        RequestBuilder::new(self.clone(), method, endpoint)
    }

    /// Execute a request, logging any dispatch failure before returning it
    pub(crate) async fn execute(
        &self,
        method: HttpMethod,
        endpoint: &str,
        headers: HeaderMap,
        body: Option<serde_json::Value>,
    ) -> RequesterResult<HttpResponse> {
        self.dispatch(method, endpoint, headers, body)
            .await
            .inspect_err(|e| self.inner.logger.dispatch_failure(method, endpoint, e))
    }

    async fn dispatch(
        &self,
        method: HttpMethod,
        endpoint: &str,
        headers: HeaderMap,
        body: Option<serde_json::Value>,
    ) -> RequesterResult<HttpResponse> {
        let session = self.session()?;
        let url = self.inner.resolver.resolve(endpoint)?;

        let mut builder = session.request(method.into(), url).headers(headers);
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let start = Instant::now();
        let response = builder.send().await?;
        let latency_ms = millis(start.elapsed());

        self.inner
            .logger
            .response(response.status().as_u16(), response.url().as_str(), latency_ms);

        from_reqwest(response, latency_ms, &self.inner.logger).await
    }

    fn session(&self) -> RequesterResult<reqwest::Client> {
        self.inner
            .session
            .read()
            .as_ref()
            .cloned()
            .ok_or(RequesterError::Closed)
    }

    /// Release the session. Later calls fail with [`RequesterError::Closed`].
    ///
    /// Returns `true` if this call closed the session, `false` if it was
    /// already closed.
    pub fn close(&self) -> bool {
        self.inner.close()
    }

    /// Whether the session has been released
    pub fn is_closed(&self) -> bool {
        self.inner.session.read().is_none()
    }

    /// Run `f` with this requester and close the session once it completes,
    /// whether it succeeded, failed, panicked or was cancelled.
    pub async fn scoped<F, Fut, T, E>(self, f: F) -> Result<T, E>
    where
        F: FnOnce(Requester) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let _guard = CloseOnDrop(self.clone());
        f(self).await
    }
}

/// Whole milliseconds, saturating at `u64::MAX`
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Closes the session when a scope ends, including when its future is dropped
struct CloseOnDrop(Requester);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

impl RequesterInner {
    fn close(&self) -> bool {
        let session = self.session.write().take();
        match session {
            Some(session) => {
                // in-flight clones of the handle keep the pool alive until they finish
                drop(session);
                self.logger.session_closed(self.resolver.base());
                true
            }
            None => false,
        }
    }
}

impl Drop for RequesterInner {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Requester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requester")
            .field("base_url", &self.inner.resolver.base())
            .field("join_policy", &self.inner.resolver.policy())
            .field("closed", &self.is_closed())
            .finish()
    }
}
