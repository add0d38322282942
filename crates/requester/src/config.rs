//! Requester configuration

use crate::join::JoinPolicy;
use crate::logging::LogTarget;
use std::collections::HashMap;

/// Configuration for a [`Requester`](crate::Requester)
///
/// Timeouts, pooling, redirects and TLS are left at the transport's
/// defaults.
#[derive(Debug)]
pub struct RequesterConfig {
    /// Base URL endpoints are joined against (e.g., "https://api.example.com")
    pub base_url: Option<String>,

    /// Headers sent with every request
    pub headers: HashMap<String, String>,

    /// How endpoints are joined with the base URL
    pub join_policy: JoinPolicy,

    /// Where request records are logged
    pub log: LogTarget,

    /// User-Agent header value
    pub user_agent: String,
}

impl Default for RequesterConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            headers: HashMap::new(),
            join_policy: JoinPolicy::default(),
            log: LogTarget::Disabled,
            user_agent: format!("requester/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl RequesterConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Add a default header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add several default headers
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the join policy
    pub fn join_policy(mut self, policy: JoinPolicy) -> Self {
        self.join_policy = policy;
        self
    }

    /// Set the log target
    pub fn log(mut self, target: impl Into<LogTarget>) -> Self {
        self.log = target.into();
        self
    }

    /// Set the User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
