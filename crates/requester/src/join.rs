//! Endpoint to URL resolution

use crate::error::{RequesterError, RequesterResult};
use url::Url;

/// How an endpoint is combined with the configured base URL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinPolicy {
    /// Standard relative-reference resolution against the base, which is
    /// normalized to end with exactly one `/`. Absolute endpoints and
    /// endpoints starting with `/` override the base path.
    #[default]
    Resolve,
    /// `"{base}/{endpoint}"`, always.
    Concat,
}

/// Resolves endpoints against a fixed base URL.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    policy: JoinPolicy,
    base: Option<String>,
    base_url: Option<Url>,
}

impl UrlResolver {
    /// Build a resolver, validating the base URL up front for `Resolve`
    pub fn new(base: Option<&str>, policy: JoinPolicy) -> RequesterResult<Self> {
        let (base, base_url) = match (base, policy) {
            (None, _) => (None, None),
            (Some(base), JoinPolicy::Resolve) => {
                let normalized = normalize_base(base);
                let url = Url::parse(&normalized)
                    .map_err(|e| RequesterError::InvalidUrl(format!("{}: {}", base, e)))?;
                (Some(normalized), Some(url))
            }
            (Some(base), JoinPolicy::Concat) => (Some(base.to_string()), None),
        };

        Ok(Self {
            policy,
            base,
            base_url,
        })
    }

    /// Base URL as used for joining (normalized under `Resolve`)
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn policy(&self) -> JoinPolicy {
        self.policy
    }

    /// Resolve an endpoint to the absolute URL a request is sent to
    pub fn resolve(&self, endpoint: &str) -> RequesterResult<Url> {
        let resolved = match self.policy {
            JoinPolicy::Resolve => match &self.base_url {
                Some(base) => base.join(endpoint),
                None => Url::parse(endpoint),
            },
            JoinPolicy::Concat => {
                let joined = format!("{}/{}", self.base.as_deref().unwrap_or_default(), endpoint);
                Url::parse(&joined)
            }
        };

        resolved.map_err(|e| RequesterError::InvalidUrl(format!("{}: {}", endpoint, e)))
    }
}

/// Strip trailing slashes and append exactly one
pub fn normalize_base(base: &str) -> String {
    format!("{}/", base.trim_end_matches('/'))
}
