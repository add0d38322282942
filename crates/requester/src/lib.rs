//! requester: async HTTP client wrapper
//!
//! Thin layer over a pooled `reqwest` session that adds:
//! - base-URL joining (`JoinPolicy::Resolve` or `JoinPolicy::Concat`)
//! - default and per-call headers (per-call wins on conflicts)
//! - JSON/text response decoding that never fails the call
//! - an instance-scoped request log (`LogTarget`)
//!
//! # Architecture
//!
//! - `Requester`: owns the session, exposes `get`/`post`/`put`/`delete`
//! - `RequestBuilder`: per-call headers and body
//! - `HttpResponse`: status, final URL, headers and decoded `ResponseBody`
//! - `RequestLogger`: `tracing` dispatcher bound to one requester

pub mod client;
pub mod config;
pub mod error;
pub mod join;
pub mod logging;
pub mod request;
pub mod response;

pub use client::Requester;
pub use config::RequesterConfig;
pub use error::{RequesterError, RequesterErrorCategory, RequesterResult};
pub use join::{JoinPolicy, UrlResolver};
pub use logging::{LogTarget, RequestLogger};
pub use request::{HttpMethod, RequestBuilder};
pub use response::{HttpResponse, ResponseBody};
