//! Per-requester log sink
//!
//! Each [`Requester`](crate::Requester) owns its own `tracing` dispatcher
//! instead of installing a global subscriber. Records are written through a
//! `tracing_subscriber::fmt` layer as `<timestamp> <LEVEL> <message>` lines.
//!
//! Logging can never break requests: a target that cannot be opened leaves
//! the logger disabled and remembers why in [`RequestLogger::setup_error`].

use crate::error::RequesterError;
use crate::request::HttpMethod;
use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Dispatch;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;

/// Where a requester writes its log records
#[derive(Default)]
pub enum LogTarget {
    /// No sink attached
    #[default]
    Disabled,
    /// Append to the file at this path (created if missing)
    Named(PathBuf),
    /// Arbitrary writer
    Sink(BoxMakeWriter),
}

impl LogTarget {
    /// Log to a named file
    pub fn named(path: impl Into<PathBuf>) -> Self {
        LogTarget::Named(path.into())
    }

    /// Log to any writer
    pub fn sink<W>(writer: W) -> Self
    where
        W: io::Write + Send + 'static,
    {
        LogTarget::Sink(BoxMakeWriter::new(Mutex::new(writer)))
    }

    /// Log through a `MakeWriter` (e.g. `std::io::stderr`)
    pub fn make_writer<M>(make_writer: M) -> Self
    where
        M: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        LogTarget::Sink(BoxMakeWriter::new(make_writer))
    }
}

impl From<bool> for LogTarget {
    /// `false` disables logging, `true` logs to `requester.log`
    fn from(enabled: bool) -> Self {
        if enabled {
            LogTarget::named(DEFAULT_LOG_FILE)
        } else {
            LogTarget::Disabled
        }
    }
}

impl fmt::Debug for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogTarget::Disabled => f.write_str("Disabled"),
            LogTarget::Named(path) => f.debug_tuple("Named").field(path).finish(),
            LogTarget::Sink(_) => f.write_str("Sink(..)"),
        }
    }
}

/// File used when logging is switched on without a target
pub const DEFAULT_LOG_FILE: &str = "requester.log";

/// Instance-scoped logger owned by a requester
pub struct RequestLogger {
    dispatch: Option<Dispatch>,
    setup_error: Option<String>,
}

impl RequestLogger {
    /// Resolve a target into a logger. Never fails.
    pub fn new(target: LogTarget) -> Self {
        let writer = match target {
            LogTarget::Disabled => return Self::disabled(),
            LogTarget::Sink(writer) => writer,
            LogTarget::Named(path) => {
                match OpenOptions::new().create(true).append(true).open(&path) {
                    Ok(file) => BoxMakeWriter::new(Mutex::new(file)),
                    Err(e) => {
                        return Self {
                            dispatch: None,
                            setup_error: Some(format!("{}: {}", path.display(), e)),
                        }
                    }
                }
            }
        };

        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        Self {
            dispatch: Some(Dispatch::new(subscriber)),
            setup_error: None,
        }
    }

    /// Logger with no sink
    pub fn disabled() -> Self {
        Self {
            dispatch: None,
            setup_error: None,
        }
    }

    /// Whether records are written anywhere
    pub fn is_enabled(&self) -> bool {
        self.dispatch.is_some()
    }

    /// Why the configured target could not be attached, if it failed
    pub fn setup_error(&self) -> Option<&str> {
        self.setup_error.as_deref()
    }

    fn emit(&self, event: impl FnOnce()) {
        if let Some(dispatch) = &self.dispatch {
            tracing::dispatcher::with_default(dispatch, event);
        }
    }

    /// INFO for exactly 200, WARN for anything else
    pub(crate) fn response(&self, status: u16, url: &str, latency_ms: u64) {
        self.emit(|| {
            if status == 200 {
                tracing::info!(latency_ms, "{} {}", status, url);
            } else {
                tracing::warn!(latency_ms, "{} {}", status, url);
            }
        });
    }

    pub(crate) fn dispatch_failure(&self, method: HttpMethod, target: &str, err: &RequesterError) {
        self.emit(|| {
            tracing::error!(
                category = ?err.category(),
                "{} {} failed: {}",
                method,
                target,
                err.sanitized_message()
            );
        });
    }

    pub(crate) fn decode_fallback(&self, url: &str, reason: &str) {
        self.emit(|| {
            tracing::debug!("{} body returned as text: {}", url, reason);
        });
    }

    pub(crate) fn session_closed(&self, base_url: Option<&str>) {
        self.emit(|| {
            tracing::debug!("session closed (base_url={})", base_url.unwrap_or("-"));
        });
    }
}

impl fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogger")
            .field("enabled", &self.is_enabled())
            .field("setup_error", &self.setup_error)
            .finish()
    }
}
