//! Diagnostic Sink
//!
//! Caller-supplied callback receiving human-readable diagnostic messages.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

type SinkFn = dyn Fn(&str) + Send + Sync;

/// Receives diagnostic strings from any in-flight cache operation.
///
/// The default sink discards everything. A panicking callback is contained
/// here and never unwinds into the store.
#[derive(Clone, Default)]
pub struct DiagnosticSink {
    inner: Option<Arc<SinkFn>>,
}

impl DiagnosticSink {
    /// Creates a sink forwarding every message to `f`.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            inner: Some(Arc::new(f)),
        }
    }

    /// A sink that drops every message.
    pub fn noop() -> Self {
        Self::default()
    }

    /// Delivers one message.
    pub fn emit(&self, message: &str) {
        if let Some(f) = &self.inner {
            if panic::catch_unwind(AssertUnwindSafe(|| f(message))).is_err() {
                tracing::warn!("diagnostic sink panicked while handling: {}", message);
            }
        }
    }

    pub fn is_noop(&self) -> bool {
        self.inner.is_none()
    }
}

impl fmt::Debug for DiagnosticSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticSink")
            .field("noop", &self.is_noop())
            .finish()
    }
}
