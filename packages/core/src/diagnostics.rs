//! Diagnostic output
//!
//! Recoverable failures (unknown ids, duplicate unique values, invalid tree
//! positions, ...) are reported as human-readable warnings through a
//! `DiagnosticSink`. Diagnostics are observational only and never affect
//! control flow.

use std::sync::{Arc, Mutex};

/// Receiver for recoverable-failure warnings
pub trait DiagnosticSink: Send + Sync {
    fn warn(&self, message: &str);
}

/// Forwards diagnostics to `tracing` (the default sink)
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "nodeweave", "{}", message);
    }
}

/// Records diagnostics in memory
///
/// Clones share the same buffer, so a test can hand one clone to the store
/// and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct CapturingSink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|message| message.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.messages().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.clear();
        }
    }
}

impl DiagnosticSink for CapturingSink {
    fn warn(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}
