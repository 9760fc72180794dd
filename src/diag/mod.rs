//! Diagnostic sink: where the engine writes its log lines.
//!
//! The engine never logs through a global facility; it writes severity-tagged
//! lines to a sink injected at build time. The default sink forwards to the
//! `tracing` macros, so embedding applications that already run a tracing
//! subscriber get engine diagnostics for free.

use std::fmt;
use std::sync::Mutex;

/// Severity of a diagnostic line.
///
/// INFO covers state changes and transitions, WARNING covers interruptions
/// during shutdown, ERROR covers unhandled events and missing transitions.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// Destination for engine diagnostics.
///
/// The whole contract is one method: accept a severity and a text line.
/// Sinks are shared between the dispatch thread and whatever thread drives
/// shutdown, so implementations must be `Send + Sync`.
pub trait DiagnosticSink: Send + Sync {
    /// Record one diagnostic line.
    fn write_line(&self, severity: Severity, line: &str);
}

/// Sink that forwards to the `tracing` macros. The default.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn write_line(&self, severity: Severity, line: &str) {
        match severity {
            Severity::Info => tracing::info!(target: "strata", "{line}"),
            Severity::Warning => tracing::warn!(target: "strata", "{line}"),
            Severity::Error => tracing::error!(target: "strata", "{line}"),
        }
    }
}

/// Sink that drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn write_line(&self, _severity: Severity, _line: &str) {}
}

/// Sink that captures lines in memory, for assertions in tests.
///
/// # Example
///
/// ```rust
/// use strata::diag::{DiagnosticSink, MemorySink, Severity};
///
/// let sink = MemorySink::new();
/// sink.write_line(Severity::Error, "unhandled event 9 at top level");
///
/// assert!(sink.contains(Severity::Error, "unhandled event 9"));
/// assert_eq!(sink.lines().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Severity, String)>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured lines, in order.
    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Whether any captured line at `severity` contains `needle`.
    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.lines()
            .iter()
            .any(|(sev, line)| *sev == severity && line.contains(needle))
    }
}

impl DiagnosticSink for MemorySink {
    fn write_line(&self, severity: Severity, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((severity, line.to_string()));
    }
}
