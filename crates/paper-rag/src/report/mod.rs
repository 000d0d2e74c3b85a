//! Stage progress reporting
//!
//! Pipeline stages announce what they are doing through a [`Reporter`] handed
//! to them by the caller. Library code never writes to the terminal directly;
//! the CLI plugs in a styled console reporter, everything else defaults to
//! [`TracingReporter`].

#[cfg(feature = "cli")]
mod console;

use parking_lot::Mutex;
use std::time::Instant;

#[cfg(feature = "cli")]
pub use self::console::ConsoleReporter;

/// Observer for pipeline stage events
pub trait Reporter: Send + Sync {
    /// A new stage begins (e.g. "Step 3/4  Chunking")
    fn stage(&self, title: &str);

    /// Informational progress message
    fn info(&self, message: &str);

    /// Recoverable problem; the stage continues
    fn warn(&self, message: &str);

    /// A step finished successfully
    fn success(&self, message: &str);

    /// Item-level progress inside a long step
    fn progress(&self, _done: usize, _total: usize) {}
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn stage(&self, title: &str) {
        tracing::info!("== {}", title);
    }

    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn success(&self, message: &str) {
        tracing::info!("ok: {}", message);
    }

    fn progress(&self, done: usize, total: usize) {
        tracing::debug!("progress {}/{}", done, total);
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn stage(&self, _title: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
}

/// Kind of a recorded event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Stage,
    Info,
    Warn,
    Success,
}

/// Keeps events in memory, for assertions and embedding in other tools
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<(EventKind, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events
    pub fn events(&self) -> Vec<(EventKind, String)> {
        self.events.lock().clone()
    }

    /// Messages of one kind, in order
    pub fn messages(&self, kind: EventKind) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, m)| m.clone())
            .collect()
    }

    fn push(&self, kind: EventKind, message: &str) {
        self.events.lock().push((kind, message.to_string()));
    }
}

impl Reporter for MemoryReporter {
    fn stage(&self, title: &str) {
        self.push(EventKind::Stage, title);
    }

    fn info(&self, message: &str) {
        self.push(EventKind::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(EventKind::Warn, message);
    }

    fn success(&self, message: &str) {
        self.push(EventKind::Success, message);
    }
}

/// Reports a labelled step on creation and its duration on drop
pub struct Timed<'a> {
    reporter: &'a dyn Reporter,
    label: String,
    started: Instant,
}

/// Start timing a labelled step
pub fn timed<'a>(reporter: &'a dyn Reporter, label: impl Into<String>) -> Timed<'a> {
    let label = label.into();
    reporter.info(&format!("{} ...", label));
    Timed {
        reporter,
        label,
        started: Instant::now(),
    }
}

impl Drop for Timed<'_> {
    fn drop(&mut self) {
        let secs = self.started.elapsed().as_secs_f64();
        self.reporter
            .success(&format!("{} done in {:.2}s", self.label, secs));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_reports_start_and_end() {
        let reporter = MemoryReporter::new();
        {
            let _t = timed(&reporter, "encode");
            reporter.warn("slow");
        }

        let events = reporter.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], (EventKind::Info, "encode ...".to_string()));
        assert_eq!(events[1].0, EventKind::Warn);
        assert_eq!(events[2].0, EventKind::Success);
        assert!(events[2].1.starts_with("encode done in "));
    }

    #[test]
    fn test_null_reporter_is_silent() {
        let reporter = NullReporter;
        reporter.stage("x");
        reporter.progress(1, 2);
    }
}
