use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Editing affordances the caller locks while a run is active.
pub trait EditingHooks {
    /// Called once before any resource is acquired.
    fn disable_editing(&mut self);
    /// Called exactly once at the end of every run that disabled editing.
    fn enable_editing(&mut self);
}

/// Receives human-readable status strings.
///
/// Progress is throttled by the pacer; exactly one terminal message is sent per run.
pub trait StatusSink {
    /// A status line, e.g. `"Preparing to generate video..."`.
    fn status(&mut self, message: &str);

    /// Coarse progress in whole percent.
    fn progress(&mut self, percent: u8) {
        self.status(&format!("Progress: {percent}%"));
    }
}

/// Hooks and status sink that do nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;

impl EditingHooks for NoopHooks {
    fn disable_editing(&mut self) {}
    fn enable_editing(&mut self) {}
}

impl StatusSink for NoopHooks {
    fn status(&mut self, _message: &str) {}
}

/// Status sink that forwards every message to `tracing` at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn status(&mut self, message: &str) {
        tracing::info!(target: "storyreel::status", "{message}");
    }
}

/// Status sink that keeps every message, for tests and batch callers.
#[derive(Clone, Debug, Default)]
pub struct RecordingStatus {
    /// Messages in arrival order.
    pub messages: Vec<String>,
}

impl StatusSink for RecordingStatus {
    fn status(&mut self, message: &str) {
        self.messages.push(message.to_owned());
    }
}

/// Cooperative cancellation flag checked at every frame boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/hooks.rs"]
mod tests;
