//! Progress callbacks for flows that take more than one network round trip.

/// Progress callback for reporting flow status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a step of a phase fails but the flow carries on.
    fn warn(&self, message: &str);
    /// Called when the flow completes.
    fn done(&self, summary: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn warn(&self, _message: &str) {}
    fn done(&self, _summary: &str) {}
}
