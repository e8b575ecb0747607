//! Progress reporting hooks shared by the resolvers.

/// Callback for reporting resolver progress.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before an item (feed entry, article, page) is processed.
    fn item(&self, label: &str, current: usize, total: usize);
    /// Called once the archive has been built.
    fn done(&self, summary: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item(&self, _label: &str, _current: usize, _total: usize) {}
    fn done(&self, _summary: &str) {}
}
