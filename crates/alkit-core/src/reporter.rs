//! Reporter trait for dependency injection
//!
//! This trait allows the engine to report progress and status without
//! being coupled to a specific console implementation. Subjects are free-form
//! labels: a coarse version for cache population, a package id for symbols.

pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Resolving", "Downloading").
    fn section(&self, title: &str);

    /// Updates the progress of a download.
    fn downloading(&self, subject: &str, detail: &str, current: u64, total: Option<u64>);

    /// Updates the progress of an extraction.
    fn extracting(&self, subject: &str, detail: &str);

    /// Marks an operation as successfully completed.
    fn done(&self, subject: &str, detail: &str, size: Option<u64>);

    /// Marks an operation as failed with a specific reason.
    fn failed(&self, subject: &str, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title)
    }
    fn downloading(&self, subject: &str, detail: &str, current: u64, total: Option<u64>) {
        (**self).downloading(subject, detail, current, total)
    }
    fn extracting(&self, subject: &str, detail: &str) {
        (**self).extracting(subject, detail)
    }
    fn done(&self, subject: &str, detail: &str, size: Option<u64>) {
        (**self).done(subject, detail, size)
    }
    fn failed(&self, subject: &str, reason: &str) {
        (**self).failed(subject, reason)
    }
    fn info(&self, msg: &str) {
        (**self).info(msg)
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg)
    }
}

/// A no-op reporter for silent operations (e.g., status checks, testing).
#[derive(Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn downloading(&self, _: &str, _: &str, _: u64, _: Option<u64>) {}
    fn extracting(&self, _: &str, _: &str) {}
    fn done(&self, _: &str, _: &str, _: Option<u64>) {}
    fn failed(&self, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
}
