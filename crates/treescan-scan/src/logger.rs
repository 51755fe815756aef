//! Logging sink used by the scanner.
//!
//! The scanner never configures output itself. Callers inject a
//! [`ScanLogger`]; the default forwards to `tracing`, where the
//! application decides on subscribers and filters.

/// Leveled text sink for scan diagnostics.
pub trait ScanLogger: Send + Sync {
    /// Per-path progress.
    fn debug(&self, message: &str);

    fn info(&self, message: &str);

    /// Pruned branches and other recoverable problems.
    fn warn(&self, message: &str) {
        self.info(message);
    }

    fn error(&self, message: &str);
}

/// Forwards scan diagnostics to `tracing` under the `treescan` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ScanLogger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "treescan", "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "treescan", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "treescan", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "treescan", "{}", message);
    }
}
