use std::error::Error;

/// Channel for the engine's own warnings and delivery failures.
///
/// The engine never raises delivery problems to callers; it reports them
/// here instead.
pub trait Logger: Send + Sync + 'static {
    fn warn(&self, message: &str);

    fn error(&self, err: &(dyn Error + 'static), message: &str);
}

/// Default logger: forwards to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "varanus", "{message}");
    }

    fn error(&self, err: &(dyn Error + 'static), message: &str) {
        tracing::error!(target: "varanus", error = %err, "{message}");
    }
}
