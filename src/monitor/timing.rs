use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Start of a measured call.
///
/// Elapsed time comes from the monotonic clock so it can never go negative;
/// `created` is the wall-clock stamp stored on the record.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Stopwatch {
    created: DateTime<Utc>,
    started: Instant,
}

impl Stopwatch {
    pub(crate) fn start() -> Self {
        Self {
            created: Utc::now(),
            started: Instant::now(),
        }
    }

    pub(crate) fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Elapsed time between two wall-clock stamps, clamped at zero.
pub(crate) fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
    (end - start).to_std().unwrap_or(Duration::ZERO)
}
