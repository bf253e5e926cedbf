use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use super::{Engine, FlushCause, Inner};

/// The armed auto-flush task. Dropping the handle disarms it.
pub(crate) struct FlushTimer {
    task: JoinHandle<()>,
    reset: Arc<Notify>,
}

impl FlushTimer {
    /// Spawn the ticker on the current tokio runtime. The first tick lands
    /// one full `period` from now.
    pub(crate) fn arm(engine: Weak<Inner>, period: Duration) -> Result<Self, TryCurrentError> {
        let runtime = Handle::try_current()?;
        let reset = Arc::new(Notify::new());
        let task = runtime.spawn(run(engine, period, Arc::clone(&reset)));
        tracing::trace!(target: "varanus", period_ms = period.as_millis() as u64, "flush timer armed");
        Ok(Self { task, reset })
    }

    /// Push the next tick out to one full period from now.
    pub(crate) fn reset(&self) {
        self.reset.notify_one();
    }
}

impl Drop for FlushTimer {
    fn drop(&mut self) {
        self.task.abort();
        tracing::trace!(target: "varanus", "flush timer disarmed");
    }
}

async fn run(engine: Weak<Inner>, period: Duration, reset: Arc<Notify>) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = IntervalStream::new(interval);

    loop {
        tokio::select! {
            tick = ticks.next() => {
                if tick.is_none() {
                    break;
                }
                // Engine gone: nothing left to flush
                let Some(inner) = engine.upgrade() else {
                    break;
                };
                Engine { inner }.flush_by(FlushCause::Timer);
            }
            _ = reset.notified() => ticks.as_mut().reset(),
        }
    }
}
