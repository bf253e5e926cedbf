//! Buffering flush engine.
//!
//! The engine owns the pending records, the auto-flush timer and the sink.
//! A flush swaps the whole buffer out under its lock, hands the batch to the
//! sink outside the lock, and puts the batch back in front of newer records
//! if delivery fails. Records are never dropped on a failed delivery.

pub mod sink;
mod timer;

pub use sink::{Delivery, DeliveryFuture, Sink};

use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tracing::debug;

use crate::config::Options;
use crate::error::{MonitorError, Panicked, Result};
use crate::level::{Level, LevelFilter};
use crate::logger::{Logger, TracingLogger};
use crate::monitor::Monitor;
use crate::record::Record;

use self::timer::FlushTimer;

/// `max_buffer_size` value meaning "never flush on size".
const UNBOUNDED: usize = usize::MAX;

// ─── Public types ────────────────────────────────────────────────

/// Handle to a flush engine. Cheap to clone; every clone shares the same
/// buffer, sink and timer.
///
/// A fresh engine is inert but valid: records can be pushed before
/// [`Engine::configure`] and are delivered once a sink is wired in.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

/// Why a flush is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlushCause {
    Manual,
    Capacity,
    Timer,
    Shutdown,
}

// ─── Internal state ──────────────────────────────────────────────

pub(crate) struct Inner {
    /// Records not yet handed to the sink, oldest first
    buffer: Mutex<Vec<Record>>,

    /// Set by `configure`; `None` until then
    wiring: RwLock<Option<Wiring>>,
    logger: RwLock<Arc<dyn Logger>>,

    // Read on every instrumented call, so kept lock-free
    min_level: AtomicU8,
    max_buffer_size: AtomicUsize,
    capture_errors: AtomicBool,
    /// Set by `stop()`, cleared by `start()`. Suppresses size-triggered flushes
    stopped: AtomicBool,

    timer: Mutex<Option<FlushTimer>>,
}

#[derive(Clone)]
struct Wiring {
    sink: Arc<dyn Sink>,
    flush_interval: Duration,
}

// ─── Engine impl ─────────────────────────────────────────────────

impl Engine {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                buffer: Mutex::new(Vec::new()),
                wiring: RwLock::new(None),
                logger: RwLock::new(Arc::new(TracingLogger)),
                min_level: AtomicU8::new(LevelFilter::default().rank()),
                max_buffer_size: AtomicUsize::new(UNBOUNDED),
                capture_errors: AtomicBool::new(true),
                stopped: AtomicBool::new(false),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Wire in the sink and settings, then (re)start the flush timer.
    ///
    /// Fails without touching the engine if the sink is missing or a
    /// setting is unusable. The timer is only armed when called from inside
    /// a tokio runtime; otherwise a warning is logged and flushing stays
    /// manual (or size-triggered).
    pub fn configure(&self, options: Options) -> Result<()> {
        let Options {
            settings,
            sink,
            logger,
        } = options;

        let sink = sink.ok_or_else(|| {
            MonitorError::Configuration("a sink is required to deliver records".into())
        })?;
        settings.validate()?;

        if let Some(logger) = logger {
            *self.inner.logger.write() = logger;
        }
        self.set_level_filter(settings.level);
        self.inner
            .max_buffer_size
            .store(settings.max_buffer_size.unwrap_or(UNBOUNDED), Ordering::Relaxed);
        self.inner
            .capture_errors
            .store(settings.capture_errors, Ordering::Relaxed);
        *self.inner.wiring.write() = Some(Wiring {
            sink,
            flush_interval: settings.flush_interval(),
        });

        debug!(
            target: "varanus",
            flush_interval_ms = settings.flush_interval_ms,
            max_buffer_size = ?settings.max_buffer_size,
            level = %settings.level,
            "engine configured"
        );

        // Restart so a changed interval takes effect
        self.disarm();
        self.start();
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.inner.wiring.read().is_some()
    }

    /// Monitor whose records carry `service` as their service name.
    pub fn new_monitor(&self, service: impl Into<Arc<str>>) -> Monitor {
        Monitor::new(self.clone(), service.into())
    }

    // ── Buffer ──────────────────────────────────────────────────

    /// Append a record. Records below the current minimum level are dropped.
    /// Reaching `max_buffer_size` flushes immediately, unless the engine has
    /// been stopped.
    pub fn push(&self, record: Record) {
        if !self.record_enabled(record.level) {
            return;
        }

        let max = self.inner.max_buffer_size.load(Ordering::Relaxed);
        let full = {
            let mut buffer = self.inner.buffer.lock();
            buffer.push(record);
            buffer.len() >= max
        };

        if full && !self.inner.stopped.load(Ordering::Relaxed) {
            self.flush_by(FlushCause::Capacity);
        }
    }

    /// Number of records waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.inner.buffer.lock().len()
    }

    /// Hand everything buffered to the sink. Never fails: delivery problems
    /// are logged and the records kept for the next attempt.
    pub fn flush(&self) {
        self.flush_by(FlushCause::Manual);
    }

    pub(crate) fn flush_by(&self, cause: FlushCause) {
        let sink = self.inner.wiring.read().as_ref().map(|w| Arc::clone(&w.sink));
        let Some(sink) = sink else {
            if self.pending() > 0 {
                self.logger()
                    .warn("trying to flush records, but the engine has not been configured yet");
            }
            return;
        };

        let batch = {
            let mut buffer = self.inner.buffer.lock();
            if buffer.is_empty() {
                return;
            }
            std::mem::take(&mut *buffer)
        };

        // A size-triggered or manual flush restarts the timer's cadence
        if matches!(cause, FlushCause::Capacity | FlushCause::Manual) {
            if let Some(timer) = self.inner.timer.lock().as_ref() {
                timer.reset();
            }
        }

        debug!(target: "varanus", records = batch.len(), ?cause, "flushing");
        self.deliver(sink, batch);
    }

    fn deliver(&self, sink: Arc<dyn Sink>, batch: Vec<Record>) {
        match panic::catch_unwind(AssertUnwindSafe(|| sink.deliver(&batch))) {
            Ok(Delivery::Complete(Ok(()))) => {}
            Ok(Delivery::Complete(Err(err))) => self.delivery_failed(batch, &*err),
            Ok(Delivery::Pending(fut)) => self.deliver_later(batch, fut),
            Err(payload) => self.delivery_failed(batch, &Panicked::from_payload(&*payload)),
        }
    }

    /// Drive a pending delivery on the runtime. The batch stays with the
    /// spawned task until the sink settles.
    fn deliver_later(&self, batch: Vec<Record>, fut: DeliveryFuture) {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => return self.delivery_failed(batch, &err),
        };

        let engine = self.clone();
        runtime.spawn(async move {
            // Run the sink's future as its own task so a panic surfaces as a
            // JoinError here instead of taking the batch down with it.
            match tokio::spawn(fut).await {
                Ok(Ok(())) => {
                    debug!(target: "varanus", records = batch.len(), "pending delivery settled");
                }
                Ok(Err(err)) => engine.delivery_failed(batch, &*err),
                Err(join_err) => engine.delivery_failed(batch, &join_err),
            }
        });
    }

    fn delivery_failed(&self, batch: Vec<Record>, err: &(dyn Error + 'static)) {
        let count = batch.len();
        self.requeue(batch);
        self.logger().error(
            err,
            &format!("error sending {count} records, kept for the next flush"),
        );
    }

    /// Put a failed batch back ahead of anything buffered since.
    fn requeue(&self, mut batch: Vec<Record>) {
        let mut buffer = self.inner.buffer.lock();
        batch.append(&mut buffer);
        *buffer = batch;
    }

    // ── Timer ───────────────────────────────────────────────────

    /// Arm the auto-flush timer and re-enable size-triggered flushes.
    /// No-op if already armed.
    pub fn start(&self) {
        let period = self.inner.wiring.read().as_ref().map(|w| w.flush_interval);
        let Some(period) = period else {
            self.logger()
                .warn("cannot start the flush timer before the engine is configured");
            return;
        };
        self.inner.stopped.store(false, Ordering::Relaxed);

        let mut slot = self.inner.timer.lock();
        if slot.is_some() {
            return;
        }
        match FlushTimer::arm(Arc::downgrade(&self.inner), period) {
            Ok(timer) => *slot = Some(timer),
            Err(_) => {
                drop(slot);
                self.logger()
                    .warn("no tokio runtime available, records will only flush on demand");
            }
        }
    }

    /// Flush one last time and disarm the timer. Records pushed afterwards
    /// stay buffered, whatever the buffer size, until the next `flush()` or
    /// `start()`.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Relaxed);
        self.flush_by(FlushCause::Shutdown);
        self.disarm();
    }

    pub fn is_running(&self) -> bool {
        self.inner.timer.lock().is_some()
    }

    fn disarm(&self) {
        let timer = self.inner.timer.lock().take();
        drop(timer);
    }

    // ── Levels ──────────────────────────────────────────────────

    /// Set the minimum level from its label: trace | debug | info | off.
    pub fn set_level(&self, label: &str) -> Result<()> {
        let filter: LevelFilter = label.parse()?;
        self.set_level_filter(filter);
        Ok(())
    }

    pub fn set_level_filter(&self, filter: LevelFilter) {
        self.inner.min_level.store(filter.rank(), Ordering::Relaxed);
    }

    /// Stop measuring anything. Same as `set_level_filter(LevelFilter::Off)`.
    pub fn disable(&self) {
        self.set_level_filter(LevelFilter::Off);
    }

    pub fn level(&self) -> LevelFilter {
        LevelFilter::from_rank(self.inner.min_level.load(Ordering::Relaxed))
    }

    /// Would a call at `label` be measured right now? Unknown labels are
    /// never enabled.
    pub fn is_enabled(&self, label: &str) -> bool {
        label
            .parse::<Level>()
            .is_ok_and(|level| self.level_enabled(level))
    }

    pub fn level_enabled(&self, level: Level) -> bool {
        self.level().allows(level)
    }

    fn record_enabled(&self, level: Option<Level>) -> bool {
        match level {
            Some(level) => self.level_enabled(level),
            None => self.level() != LevelFilter::Off,
        }
    }

    // ── Internals shared with monitors ──────────────────────────

    pub(crate) fn capture_errors(&self) -> bool {
        self.inner.capture_errors.load(Ordering::Relaxed)
    }

    fn logger(&self) -> Arc<dyn Logger> {
        Arc::clone(&self.inner.logger.read())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("configured", &self.is_configured())
            .field("running", &self.is_running())
            .field("level", &self.level())
            .field("pending", &self.pending())
            .finish()
    }
}
