//! Instrumentation wrappers.
//!
//! A [`Monitor`] is bound to one service name. Its per-level entry points
//! wrap a function in a [`Timed`], which measures each call and pushes a
//! [`Record`] into the engine. The call shape is chosen by the method used:
//!
//! | method                 | target returns                      |
//! |------------------------|-------------------------------------|
//! | `call`                 | any value                           |
//! | `try_call`             | `Result<T, E>` (captures `Err`)     |
//! | `call_async`           | any future                          |
//! | `try_call_async`       | future of `Result<T, E>`            |
//! | `call_with_callback`   | nothing; completes via `Completion` |
//!
//! Whether a call is measured is decided at call time against the engine's
//! live minimum level. A filtered-out call goes straight to the target.

mod callable;
mod timing;

pub use callable::{Callable, ANONYMOUS};

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;

use crate::engine::Engine;
use crate::error::Panicked;
use crate::level::Level;
use crate::record::{CapturedError, Record};

use self::timing::Stopwatch;

/// Completion callback handed to callback-style targets.
pub type Completion<T, E> = Box<dyn FnOnce(Result<T, E>) + Send + 'static>;

// ─── Monitor ─────────────────────────────────────────────────────

/// Wrapper factory bound to a logical service name.
#[derive(Clone)]
pub struct Monitor {
    engine: Engine,
    service: Arc<str>,
}

impl Monitor {
    pub(crate) fn new(engine: Engine, service: Arc<str>) -> Self {
        Self { engine, service }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Wrap `f` at `info`, the default level.
    pub fn wrap<F>(&self, f: F) -> Timed<F> {
        self.info(f)
    }

    pub fn trace<F>(&self, f: F) -> Timed<F> {
        self.timed(Level::Trace, f)
    }

    pub fn debug<F>(&self, f: F) -> Timed<F> {
        self.timed(Level::Debug, f)
    }

    pub fn info<F>(&self, f: F) -> Timed<F> {
        self.timed(Level::Info, f)
    }

    /// Record a call the caller timed itself.
    pub fn log_time(&self, level: Level, fn_name: &str, start: DateTime<Utc>, end: DateTime<Utc>) {
        if !self.engine.level_enabled(level) {
            return;
        }
        self.engine.push(Record::new(
            Arc::clone(&self.service),
            fn_name,
            Some(level),
            start,
            timing::between(start, end),
        ));
    }

    fn timed<F>(&self, level: Level, f: F) -> Timed<F> {
        Timed {
            f,
            probe: Probe {
                engine: self.engine.clone(),
                service: Arc::clone(&self.service),
                name: Arc::from(callable::name_of::<F>()),
                level,
            },
        }
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("service", &self.service)
            .finish()
    }
}

// ─── Probe ───────────────────────────────────────────────────────

/// Everything needed to turn a finished call into a record. Cloned into
/// futures and callbacks so they do not borrow the wrapper.
#[derive(Clone)]
struct Probe {
    engine: Engine,
    service: Arc<str>,
    name: Arc<str>,
    level: Level,
}

impl Probe {
    fn arm(&self) -> Option<Stopwatch> {
        self.engine
            .level_enabled(self.level)
            .then(Stopwatch::start)
    }

    fn record(&self, watch: Stopwatch) -> Record {
        Record::new(
            Arc::clone(&self.service),
            Arc::clone(&self.name),
            Some(self.level),
            watch.created(),
            watch.elapsed(),
        )
    }

    fn finish(&self, watch: Stopwatch) {
        self.engine.push(self.record(watch));
    }

    /// Like `finish`, but attaches the error when capture is on. The error is
    /// only materialized if it will be kept.
    fn finish_err(&self, watch: Stopwatch, err: impl FnOnce() -> CapturedError) {
        let mut record = self.record(watch);
        if self.engine.capture_errors() {
            record = record.with_error(err());
        }
        self.engine.push(record);
    }

    fn finish_result<T, E>(&self, watch: Stopwatch, out: &Result<T, E>)
    where
        E: Error + Clone + Send + Sync + 'static,
    {
        match out {
            Ok(_) => self.finish(watch),
            Err(e) => self.finish_err(watch, || Arc::new(e.clone()) as CapturedError),
        }
    }

    /// Run `body`; if it panics, record the panic and resume unwinding with
    /// the original payload.
    fn guard<R>(&self, watch: Stopwatch, body: impl FnOnce() -> R) -> R {
        match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(out) => out,
            Err(payload) => self.panicked(watch, payload),
        }
    }

    /// Await `fut`, recording a panic raised while it is polled.
    async fn guard_async<Fut: Future>(&self, watch: Stopwatch, fut: Fut) -> Fut::Output {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(out) => out,
            Err(payload) => self.panicked(watch, payload),
        }
    }

    fn panicked(&self, watch: Stopwatch, payload: Box<dyn Any + Send>) -> ! {
        self.finish_err(watch, || {
            Arc::new(Panicked::from_payload(&*payload)) as CapturedError
        });
        panic::resume_unwind(payload)
    }
}

// ─── Timed ───────────────────────────────────────────────────────

/// A function wrapped for timing. Transparent to return values, errors and
/// panics.
pub struct Timed<F> {
    f: F,
    probe: Probe,
}

impl<F> Timed<F> {
    /// Override the derived function name.
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.probe.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.probe.name
    }

    pub fn level(&self) -> Level {
        self.probe.level
    }

    /// The wrapped function, for calling it unmeasured.
    pub fn inner(&self) -> &F {
        &self.f
    }

    // ── Synchronous ─────────────────────────────────────────────

    pub fn call<Args>(&self, args: Args) -> F::Output
    where
        F: Callable<Args>,
    {
        let Some(watch) = self.probe.arm() else {
            return self.f.invoke(args);
        };
        let out = self.probe.guard(watch, || self.f.invoke(args));
        self.probe.finish(watch);
        out
    }

    /// Like [`Timed::call`], recording `Err` in `params.err`. The caller gets
    /// the very same error back.
    pub fn try_call<Args, T, E>(&self, args: Args) -> Result<T, E>
    where
        F: Callable<Args, Output = Result<T, E>>,
        E: Error + Clone + Send + Sync + 'static,
    {
        let Some(watch) = self.probe.arm() else {
            return self.f.invoke(args);
        };
        let out = self.probe.guard(watch, || self.f.invoke(args));
        self.probe.finish_result(watch, &out);
        out
    }

    // ── Futures ─────────────────────────────────────────────────

    /// Time from the call until the returned future settles.
    pub fn call_async<Args, Fut>(&self, args: Args) -> impl Future<Output = Fut::Output>
    where
        F: Callable<Args, Output = Fut>,
        Fut: Future,
    {
        let armed = self.probe.arm();
        let fut = match armed {
            Some(watch) => self.probe.guard(watch, || self.f.invoke(args)),
            None => self.f.invoke(args),
        };
        let probe = armed.map(|watch| (self.probe.clone(), watch));

        async move {
            let Some((probe, watch)) = probe else {
                return fut.await;
            };
            let out = probe.guard_async(watch, fut).await;
            probe.finish(watch);
            out
        }
    }

    pub fn try_call_async<Args, Fut, T, E>(&self, args: Args) -> impl Future<Output = Result<T, E>>
    where
        F: Callable<Args, Output = Fut>,
        Fut: Future<Output = Result<T, E>>,
        E: Error + Clone + Send + Sync + 'static,
    {
        let armed = self.probe.arm();
        let fut = match armed {
            Some(watch) => self.probe.guard(watch, || self.f.invoke(args)),
            None => self.f.invoke(args),
        };
        let probe = armed.map(|watch| (self.probe.clone(), watch));

        async move {
            let Some((probe, watch)) = probe else {
                return fut.await;
            };
            let out = probe.guard_async(watch, fut).await;
            probe.finish_result(watch, &out);
            out
        }
    }

    // ── Callbacks ───────────────────────────────────────────────

    /// Invoke a callback-style target. The record is pushed when the target
    /// completes, right before `done` sees the result.
    pub fn call_with_callback<A, T, E, C>(&self, args: A, done: C)
    where
        F: Fn(A, Completion<T, E>),
        C: FnOnce(Result<T, E>) + Send + 'static,
        E: Error + Clone + Send + Sync + 'static,
    {
        let Some(watch) = self.probe.arm() else {
            return (self.f)(args, Box::new(done));
        };

        let probe = self.probe.clone();
        let completion: Completion<T, E> = Box::new(move |res: Result<T, E>| {
            probe.finish_result(watch, &res);
            done(res);
        });
        (self.f)(args, completion);
    }
}

impl<F> fmt::Debug for Timed<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timed")
            .field("service", &self.probe.service)
            .field("name", &self.probe.name)
            .field("level", &self.probe.level)
            .finish()
    }
}
