//! In-process latency summary.
//!
//! [`LatencySummary`] is a ready-made [`Sink`] that folds every delivered
//! batch into one HDR histogram per `(service, fn_name)`. Share it with `Arc`
//! (see `Options::shared_sink`) to read snapshots while the engine keeps
//! delivering.

use std::collections::HashMap;
use std::sync::Arc;

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;

use crate::engine::{Delivery, Sink};
use crate::record::Record;

/// Histogram range: 1 μs → 60 s, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000_000;
const HIST_SIGFIG: u8 = 3;

#[derive(Default)]
pub struct LatencySummary {
    ops: Mutex<HashMap<OperationKey, OperationStats>>,
}

/// One row of a summary snapshot. Times are in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationSummary {
    pub service: Arc<str>,
    #[serde(rename = "fnName")]
    pub fn_name: Arc<str>,
    pub calls: u64,
    /// Calls whose record carried `params.err`
    pub errors: u64,
    pub min_us: u64,
    pub mean_us: f64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

impl OperationSummary {
    /// Share of calls that failed, in `[0, 1]`.
    pub fn error_rate(&self) -> f64 {
        if self.calls == 0 {
            return 0.0;
        }
        self.errors as f64 / self.calls as f64
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct OperationKey {
    service: Arc<str>,
    fn_name: Arc<str>,
}

struct OperationStats {
    hist: Histogram<u64>,
    errors: u64,
}

impl OperationStats {
    fn new() -> Option<Self> {
        let hist = Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG).ok()?;
        Some(Self { hist, errors: 0 })
    }

    fn observe(&mut self, record: &Record) {
        if record.is_error() {
            self.errors += 1;
        }
        // Zero-length calls still count, as the lowest bucket
        let us = u64::try_from(record.time.as_micros()).unwrap_or(HIST_HIGH);
        self.hist.saturating_record(us.clamp(HIST_LOW, HIST_HIGH));
    }

    fn summarize(&self, key: &OperationKey) -> OperationSummary {
        let hist = &self.hist;
        OperationSummary {
            service: Arc::clone(&key.service),
            fn_name: Arc::clone(&key.fn_name),
            calls: hist.len(),
            errors: self.errors,
            min_us: hist.min(),
            mean_us: hist.mean(),
            p50_us: hist.value_at_quantile(0.50),
            p95_us: hist.value_at_quantile(0.95),
            p99_us: hist.value_at_quantile(0.99),
            max_us: hist.max(),
        }
    }
}

impl LatencySummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_batch(&self, batch: &[Record]) {
        let mut ops = self.ops.lock();
        for record in batch {
            let key = OperationKey {
                service: Arc::clone(&record.service),
                fn_name: Arc::clone(&record.fn_name),
            };
            if !ops.contains_key(&key) {
                let Some(stats) = OperationStats::new() else {
                    continue;
                };
                ops.insert(key.clone(), stats);
            }
            if let Some(stats) = ops.get_mut(&key) {
                stats.observe(record);
            }
        }
    }

    /// Sorted by service, then function name.
    pub fn snapshot(&self) -> Vec<OperationSummary> {
        let ops = self.ops.lock();
        let mut rows: Vec<OperationSummary> = ops
            .iter()
            .map(|(key, stats)| stats.summarize(key))
            .collect();
        rows.sort_by(|a, b| (&a.service, &a.fn_name).cmp(&(&b.service, &b.fn_name)));
        rows
    }

    /// Row for one operation, if it has been seen.
    pub fn operation(&self, service: &str, fn_name: &str) -> Option<OperationSummary> {
        let key = OperationKey {
            service: Arc::from(service),
            fn_name: Arc::from(fn_name),
        };
        self.ops.lock().get(&key).map(|stats| stats.summarize(&key))
    }

    pub fn reset(&self) {
        self.ops.lock().clear();
    }
}

impl Sink for LatencySummary {
    fn deliver(&self, batch: &[Record]) -> Delivery {
        self.record_batch(batch);
        Delivery::ok()
    }
}
