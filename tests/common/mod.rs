#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use varanus::{Delivery, Record, Sink, SinkError};

/// Sink that keeps every batch it is offered and fails on demand, either
/// synchronously or through a pending delivery.
#[derive(Clone, Default)]
pub struct RecordingSink {
    attempts: Arc<Mutex<Vec<Vec<Record>>>>,
    delivered: Arc<Mutex<Vec<Record>>>,
    script: Arc<Mutex<VecDeque<bool>>>,
    failing: Arc<AtomicBool>,
    asynchronous: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` deliveries, then succeed.
    pub fn failing_first(n: usize) -> Self {
        let sink = Self::default();
        sink.script.lock().extend(std::iter::repeat(true).take(n));
        sink
    }

    /// Report outcomes through `Delivery::Pending` instead of on the spot.
    pub fn asynchronous(mut self) -> Self {
        self.asynchronous = true;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.attempts.lock().len()
    }

    pub fn attempt(&self, n: usize) -> Vec<Record> {
        self.attempts.lock()[n].clone()
    }

    pub fn delivered(&self) -> Vec<Record> {
        self.delivered.lock().clone()
    }
}

impl Sink for RecordingSink {
    fn deliver(&self, batch: &[Record]) -> Delivery {
        self.attempts.lock().push(batch.to_vec());
        let fail = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.failing.load(Ordering::SeqCst));
        if !fail {
            self.delivered.lock().extend_from_slice(batch);
        }

        if self.asynchronous {
            Delivery::pending(async move {
                tokio::task::yield_now().await;
                if fail {
                    Err::<(), SinkError>("rejected".into())
                } else {
                    Ok(())
                }
            })
        } else if fail {
            Delivery::failed("sink unavailable")
        } else {
            Delivery::ok()
        }
    }
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

pub fn at(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

pub fn names(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.fn_name.to_string()).collect()
}
