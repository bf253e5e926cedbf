use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::level::Level;

/// Error captured from a failed call. Shared, so a record and the caller can
/// hold the very same value.
pub type CapturedError = Arc<dyn Error + Send + Sync + 'static>;

// ─── Record ──────────────────────────────────────────────────────

/// One completed measurement of a monitored call.
/// Built by the wrappers (or `Monitor::log_time`) and pushed into the engine.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    /// Logical name of the monitored unit, e.g. "billing"
    pub service: Arc<str>,
    /// Function or operation name, e.g. "charge_card"
    #[serde(rename = "fnName")]
    pub fn_name: Arc<str>,
    /// Elapsed time between start and end
    #[serde(rename = "time_us", serialize_with = "serialize_micros")]
    pub time: Duration,
    pub level: Option<Level>,
    /// Wall-clock start of the call
    pub created: DateTime<Utc>,
    pub params: Params,
}

impl Record {
    pub fn new(
        service: impl Into<Arc<str>>,
        fn_name: impl Into<Arc<str>>,
        level: Option<Level>,
        created: DateTime<Utc>,
        time: Duration,
    ) -> Self {
        Self {
            service: service.into(),
            fn_name: fn_name.into(),
            time,
            level,
            created,
            params: Params::default(),
        }
    }

    /// Attach the error that made the call fail.
    pub fn with_error(mut self, err: CapturedError) -> Self {
        self.params.err = Some(err);
        self
    }

    /// Attach an arbitrary metadata entry.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.extra.insert(key.into(), value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.params.err.is_some()
    }
}

fn serialize_micros<S: Serializer>(time: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(time.as_micros()).unwrap_or(u64::MAX))
}

// ─── Params ──────────────────────────────────────────────────────

/// Open metadata map. `err` holds the captured failure, if any.
#[derive(Debug, Clone, Default)]
pub struct Params {
    pub err: Option<CapturedError>,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Params {
    pub fn is_empty(&self) -> bool {
        self.err.is_none() && self.extra.is_empty()
    }
}

/// Serialized flat: `{"err": "<display>", ...extra}`.
impl Serialize for Params {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(None)?;
        if let Some(err) = &self.err {
            map.serialize_entry("err", &err.to_string())?;
        }
        for (k, v) in &self.extra {
            if k == "err" && self.err.is_some() {
                continue;
            }
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
