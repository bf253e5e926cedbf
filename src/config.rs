use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::Sink;
use crate::error::{MonitorError, Result};
use crate::level::LevelFilter;
use crate::logger::Logger;

// ─── Settings ────────────────────────────────────────────────────

/// Plain-data part of the engine configuration. Loadable from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// How often the timer flushes the buffer (milliseconds)
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Flush as soon as this many records are buffered. `None` = unbounded
    #[serde(default)]
    pub max_buffer_size: Option<usize>,

    /// Minimum level a call must reach to be measured
    #[serde(default)]
    pub level: LevelFilter,

    /// Attach failures to `params.err`
    #[serde(default = "default_capture_errors")]
    pub capture_errors: bool,
}

fn default_flush_interval_ms() -> u64 {
    60_000
}
fn default_capture_errors() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            flush_interval_ms: default_flush_interval_ms(),
            max_buffer_size: None,
            level: LevelFilter::default(),
            capture_errors: default_capture_errors(),
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.flush_interval_ms == 0 {
            return Err(MonitorError::Configuration(
                "flush_interval_ms must be greater than zero".into(),
            ));
        }
        if self.max_buffer_size == Some(0) {
            return Err(MonitorError::Configuration(
                "max_buffer_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ─── Options ─────────────────────────────────────────────────────

/// Everything `Engine::configure` accepts: settings plus the sink and an
/// optional logger.
#[derive(Clone, Default)]
pub struct Options {
    pub settings: Settings,
    pub sink: Option<Arc<dyn Sink>>,
    pub logger: Option<Arc<dyn Logger>>,
}

impl Options {
    pub fn new(sink: impl Sink) -> Self {
        Self {
            sink: Some(Arc::new(sink)),
            ..Self::default()
        }
    }

    pub fn from_settings(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn sink(mut self, sink: impl Sink) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Use a sink the caller keeps a handle to, e.g. an `Arc<LatencySummary>`.
    pub fn shared_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn logger(mut self, logger: impl Logger) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.settings.flush_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn max_buffer_size(mut self, max: usize) -> Self {
        self.settings.max_buffer_size = Some(max);
        self
    }

    pub fn level(mut self, level: LevelFilter) -> Self {
        self.settings.level = level;
        self
    }

    pub fn capture_errors(mut self, capture: bool) -> Self {
        self.settings.capture_errors = capture;
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("settings", &self.settings)
            .field("sink", &self.sink.as_ref().map(|_| "<sink>"))
            .field("logger", &self.logger.as_ref().map(|_| "<logger>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.flush_interval(), Duration::from_secs(60));
        assert_eq!(s.max_buffer_size, None);
        assert_eq!(s.level, LevelFilter::Info);
        assert!(s.capture_errors);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let s = Settings::from_json(r#"{"level": "debug", "max_buffer_size": 500}"#).unwrap();
        assert_eq!(s.level, LevelFilter::Debug);
        assert_eq!(s.max_buffer_size, Some(500));
        assert_eq!(s.flush_interval_ms, 60_000);
        assert!(s.capture_errors);
    }

    #[test]
    fn test_from_json_rejects_unknown_level() {
        let err = Settings::from_json(r#"{"level": "loud"}"#).unwrap_err();
        assert!(matches!(err, MonitorError::Settings(_)));
    }

    #[test]
    fn test_validate() {
        assert!(Settings::default().validate().is_ok());

        let zero_interval = Settings {
            flush_interval_ms: 0,
            ..Settings::default()
        };
        assert!(matches!(
            zero_interval.validate(),
            Err(MonitorError::Configuration(_))
        ));

        let zero_max = Settings {
            max_buffer_size: Some(0),
            ..Settings::default()
        };
        assert!(matches!(zero_max.validate(), Err(MonitorError::Configuration(_))));
    }

    #[test]
    fn test_builder() {
        let opts = Options::default()
            .flush_interval(Duration::from_millis(250))
            .max_buffer_size(2)
            .level(LevelFilter::Off)
            .capture_errors(false);
        assert!(opts.sink.is_none());
        assert_eq!(opts.settings.flush_interval_ms, 250);
        assert_eq!(opts.settings.max_buffer_size, Some(2));
        assert_eq!(opts.settings.level, LevelFilter::Off);
        assert!(!opts.settings.capture_errors);
    }
}
