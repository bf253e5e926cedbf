use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

// ─── Ranks ───────────────────────────────────────────────────────

const TRACE_RANK: u8 = 10;
const DEBUG_RANK: u8 = 20;
const INFO_RANK: u8 = 30;
/// Sits above every real level, so nothing passes it.
const OFF_RANK: u8 = u8::MAX;

// ─── Public types ────────────────────────────────────────────────

/// Severity attached to a monitored call. Ordered `Trace < Debug < Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
}

/// Minimum level a call must reach to be measured.
/// `Off` disables measurement entirely.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LevelFilter {
    Trace,
    Debug,
    #[default]
    Info,
    Off,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
        }
    }

    pub(crate) fn rank(self) -> u8 {
        match self {
            Self::Trace => TRACE_RANK,
            Self::Debug => DEBUG_RANK,
            Self::Info => INFO_RANK,
        }
    }
}

impl LevelFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Off => "off",
        }
    }

    pub(crate) fn rank(self) -> u8 {
        match self {
            Self::Trace => TRACE_RANK,
            Self::Debug => DEBUG_RANK,
            Self::Info => INFO_RANK,
            Self::Off => OFF_RANK,
        }
    }

    /// Inverse of [`LevelFilter::rank`]. Unknown ranks read as `Off`.
    pub(crate) fn from_rank(rank: u8) -> Self {
        match rank {
            TRACE_RANK => Self::Trace,
            DEBUG_RANK => Self::Debug,
            INFO_RANK => Self::Info,
            _ => Self::Off,
        }
    }

    /// Does a call at `level` pass this filter?
    pub fn allows(self, level: Level) -> bool {
        level.rank() >= self.rank()
    }
}

// ─── Parsing / display ───────────────────────────────────────────

impl FromStr for Level {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(MonitorError::InvalidLevel(other.to_owned())),
        }
    }
}

impl FromStr for LevelFilter {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            other => other.parse::<Level>().map(Self::from),
        }
    }
}

impl From<Level> for LevelFilter {
    fn from(level: Level) -> Self {
        match level {
            Level::Trace => Self::Trace,
            Level::Debug => Self::Debug,
            Level::Info => Self::Info,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LevelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
