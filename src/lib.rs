//! # varanus
//!
//! Call-level timing instrumentation with a buffered flush engine.
//!
//! Wrap functions through a [`Monitor`] to measure each call. The resulting
//! [`Record`]s are buffered by the [`Engine`] and handed in batches to a
//! caller-supplied [`Sink`], on a timer, on demand, or once the buffer
//! reaches a configured size. A failed delivery is never dropped: the batch
//! goes back to the front of the buffer and is retried with the next flush.
//!
//! ```no_run
//! use varanus::{Delivery, Engine, Options, Record};
//!
//! # #[tokio::main] async fn main() -> varanus::Result<()> {
//! let engine = Engine::new();
//! engine.configure(Options::new(|batch: &[Record]| {
//!     println!("{} records", batch.len());
//!     Delivery::ok()
//! }))?;
//!
//! fn checksum(data: &[u8]) -> u32 {
//!     data.iter().map(|&b| b as u32).sum()
//! }
//!
//! let monitor = engine.new_monitor("storage");
//! let checksum = monitor.info(checksum);
//! let sum = checksum.call((&b"hello"[..],));
//! # let _ = sum;
//! engine.stop();
//! # Ok(()) }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod error;
pub mod level;
pub mod logger;
pub mod monitor;
pub mod record;
pub mod summary;

pub use config::{Options, Settings};
pub use engine::{Delivery, DeliveryFuture, Engine, Sink};
pub use error::{MonitorError, Panicked, Result, SinkError};
pub use level::{Level, LevelFilter};
pub use logger::{Logger, TracingLogger};
pub use monitor::{Callable, Completion, Monitor, Timed, ANONYMOUS};
pub use record::{CapturedError, Params, Record};
pub use summary::{LatencySummary, OperationSummary};
