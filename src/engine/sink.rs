use std::future::Future;
use std::pin::Pin;

use crate::error::SinkError;
use crate::record::Record;

/// Future returned by a sink that delivers asynchronously.
pub type DeliveryFuture = Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'static>>;

/// Outcome of handing a batch to a sink.
///
/// `Complete` settles on the spot. `Pending` is driven on the tokio runtime;
/// the engine keeps the batch until it resolves so a failure can re-buffer it.
pub enum Delivery {
    Complete(Result<(), SinkError>),
    Pending(DeliveryFuture),
}

impl Delivery {
    pub fn ok() -> Self {
        Self::Complete(Ok(()))
    }

    pub fn failed(err: impl Into<SinkError>) -> Self {
        Self::Complete(Err(err.into()))
    }

    pub fn pending<F, E>(fut: F) -> Self
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<SinkError>,
    {
        Self::Pending(Box::pin(async move { fut.await.map_err(Into::into) }))
    }
}

impl<E: Into<SinkError>> From<Result<(), E>> for Delivery {
    fn from(res: Result<(), E>) -> Self {
        Self::Complete(res.map_err(Into::into))
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete(res) => f.debug_tuple("Complete").field(res).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Receives batches of records. Responsible for transport (HTTP, disk, ...).
///
/// The batch is borrowed: a sink that needs the records past `deliver`
/// (e.g. inside a [`Delivery::Pending`] future) clones or serializes them.
pub trait Sink: Send + Sync + 'static {
    fn deliver(&self, batch: &[Record]) -> Delivery;
}

impl<F> Sink for F
where
    F: Fn(&[Record]) -> Delivery + Send + Sync + 'static,
{
    fn deliver(&self, batch: &[Record]) -> Delivery {
        self(batch)
    }
}
