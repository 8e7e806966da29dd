use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::{Logger, ProducerTransaction, TransactionArgs};
use crate::config::LogLevel;
use crate::errors::ProducerError;

/// One logical link to the broker.
///
/// The pool only ever talks to connections through this trait. Implementations
/// must be safe to share: the same connection can be handed to several
/// concurrent callers across rotations.
pub trait Producer: Send + Sync + 'static {
    /// Connect if needed and send a no-op, reporting any failure.
    fn ping(&self) -> impl Future<Output = Result<(), ProducerError>> + Send;

    fn set_logger(&self, logger: Arc<dyn Logger>, level: LogLevel);

    /// Permanent, graceful shutdown of this connection.
    fn stop(&self) -> impl Future<Output = ()> + Send;

    fn publish(
        &self,
        topic: &str,
        body: Bytes,
    ) -> impl Future<Output = Result<(), ProducerError>> + Send;

    fn multi_publish(
        &self,
        topic: &str,
        bodies: Vec<Bytes>,
    ) -> impl Future<Output = Result<(), ProducerError>> + Send;

    /// Submit without waiting for the broker; the outcome arrives on `done`.
    fn publish_async(
        &self,
        topic: &str,
        body: Bytes,
        done: mpsc::Sender<ProducerTransaction>,
        args: TransactionArgs,
    ) -> impl Future<Output = Result<(), ProducerError>> + Send;

    fn multi_publish_async(
        &self,
        topic: &str,
        bodies: Vec<Bytes>,
        done: mpsc::Sender<ProducerTransaction>,
        args: TransactionArgs,
    ) -> impl Future<Output = Result<(), ProducerError>> + Send;

    /// Publish with broker-side delayed delivery.
    fn deferred_publish(
        &self,
        topic: &str,
        delay: Duration,
        body: Bytes,
    ) -> impl Future<Output = Result<(), ProducerError>> + Send;

    fn deferred_publish_async(
        &self,
        topic: &str,
        delay: Duration,
        body: Bytes,
        done: mpsc::Sender<ProducerTransaction>,
        args: TransactionArgs,
    ) -> impl Future<Output = Result<(), ProducerError>> + Send;
}
