use bytes::Bytes;
use std::fmt;
use std::future::{self, Future};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::scheduler::Scheduler;
use crate::config::{LogLevel, PoolSettings, ProducerConfig};
use crate::errors::{PoolError, ProducerError};
use crate::producer::{Logger, Producer, ProducerTransaction, TransactionArgs};

// -----------------------------------------------------------------------------
// ----- ProducerPool ----------------------------------------------------------

/// A fixed set of connections to one broker address, handed out round-robin.
///
/// Every publish takes the next connection from a background scheduler and
/// forwards the call to it unchanged. `stop` is terminal: afterwards `next`
/// yields `None` and publishes fail with [`ProducerError::Stopped`].
#[derive(Debug)]
pub struct ProducerPool<P: Producer> {
    producers: Vec<Arc<P>>,
    addr: String,
    config: ProducerConfig,
    handoff: Mutex<mpsc::Receiver<Arc<P>>>,
    stop_tx: Arc<watch::Sender<bool>>,
    runtime: Handle,
    scheduler: parking_lot::Mutex<Option<JoinHandle<()>>>,
    // Set by the first `stop`; flips to true once shutdown has finished.
    shutdown: parking_lot::Mutex<Option<watch::Receiver<bool>>>,
    handoffs: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub address: String,
    pub connections: usize,
    pub handoffs: u64,
    pub stopped: bool,
}

// -----------------------------------------------------------------------------
// ----- ProducerPool: Static --------------------------------------------------

impl<P: Producer> ProducerPool<P> {
    /// Build `count` connections with `connect` and start the scheduler.
    ///
    /// Fails on the first connection that cannot be created; connections
    /// built before it are dropped. Outside a tokio runtime nothing is built
    /// and [`PoolError::NoRuntime`] is returned.
    pub fn new<F>(
        addr: impl Into<String>,
        config: &ProducerConfig,
        count: usize,
        mut connect: F,
    ) -> Result<Self, PoolError>
    where
        F: FnMut(&str, &ProducerConfig) -> Result<P, ProducerError>,
    {
        let addr = addr.into();
        if count == 0 {
            return Err(PoolError::InvalidConnectionCount { count });
        }

        let runtime = Handle::try_current().map_err(|_| PoolError::NoRuntime)?;

        let mut producers = Vec::with_capacity(count);
        for index in 0..count {
            match connect(&addr, config) {
                Ok(producer) => producers.push(Arc::new(producer)),
                Err(source) => {
                    warn!(
                        "failed to create connection {index} to {addr}: {source}; discarding {} built so far",
                        producers.len()
                    );
                    return Err(PoolError::Connect {
                        index,
                        addr,
                        source,
                    });
                }
            }
        }

        let (handoff_tx, handoff_rx) = mpsc::channel(count);
        let (stop_tx, stop_rx) = watch::channel(false);
        let scheduler = Scheduler::new(producers.clone(), handoff_tx, stop_rx);
        let handle = runtime.spawn(scheduler.run());

        info!("producer pool for {addr} started with {count} connections");

        Ok(Self {
            producers,
            addr,
            config: config.clone(),
            handoff: Mutex::new(handoff_rx),
            stop_tx: Arc::new(stop_tx),
            runtime,
            scheduler: parking_lot::Mutex::new(Some(handle)),
            shutdown: parking_lot::Mutex::new(None),
            handoffs: AtomicU64::new(0),
        })
    }

    pub fn from_settings<F>(settings: &PoolSettings, connect: F) -> Result<Self, PoolError>
    where
        F: FnMut(&str, &ProducerConfig) -> Result<P, ProducerError>,
    {
        Self::new(
            settings.address.clone(),
            &settings.producer,
            settings.connections,
            connect,
        )
    }
}

// -----------------------------------------------------------------------------
// ----- ProducerPool: Public --------------------------------------------------

impl<P: Producer> ProducerPool<P> {
    pub fn address(&self) -> &str {
        &self.addr
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.producers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            address: self.addr.clone(),
            connections: self.producers.len(),
            handoffs: self.handoffs.load(Ordering::Relaxed),
            stopped: self.is_stopped(),
        }
    }

    /// Wait for the scheduler to offer the next connection.
    ///
    /// Returns `None` once the pool has been stopped, including for offers
    /// the scheduler staged before it exited.
    pub async fn next(&self) -> Option<Arc<P>> {
        let producer = self.handoff.lock().await.recv().await?;
        if self.is_stopped() {
            debug!("connection requested from stopped pool {}", self.addr);
            return None;
        }

        self.handoffs.fetch_add(1, Ordering::Relaxed);
        Some(producer)
    }

    /// Apply `op` to every connection in index order, stopping at the first error.
    pub async fn each<F, Fut>(&self, op: F) -> Result<(), ProducerError>
    where
        F: FnMut(Arc<P>) -> Fut,
        Fut: Future<Output = Result<(), ProducerError>>,
    {
        broadcast(&self.producers, op).await
    }

    /// Ping every connection; any single failure fails the whole check.
    pub async fn ping(&self) -> Result<(), ProducerError> {
        self.each(|p| async move { p.ping().await }).await
    }

    pub async fn set_logger(&self, logger: Arc<dyn Logger>, level: LogLevel) {
        let _ = self
            .each(|p| {
                p.set_logger(logger.clone(), level);
                future::ready(Ok(()))
            })
            .await;
    }

    /// Stop every connection, then end the scheduler.
    ///
    /// The first call starts the shutdown on its own task, so it runs to
    /// completion even if the calling future is dropped. Every call, first or
    /// not, waits for that shutdown to finish.
    pub async fn stop(&self) {
        let mut done = self.shutdown_signal();
        if done.wait_for(|finished| *finished).await.is_err() {
            warn!("shutdown of producer pool for {} did not complete", self.addr);
        }
    }

    pub async fn publish(&self, topic: &str, body: Bytes) -> Result<(), ProducerError> {
        self.checkout().await?.publish(topic, body).await
    }

    pub async fn multi_publish(&self, topic: &str, bodies: Vec<Bytes>) -> Result<(), ProducerError> {
        self.checkout().await?.multi_publish(topic, bodies).await
    }

    pub async fn publish_async(
        &self,
        topic: &str,
        body: Bytes,
        done: mpsc::Sender<ProducerTransaction>,
        args: TransactionArgs,
    ) -> Result<(), ProducerError> {
        self.checkout()
            .await?
            .publish_async(topic, body, done, args)
            .await
    }

    pub async fn multi_publish_async(
        &self,
        topic: &str,
        bodies: Vec<Bytes>,
        done: mpsc::Sender<ProducerTransaction>,
        args: TransactionArgs,
    ) -> Result<(), ProducerError> {
        self.checkout()
            .await?
            .multi_publish_async(topic, bodies, done, args)
            .await
    }

    pub async fn deferred_publish(
        &self,
        topic: &str,
        delay: Duration,
        body: Bytes,
    ) -> Result<(), ProducerError> {
        self.checkout()
            .await?
            .deferred_publish(topic, delay, body)
            .await
    }

    pub async fn deferred_publish_async(
        &self,
        topic: &str,
        delay: Duration,
        body: Bytes,
        done: mpsc::Sender<ProducerTransaction>,
        args: TransactionArgs,
    ) -> Result<(), ProducerError> {
        self.checkout()
            .await?
            .deferred_publish_async(topic, delay, body, done, args)
            .await
    }
}

// -----------------------------------------------------------------------------
// ----- ProducerPool: Private -------------------------------------------------

impl<P: Producer> ProducerPool<P> {
    fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    async fn checkout(&self) -> Result<Arc<P>, ProducerError> {
        self.next().await.ok_or(ProducerError::Stopped)
    }

    fn shutdown_signal(&self) -> watch::Receiver<bool> {
        let mut shutdown = self.shutdown.lock();
        if let Some(done) = shutdown.as_ref() {
            debug!("producer pool for {} already stopping", self.addr);
            return done.clone();
        }

        info!(
            "stopping producer pool for {} ({} connections)",
            self.addr,
            self.producers.len()
        );

        let (done_tx, done_rx) = watch::channel(false);
        let producers = self.producers.clone();
        let stop_tx = self.stop_tx.clone();
        let scheduler = self.scheduler.lock().take();
        let addr = self.addr.clone();

        self.runtime.spawn(async move {
            let _ = broadcast(&producers, |p| async move {
                p.stop().await;
                Ok(())
            })
            .await;
            drop(producers);

            stop_tx.send_replace(true);

            if let Some(handle) = scheduler {
                if let Err(err) = handle.await {
                    warn!("round-robin scheduler for {addr} ended abnormally: {err}");
                }
            }

            done_tx.send_replace(true);
        });

        *shutdown = Some(done_rx.clone());
        done_rx
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

async fn broadcast<P, F, Fut>(producers: &[Arc<P>], mut op: F) -> Result<(), ProducerError>
where
    F: FnMut(Arc<P>) -> Fut,
    Fut: Future<Output = Result<(), ProducerError>>,
{
    for producer in producers {
        op(producer.clone()).await?;
    }
    Ok(())
}

impl<P: Producer> fmt::Display for ProducerPool<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.addr)
    }
}

// -----------------------------------------------------------------------------
// ----- ProducerPool: Producer ------------------------------------------------

// A pool stands in anywhere a single connection is accepted.
impl<P: Producer> Producer for ProducerPool<P> {
    async fn ping(&self) -> Result<(), ProducerError> {
        ProducerPool::ping(self).await
    }

    fn set_logger(&self, logger: Arc<dyn Logger>, level: LogLevel) {
        for producer in &self.producers {
            producer.set_logger(logger.clone(), level);
        }
    }

    async fn stop(&self) {
        ProducerPool::stop(self).await
    }

    async fn publish(&self, topic: &str, body: Bytes) -> Result<(), ProducerError> {
        ProducerPool::publish(self, topic, body).await
    }

    async fn multi_publish(&self, topic: &str, bodies: Vec<Bytes>) -> Result<(), ProducerError> {
        ProducerPool::multi_publish(self, topic, bodies).await
    }

    async fn publish_async(
        &self,
        topic: &str,
        body: Bytes,
        done: mpsc::Sender<ProducerTransaction>,
        args: TransactionArgs,
    ) -> Result<(), ProducerError> {
        ProducerPool::publish_async(self, topic, body, done, args).await
    }

    async fn multi_publish_async(
        &self,
        topic: &str,
        bodies: Vec<Bytes>,
        done: mpsc::Sender<ProducerTransaction>,
        args: TransactionArgs,
    ) -> Result<(), ProducerError> {
        ProducerPool::multi_publish_async(self, topic, bodies, done, args).await
    }

    async fn deferred_publish(
        &self,
        topic: &str,
        delay: Duration,
        body: Bytes,
    ) -> Result<(), ProducerError> {
        ProducerPool::deferred_publish(self, topic, delay, body).await
    }

    async fn deferred_publish_async(
        &self,
        topic: &str,
        delay: Duration,
        body: Bytes,
        done: mpsc::Sender<ProducerTransaction>,
        args: TransactionArgs,
    ) -> Result<(), ProducerError> {
        ProducerPool::deferred_publish_async(self, topic, delay, body, done, args).await
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
