use bytes::Bytes;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use nsqpool::{
    LogLevel, Logger, Producer, ProducerConfig, ProducerError, ProducerPool, ProducerTransaction,
    TransactionArgs,
};

pub const ADDR: &str = "127.0.0.1:4150";

// -----------------------------------------------------------------------------
// ----- Journal ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Created,
    Dropped,
    Ping,
    SetLogger(LogLevel),
    Stop,
    Publish {
        topic: String,
        body: Bytes,
    },
    MultiPublish {
        topic: String,
        bodies: Vec<Bytes>,
    },
    PublishAsync {
        topic: String,
        body: Bytes,
    },
    MultiPublishAsync {
        topic: String,
        bodies: Vec<Bytes>,
    },
    DeferredPublish {
        topic: String,
        delay: Duration,
        body: Bytes,
    },
    DeferredPublishAsync {
        topic: String,
        delay: Duration,
        body: Bytes,
    },
}

/// Shared, ordered record of every call made on every test connection.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<(usize, Call)>>>,
}

#[allow(dead_code)]
impl Journal {
    pub fn record(&self, id: usize, call: Call) {
        self.events.lock().unwrap().push((id, call));
    }

    pub fn events(&self) -> Vec<(usize, Call)> {
        self.events.lock().unwrap().clone()
    }

    /// Connection ids, in call order, for calls matching `pred`.
    pub fn ids_for(&self, pred: impl Fn(&Call) -> bool) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter(|(_, call)| pred(call))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn last_call(&self) -> Option<(usize, Call)> {
        self.events().into_iter().last()
    }
}

// -----------------------------------------------------------------------------
// ----- MockProducer ----------------------------------------------------------

/// Which connections misbehave, by construction index.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub fail_construct_at: Option<usize>,
    pub fail_ping: Vec<usize>,
    pub fail_publish: Vec<usize>,
    pub stop_delay: Option<Duration>,
}

#[derive(Debug)]
pub struct MockProducer {
    id: usize,
    journal: Journal,
    fail_ping: bool,
    fail_publish: bool,
    stop_delay: Option<Duration>,
    logger: Mutex<Option<(Arc<dyn Logger>, LogLevel)>>,
}

#[allow(dead_code)]
impl MockProducer {
    pub fn id(&self) -> usize {
        self.id
    }

    fn log(&self, level: LogLevel, message: &str) {
        if let Some((logger, min)) = self.logger.lock().unwrap().as_ref() {
            if min.enables(level) {
                logger.output(level, message);
            }
        }
    }

    fn outcome(&self) -> Result<(), ProducerError> {
        if self.fail_publish {
            return Err(ProducerError::Protocol(format!("E_PUB_FAILED on {}", self.id)));
        }
        Ok(())
    }

    async fn complete(
        &self,
        done: mpsc::Sender<ProducerTransaction>,
        args: TransactionArgs,
    ) -> Result<(), ProducerError> {
        let tx = ProducerTransaction::new(self.outcome(), args);
        done.send(tx).await.map_err(|_| ProducerError::Closing)
    }
}

impl Drop for MockProducer {
    fn drop(&mut self) {
        self.journal.record(self.id, Call::Dropped);
    }
}

impl Producer for MockProducer {
    async fn ping(&self) -> Result<(), ProducerError> {
        self.journal.record(self.id, Call::Ping);
        if self.fail_ping {
            return Err(ProducerError::Protocol(format!("ping failed on {}", self.id)));
        }
        Ok(())
    }

    fn set_logger(&self, logger: Arc<dyn Logger>, level: LogLevel) {
        self.journal.record(self.id, Call::SetLogger(level));
        *self.logger.lock().unwrap() = Some((logger, level));
        self.log(level, &format!("logger attached to connection {}", self.id));
    }

    async fn stop(&self) {
        self.journal.record(self.id, Call::Stop);
        if let Some(delay) = self.stop_delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn publish(&self, topic: &str, body: Bytes) -> Result<(), ProducerError> {
        self.journal.record(
            self.id,
            Call::Publish {
                topic: topic.to_string(),
                body,
            },
        );
        self.log(LogLevel::Debug, &format!("PUB {topic} on {}", self.id));
        self.outcome()
    }

    async fn multi_publish(&self, topic: &str, bodies: Vec<Bytes>) -> Result<(), ProducerError> {
        self.journal.record(
            self.id,
            Call::MultiPublish {
                topic: topic.to_string(),
                bodies,
            },
        );
        self.outcome()
    }

    async fn publish_async(
        &self,
        topic: &str,
        body: Bytes,
        done: mpsc::Sender<ProducerTransaction>,
        args: TransactionArgs,
    ) -> Result<(), ProducerError> {
        self.journal.record(
            self.id,
            Call::PublishAsync {
                topic: topic.to_string(),
                body,
            },
        );
        self.complete(done, args).await
    }

    async fn multi_publish_async(
        &self,
        topic: &str,
        bodies: Vec<Bytes>,
        done: mpsc::Sender<ProducerTransaction>,
        args: TransactionArgs,
    ) -> Result<(), ProducerError> {
        self.journal.record(
            self.id,
            Call::MultiPublishAsync {
                topic: topic.to_string(),
                bodies,
            },
        );
        self.complete(done, args).await
    }

    async fn deferred_publish(
        &self,
        topic: &str,
        delay: Duration,
        body: Bytes,
    ) -> Result<(), ProducerError> {
        self.journal.record(
            self.id,
            Call::DeferredPublish {
                topic: topic.to_string(),
                delay,
                body,
            },
        );
        self.outcome()
    }

    async fn deferred_publish_async(
        &self,
        topic: &str,
        delay: Duration,
        body: Bytes,
        done: mpsc::Sender<ProducerTransaction>,
        args: TransactionArgs,
    ) -> Result<(), ProducerError> {
        self.journal.record(
            self.id,
            Call::DeferredPublishAsync {
                topic: topic.to_string(),
                delay,
                body,
            },
        );
        self.complete(done, args).await
    }
}

// -----------------------------------------------------------------------------
// ----- Builders --------------------------------------------------------------

pub fn connector(
    journal: &Journal,
    plan: Plan,
) -> impl FnMut(&str, &ProducerConfig) -> Result<MockProducer, ProducerError> {
    let journal = journal.clone();
    let mut next_id = 0;

    move |addr, _config| {
        let id = next_id;
        next_id += 1;

        if plan.fail_construct_at == Some(id) {
            return Err(ProducerError::Protocol(format!("cannot dial {addr}")));
        }

        journal.record(id, Call::Created);
        Ok(MockProducer {
            id,
            journal: journal.clone(),
            fail_ping: plan.fail_ping.contains(&id),
            fail_publish: plan.fail_publish.contains(&id),
            stop_delay: plan.stop_delay,
            logger: Mutex::new(None),
        })
    }
}

#[allow(dead_code)]
pub fn pool_with(n: usize, plan: Plan) -> (ProducerPool<MockProducer>, Journal) {
    let journal = Journal::default();
    let pool = ProducerPool::new(ADDR, &ProducerConfig::default(), n, connector(&journal, plan))
        .expect("pool should build");
    (pool, journal)
}

#[allow(dead_code)]
pub fn pool(n: usize) -> (ProducerPool<MockProducer>, Journal) {
    pool_with(n, Plan::default())
}

// -----------------------------------------------------------------------------
// ----- RecordingLogger -------------------------------------------------------

#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

#[allow(dead_code)]
impl RecordingLogger {
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().unwrap().clone()
    }
}

impl Logger for RecordingLogger {
    fn output(&self, level: LogLevel, message: &str) {
        self.lines.lock().unwrap().push((level, message.to_string()));
    }
}
