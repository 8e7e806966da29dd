//! Round-robin pool of broker producer connections.
//!
//! A [`ProducerPool`] owns a fixed number of connections to one address and
//! spreads publishes across them in cyclic order, so one logical producer is
//! not bottlenecked on a single connection.

pub mod config;
pub mod errors;
pub mod pool;
pub mod producer;
pub mod telemetry;

pub use config::{ConfigError, LogLevel, PoolSettings, ProducerConfig};
pub use errors::{PoolError, ProducerError};
pub use pool::{PoolStats, ProducerPool};
pub use producer::{Logger, Producer, ProducerTransaction, TracingLogger, TransactionArgs};
