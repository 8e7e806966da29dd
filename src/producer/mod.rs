//! The connection capability the pool balances over. Concrete broker
//! connections live outside this crate and plug in through [`Producer`].

pub mod connection;
pub mod logger;
pub mod transaction;

pub use connection::Producer;
pub use logger::{Logger, TracingLogger};
pub use transaction::{ProducerTransaction, TransactionArgs};
