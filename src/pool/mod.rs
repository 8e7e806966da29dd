pub mod producer_pool;
mod scheduler;

pub use producer_pool::{PoolStats, ProducerPool};
