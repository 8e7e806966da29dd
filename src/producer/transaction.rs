use std::any::Any;
use std::sync::Arc;

use crate::errors::ProducerError;

/// Caller values echoed back untouched with the completion of an async publish.
pub type TransactionArgs = Vec<Arc<dyn Any + Send + Sync>>;

/// Completion of an async publish, delivered on the caller's channel.
#[derive(Debug)]
pub struct ProducerTransaction {
    pub result: Result<(), ProducerError>,
    pub args: TransactionArgs,
}

impl ProducerTransaction {
    pub fn new(result: Result<(), ProducerError>, args: TransactionArgs) -> Self {
        Self { result, args }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// First echoed argument of type `T`, if any.
    pub fn arg<T: Any>(&self) -> Option<&T> {
        self.args.iter().find_map(|a| a.downcast_ref::<T>())
    }
}
