use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::debug;

// -----------------------------------------------------------------------------
// ----- Scheduler -------------------------------------------------------------

/// Background task feeding connections into the handoff channel in strict
/// cyclic order until told to stop.
///
/// The cursor lives here and nowhere else. It advances before every offer, so
/// the first connection handed out is index `1 % n` and index 0 closes the
/// first cycle.
#[derive(Debug)]
pub(crate) struct Scheduler<P> {
    producers: Vec<Arc<P>>,
    cursor: usize,
    handoff: mpsc::Sender<Arc<P>>,
    stop: watch::Receiver<bool>,
}

impl<P> Scheduler<P>
where
    P: Send + Sync + 'static,
{
    pub(crate) fn new(
        producers: Vec<Arc<P>>,
        handoff: mpsc::Sender<Arc<P>>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            producers,
            cursor: 0,
            handoff,
            stop,
        }
    }

    pub(crate) async fn run(mut self) {
        if self.producers.is_empty() {
            return;
        }

        loop {
            self.cursor = (self.cursor + 1) % self.producers.len();
            let next = self.producers[self.cursor].clone();

            tokio::select! {
                biased;

                // Also fires if the pool dropped its sender.
                _ = self.stop.changed() => {
                    debug!("round-robin scheduler stopping at cursor {}", self.cursor);
                    return;
                }

                sent = self.handoff.send(next) => {
                    if sent.is_err() {
                        debug!("handoff channel closed; round-robin scheduler exiting");
                        return;
                    }
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
