use tokio::sync::broadcast;
use tracing::trace;

use crate::pipeline::PipelineEvent;

/// Fan-out of finalized bars to any number of subscribers.
pub struct BarBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl BarBus {
    /// `capacity` is the per-subscriber backlog.
    ///
    /// The channel is a ring: a subscriber that falls further behind loses
    /// its oldest events (`RecvError::Lagged`), the publisher never blocks.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publishes one event; returns how many subscribers received it.
    pub fn publish(&self, event: PipelineEvent) -> usize {
        // only clone into the channel when somebody is listening
        if self.tx.receiver_count() == 0 {
            return 0;
        }
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                trace!("bar event dropped: no subscribers");
                0
            }
        }
    }
}

impl Default for BarBus {
    fn default() -> Self {
        Self::new(2000)
    }
}
