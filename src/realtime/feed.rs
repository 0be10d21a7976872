// src/realtime/feed.rs

use std::sync::Arc;

use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::realtime::{ChangeEvent, Filter, Table};

/// Process-wide fan-out of change events.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<Arc<ChangeEvent>>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: ChangeEvent) {
        tracing::debug!(table = %event.table, kind = ?event.kind, "Publishing change event");
        // No subscribers is not an error.
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self, table: Table, filter: Option<Filter>) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            table,
            filter,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Events for one table, optionally narrowed by an equality filter.
pub struct Subscription {
    receiver: broadcast::Receiver<Arc<ChangeEvent>>,
    table: Table,
    filter: Option<Filter>,
}

impl Subscription {
    pub fn table(&self) -> Table {
        self.table
    }

    /// Next matching event, or `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<Arc<ChangeEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if event.table != self.table {
                        continue;
                    }
                    if let Some(filter) = &self.filter {
                        if !filter.matches(&event) {
                            continue;
                        }
                    }
                    return Some(event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        table = %self.table,
                        skipped,
                        "Realtime subscriber lagged, skipping ahead"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Arc<ChangeEvent>> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription
                .next()
                .await
                .map(|event| (event, subscription))
        })
    }
}
