//! Decoupled follow-up delivery.
//!
//! Producers enqueue without waiting; a single delivery worker drains the
//! queue in order. A lost push can never roll back or block a committed
//! transition.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use toma5_types::notification::LiveEvent;
use tracing::{debug, warn};

use super::catalog::Outgoing;
use super::dispatcher::NotificationDispatcher;
use crate::repository::notification::NotificationRepository;

/// Work items processed by the delivery worker.
#[derive(Debug)]
pub enum OutboxMessage {
    /// Persist and push each notification.
    Deliver(Vec<Outgoing>),
    /// Push to every live connection, nothing persisted.
    Broadcast(LiveEvent),
    /// Acknowledged once everything enqueued before it was handled.
    Flush(oneshot::Sender<()>),
}

/// Producer handle onto the delivery queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct NotificationOutbox {
    sender: mpsc::UnboundedSender<OutboxMessage>,
}

impl NotificationOutbox {
    /// Build an outbox and the receiver a delivery worker should drain.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboxMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn enqueue(&self, batch: Vec<Outgoing>) {
        if batch.is_empty() {
            return;
        }
        if self.sender.send(OutboxMessage::Deliver(batch)).is_err() {
            warn!("notification outbox closed, batch dropped");
        }
    }

    pub fn broadcast(&self, event: LiveEvent) {
        if self.sender.send(OutboxMessage::Broadcast(event)).is_err() {
            warn!("notification outbox closed, broadcast dropped");
        }
    }

    /// Wait until everything enqueued so far has been handled.
    ///
    /// Returns immediately if the delivery worker is gone.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(OutboxMessage::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }
}

/// Drain `receiver` through `dispatcher` until every outbox handle is dropped.
pub async fn run_delivery_worker<N>(
    dispatcher: Arc<NotificationDispatcher<N>>,
    mut receiver: mpsc::UnboundedReceiver<OutboxMessage>,
) where
    N: NotificationRepository + 'static,
{
    while let Some(message) = receiver.recv().await {
        match message {
            OutboxMessage::Deliver(batch) => {
                let total = batch.len();
                let delivered = dispatcher.deliver(batch).await;
                if delivered < total {
                    warn!(total, delivered, "some notifications were not delivered");
                }
            }
            OutboxMessage::Broadcast(event) => {
                let reached = dispatcher.broadcast(&event);
                debug!(event = %event.event, reached, "live broadcast");
            }
            OutboxMessage::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!("notification delivery worker stopped");
}

/// Create an outbox and spawn its delivery worker on the current runtime.
pub fn spawn_delivery_worker<N>(
    dispatcher: Arc<NotificationDispatcher<N>>,
) -> (NotificationOutbox, JoinHandle<()>)
where
    N: NotificationRepository + 'static,
{
    let (outbox, receiver) = NotificationOutbox::channel();
    let handle = tokio::spawn(run_delivery_worker(dispatcher, receiver));
    (outbox, handle)
}
