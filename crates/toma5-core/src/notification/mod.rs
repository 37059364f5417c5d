//! Notification delivery: durable record first, best-effort live push second.
//!
//! The engine never calls the dispatcher inline. It enqueues on the
//! [`NotificationOutbox`] after committing, and a background delivery worker
//! drains the outbox through the [`NotificationDispatcher`].

pub mod catalog;
pub mod dispatcher;
pub mod live;
pub mod outbox;

pub use catalog::Outgoing;
pub use dispatcher::NotificationDispatcher;
pub use live::{LiveRegistry, LiveSubscription};
pub use outbox::{NotificationOutbox, OutboxMessage, spawn_delivery_worker};
