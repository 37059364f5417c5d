//! Notification dispatcher and read-state operations.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use toma5_types::error::WorkflowError;
use toma5_types::notification::{LiveEvent, Notification, NotificationId, NotificationPage};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::catalog::Outgoing;
use super::live::{LiveRegistry, LiveSubscription};
use crate::repository::notification::{NotificationQuery, NotificationRepository};
use crate::workflow::clock::Clock;

/// Persists notifications and pushes them to live connections.
///
/// Owns the live registry: nothing else mutates it.
pub struct NotificationDispatcher<N: NotificationRepository> {
    repo: Arc<N>,
    live: Arc<LiveRegistry>,
    clock: Arc<dyn Clock>,
}

impl<N: NotificationRepository> NotificationDispatcher<N> {
    pub fn new(repo: Arc<N>, live_buffer: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            live: Arc::new(LiveRegistry::new(live_buffer)),
            clock,
        }
    }

    /// Persist one notification unread, then push it live if the recipient is
    /// connected.
    pub async fn dispatch(&self, outgoing: Outgoing) -> Result<NotificationId, WorkflowError> {
        let notification = Notification {
            id: NotificationId::new(),
            recipient_id: outgoing.recipient_id,
            kind: outgoing.kind,
            title: outgoing.title,
            message: outgoing.message,
            payload: outgoing.payload,
            read: false,
            created_at: self.clock.now(),
            read_at: None,
        };
        self.repo.save(&notification).await?;

        let pushed = self
            .live
            .push_to_user(&notification.recipient_id, &LiveEvent::from_notification(&notification));
        debug!(
            id = %notification.id,
            recipient = %notification.recipient_id,
            kind = %notification.kind,
            pushed,
            "notification dispatched"
        );
        Ok(notification.id)
    }

    /// Dispatch a batch, logging and swallowing individual failures.
    pub async fn deliver(&self, batch: Vec<Outgoing>) -> usize {
        let mut delivered = 0;
        for outgoing in batch {
            let recipient = outgoing.recipient_id;
            let kind = outgoing.kind;
            match self.dispatch(outgoing).await {
                Ok(_) => delivered += 1,
                Err(e) => warn!(%recipient, %kind, error = %e, "notification delivery failed"),
            }
        }
        delivered
    }

    /// Push an event to every live connection without persisting it.
    pub fn broadcast(&self, event: &LiveEvent) -> usize {
        self.live.broadcast(event)
    }

    /// Open a live connection for `user_id`.
    pub fn connect(&self, user_id: Uuid) -> LiveSubscription {
        self.live.connect(user_id)
    }

    pub fn live(&self) -> &Arc<LiveRegistry> {
        &self.live
    }

    /// Mark one notification read on behalf of `caller_id`.
    pub async fn mark_read(
        &self,
        id: &NotificationId,
        caller_id: &Uuid,
    ) -> Result<Notification, WorkflowError> {
        let mut notification = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("notification"))?;
        if notification.recipient_id != *caller_id {
            return Err(WorkflowError::forbidden(
                "notification belongs to another user",
            ));
        }
        if !notification.read {
            let at = self.clock.now();
            self.repo.mark_read(id, at).await?;
            notification.read = true;
            notification.read_at = Some(at);
        }
        Ok(notification)
    }

    /// Mark every unread notification of `recipient_id` read.
    pub async fn mark_all_read(&self, recipient_id: &Uuid) -> Result<u64, WorkflowError> {
        Ok(self
            .repo
            .mark_all_read(recipient_id, self.clock.now())
            .await?)
    }

    /// One page of a recipient's notifications, newest first.
    pub async fn list(
        &self,
        recipient_id: &Uuid,
        query: NotificationQuery,
    ) -> Result<NotificationPage, WorkflowError> {
        let query = query.normalized();
        let (items, total) = self.repo.list(recipient_id, &query).await?;
        let unread_total = self.repo.count_unread(recipient_id).await?;
        let total_pages = total.div_ceil(u64::from(query.limit)) as u32;
        Ok(NotificationPage {
            items,
            total,
            unread_total,
            page: query.page,
            total_pages,
        })
    }

    /// Delete read notifications older than `retention_days` as of `now`.
    pub async fn purge_read(
        &self,
        now: DateTime<Utc>,
        retention_days: u32,
    ) -> Result<u64, WorkflowError> {
        let cutoff = now - Duration::days(i64::from(retention_days));
        let purged = self.repo.purge_read_before(cutoff).await?;
        info!(purged, %cutoff, "purged read notifications");
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryNotifications;
    use crate::workflow::clock::FixedClock;
    use chrono::TimeZone;
    use serde_json::json;
    use toma5_types::notification::NotificationKind;

    fn dispatcher() -> (
        NotificationDispatcher<InMemoryNotifications>,
        Arc<InMemoryNotifications>,
        Arc<FixedClock>,
    ) {
        let repo = Arc::new(InMemoryNotifications::default());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 5, 4, 15, 0, 0).unwrap(),
        ));
        (
            NotificationDispatcher::new(repo.clone(), 8, clock.clone()),
            repo,
            clock,
        )
    }

    fn outgoing(recipient: Uuid, message: &str) -> Outgoing {
        Outgoing::new(
            recipient,
            NotificationKind::TaskAssigned,
            "New task",
            message,
            json!({}),
        )
    }

    #[tokio::test]
    async fn test_dispatch_persists_unread_and_pushes_live() {
        let (dispatcher, repo, _) = dispatcher();
        let user = Uuid::now_v7();
        let mut sub = dispatcher.connect(user);

        let id = dispatcher.dispatch(outgoing(user, "weld frame")).await.unwrap();

        let stored = repo.get(&id).await.unwrap().unwrap();
        assert!(!stored.read);
        let event = sub.recv().await.unwrap();
        assert_eq!(event.event, "task-assigned");
        assert_eq!(event.payload["message"], "weld frame");
    }

    #[tokio::test]
    async fn test_dispatch_without_connection_still_persists() {
        let (dispatcher, repo, _) = dispatcher();
        let user = Uuid::now_v7();
        dispatcher.dispatch(outgoing(user, "offline")).await.unwrap();
        assert_eq!(repo.count_unread(&user).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_deliver_swallows_failures() {
        let (dispatcher, repo, _) = dispatcher();
        repo.fail_saves(true);
        let delivered = dispatcher
            .deliver(vec![outgoing(Uuid::now_v7(), "a"), outgoing(Uuid::now_v7(), "b")])
            .await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_mark_read_rejects_other_recipient() {
        let (dispatcher, _, _) = dispatcher();
        let owner = Uuid::now_v7();
        let id = dispatcher.dispatch(outgoing(owner, "x")).await.unwrap();

        let err = dispatcher.mark_read(&id, &Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        let read = dispatcher.mark_read(&id, &owner).await.unwrap();
        assert!(read.read);
        assert!(read.read_at.is_some());

        let err = dispatcher
            .mark_read(&NotificationId::new(), &owner)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_pages_newest_first_with_totals() {
        let (dispatcher, _, clock) = dispatcher();
        let user = Uuid::now_v7();
        for i in 0..5 {
            dispatcher
                .dispatch(outgoing(user, &format!("n{i}")))
                .await
                .unwrap();
            clock.advance(Duration::minutes(1));
        }
        let first = dispatcher.list(&user, NotificationQuery::default()).await.unwrap();
        dispatcher.mark_read(&first.items[0].id, &user).await.unwrap();

        let page = dispatcher
            .list(
                &user,
                NotificationQuery {
                    limit: 2,
                    page: 1,
                    only_unread: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.unread_total, 4);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items[0].message, "n4");
        assert_eq!(page.items[1].message, "n3");

        let unread = dispatcher
            .list(
                &user,
                NotificationQuery {
                    limit: 20,
                    page: 1,
                    only_unread: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(unread.total, 4);
        assert!(unread.items.iter().all(|n| !n.read));
    }

    #[tokio::test]
    async fn test_mark_all_read_counts_and_purge_respects_retention() {
        let (dispatcher, repo, clock) = dispatcher();
        let user = Uuid::now_v7();
        dispatcher.dispatch(outgoing(user, "a")).await.unwrap();
        dispatcher.dispatch(outgoing(user, "b")).await.unwrap();

        assert_eq!(dispatcher.mark_all_read(&user).await.unwrap(), 2);
        assert_eq!(dispatcher.mark_all_read(&user).await.unwrap(), 0);

        let purged = dispatcher.purge_read(clock.now() + Duration::days(10), 30).await.unwrap();
        assert_eq!(purged, 0);
        let purged = dispatcher.purge_read(clock.now() + Duration::days(31), 30).await.unwrap();
        assert_eq!(purged, 2);
        assert_eq!(repo.len(), 0);
    }
}
