//! Notification repository trait definition.

use chrono::{DateTime, Utc};
use toma5_types::error::RepositoryError;
use toma5_types::notification::{Notification, NotificationId};
use uuid::Uuid;

/// Paging parameters for a recipient's notification list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationQuery {
    pub limit: u32,
    /// 1-based page number.
    pub page: u32,
    pub only_unread: bool,
}

impl NotificationQuery {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Clamp limit and page into their valid ranges.
    pub fn normalized(self) -> Self {
        Self {
            limit: self.limit.clamp(1, Self::MAX_LIMIT),
            page: self.page.max(1),
            only_unread: self.only_unread,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for NotificationQuery {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            page: 1,
            only_unread: false,
        }
    }
}

/// Repository trait for persisted notifications.
pub trait NotificationRepository: Send + Sync {
    fn save(
        &self,
        notification: &Notification,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get(
        &self,
        id: &NotificationId,
    ) -> impl std::future::Future<Output = Result<Option<Notification>, RepositoryError>> + Send;

    /// Mark one notification read. Returns `false` if it was already read.
    fn mark_read(
        &self,
        id: &NotificationId,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Mark every unread notification of a recipient read. Returns the count.
    fn mark_all_read(
        &self,
        recipient_id: &Uuid,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// One page newest-first, plus the total matching the query.
    fn list(
        &self,
        recipient_id: &Uuid,
        query: &NotificationQuery,
    ) -> impl std::future::Future<Output = Result<(Vec<Notification>, u64), RepositoryError>> + Send;

    fn count_unread(
        &self,
        recipient_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Delete read notifications whose read timestamp is before `cutoff`.
    fn purge_read_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
