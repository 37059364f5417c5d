//! SQLite notification repository implementation.

use chrono::{DateTime, Utc};
use sqlx::Row;
use toma5_core::repository::notification::{NotificationQuery, NotificationRepository};
use toma5_types::error::RepositoryError;
use toma5_types::notification::{Notification, NotificationId, NotificationKind};
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_err};

/// SQLite-backed implementation of `NotificationRepository`.
pub struct SqliteNotificationRepository {
    pool: DatabasePool,
}

impl SqliteNotificationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_notification(row: &sqlx::sqlite::SqliteRow) -> Result<Notification, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_err)?;
    let recipient_id: String = row.try_get("recipient_id").map_err(query_err)?;
    let kind: String = row.try_get("kind").map_err(query_err)?;
    let payload: String = row.try_get("payload").map_err(query_err)?;
    let created_at: String = row.try_get("created_at").map_err(query_err)?;
    let read_at: Option<String> = row.try_get("read_at").map_err(query_err)?;

    Ok(Notification {
        id: NotificationId(parse_uuid(&id)?),
        recipient_id: parse_uuid(&recipient_id)?,
        kind: kind.parse::<NotificationKind>().map_err(RepositoryError::Query)?,
        title: row.try_get("title").map_err(query_err)?,
        message: row.try_get("message").map_err(query_err)?,
        payload: serde_json::from_str(&payload)
            .map_err(|e| RepositoryError::Query(format!("invalid payload JSON: {e}")))?,
        read: row.try_get("read").map_err(query_err)?,
        created_at: parse_datetime(&created_at)?,
        read_at: read_at.as_deref().map(parse_datetime).transpose()?,
    })
}

impl NotificationRepository for SqliteNotificationRepository {
    async fn save(&self, notification: &Notification) -> Result<(), RepositoryError> {
        let payload = serde_json::to_string(&notification.payload)
            .map_err(|e| RepositoryError::Query(format!("serialize payload: {e}")))?;

        sqlx::query(
            r#"INSERT INTO notifications
               (id, recipient_id, kind, title, message, payload, read, created_at, read_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(notification.id.to_string())
        .bind(notification.recipient_id.to_string())
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&payload)
        .bind(notification.read)
        .bind(format_datetime(&notification.created_at))
        .bind(notification.read_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(())
    }

    async fn get(&self, id: &NotificationId) -> Result<Option<Notification>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM notifications WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.as_ref().map(row_to_notification).transpose()
    }

    async fn mark_read(
        &self,
        id: &NotificationId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE notifications SET read = 1, read_at = ? WHERE id = ? AND read = 0")
            .bind(format_datetime(&at))
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(
        &self,
        recipient_id: &Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE notifications SET read = 1, read_at = ? WHERE recipient_id = ? AND read = 0",
        )
        .bind(format_datetime(&at))
        .bind(recipient_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(result.rows_affected())
    }

    async fn list(
        &self,
        recipient_id: &Uuid,
        query: &NotificationQuery,
    ) -> Result<(Vec<Notification>, u64), RepositoryError> {
        let query = query.normalized();
        let unread_clause = if query.only_unread { " AND read = 0" } else { "" };

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?{unread_clause}"
        ))
        .bind(recipient_id.to_string())
        .fetch_one(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let rows = sqlx::query(&format!(
            "SELECT * FROM notifications WHERE recipient_id = ?{unread_clause} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(recipient_id.to_string())
        .bind(i64::from(query.limit))
        .bind(query.offset() as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let items = rows
            .iter()
            .map(row_to_notification)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((items, total as u64))
    }

    async fn count_unread(&self, recipient_id: &Uuid) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = ? AND read = 0",
        )
        .bind(recipient_id.to_string())
        .fetch_one(&self.pool.reader)
        .await
        .map_err(query_err)?;

        Ok(count as u64)
    }

    async fn purge_read_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM notifications WHERE read = 1 AND read_at < ?")
            .bind(format_datetime(&cutoff))
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        Ok(result.rows_affected())
    }
}
