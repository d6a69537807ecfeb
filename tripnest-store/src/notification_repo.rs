use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgExecutor;
use uuid::Uuid;

use tripnest_core::booking::NotificationKind;

use crate::database::StoreError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Fire-and-forget from the caller's point of view: rows are written
/// here, polling endpoints read them. There is no delivery pipeline.
pub struct NotificationRepository;

impl NotificationRepository {
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        kind: NotificationKind,
        message: &str,
    ) -> Result<Notification, StoreError> {
        let row = sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (id, user_id, kind, message)
             VALUES ($1, $2, $3, $4)
             RETURNING id, user_id, kind, message, read, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(kind.as_str())
        .bind(message)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    pub async fn list_for_user<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
    ) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query_as::<_, Notification>(
            "SELECT id, user_id, kind, message, read, created_at
             FROM notifications WHERE user_id = $1
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    /// Returns the updated row, or None when the id is unknown or the
    /// notification belongs to someone else.
    pub async fn set_read<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        user_id: Uuid,
        read: bool,
    ) -> Result<Option<Notification>, StoreError> {
        let row = sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET read = $3
             WHERE id = $1 AND user_id = $2
             RETURNING id, user_id, kind, message, read, created_at",
        )
        .bind(id)
        .bind(user_id)
        .bind(read)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }
}
