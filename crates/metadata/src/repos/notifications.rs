//! Seller notification repository.

use crate::error::MetadataResult;
use crate::models::NotificationRow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for seller notifications.
#[async_trait]
pub trait NotificationRepo: Send + Sync {
    /// Store a notification.
    async fn create_notification(&self, notification: &NotificationRow) -> MetadataResult<()>;

    /// List a seller's notifications, newest first.
    async fn list_notifications(
        &self,
        seller_id: Uuid,
        unread_only: bool,
        limit: u32,
    ) -> MetadataResult<Vec<NotificationRow>>;

    /// Mark a notification read. Returns false if it does not belong to the seller.
    async fn mark_notification_read(
        &self,
        seller_id: Uuid,
        notification_id: Uuid,
        read_at: OffsetDateTime,
    ) -> MetadataResult<bool>;
}
