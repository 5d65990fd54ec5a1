//! Seller account repository.

use crate::error::MetadataResult;
use crate::models::SellerRow;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for seller accounts.
#[async_trait]
pub trait SellerRepo: Send + Sync {
    /// Create a seller. Fails with `AlreadyExists` on a duplicate email.
    async fn create_seller(&self, seller: &SellerRow) -> MetadataResult<()>;

    async fn get_seller(&self, seller_id: Uuid) -> MetadataResult<Option<SellerRow>>;

    /// List sellers, newest first.
    async fn list_sellers(&self, limit: u32, offset: u32) -> MetadataResult<Vec<SellerRow>>;
}
