//! Product listing repository.

use crate::error::MetadataResult;
use crate::models::ProductRow;
use async_trait::async_trait;
use bazaar_core::ApprovalStatus;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Filter for product listings.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Only products owned by this seller.
    pub seller_id: Option<Uuid>,
    /// Only products in this approval status.
    pub status: Option<ApprovalStatus>,
    /// Only products with `is_active AND is_approved` (storefront view).
    pub visible_only: bool,
    /// Only products in this category.
    pub category: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl ProductFilter {
    /// The storefront view.
    pub fn storefront(limit: u32, offset: u32) -> Self {
        Self {
            visible_only: true,
            limit,
            offset,
            ..Self::default()
        }
    }
}

/// Product counts per approval status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApprovalCounts {
    pub pending: u64,
    pub under_review: u64,
    pub approved: u64,
    pub rejected: u64,
}

impl ApprovalCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.under_review + self.approved + self.rejected
    }

    /// Add `count` rows of the stored status string. Unknown statuses are ignored.
    pub fn add(&mut self, status: &str, count: i64) {
        let count = u64::try_from(count).unwrap_or(0);
        match ApprovalStatus::parse(status) {
            Ok(ApprovalStatus::Pending) => self.pending += count,
            Ok(ApprovalStatus::UnderReview) => self.under_review += count,
            Ok(ApprovalStatus::Approved) => self.approved += count,
            Ok(ApprovalStatus::Rejected) => self.rejected += count,
            Err(_) => {}
        }
    }
}

/// Repository for product listings.
#[async_trait]
pub trait ProductRepo: Send + Sync {
    /// Insert a product.
    async fn create_product(&self, product: &ProductRow) -> MetadataResult<()>;

    /// Get a product by ID.
    async fn get_product(&self, product_id: Uuid) -> MetadataResult<Option<ProductRow>>;

    /// Update the seller-controlled columns of a product.
    ///
    /// Approval columns are untouched. Returns the updated row, or `None`
    /// when no product with that ID is owned by `seller_id`.
    async fn update_product_details(
        &self,
        seller_id: Uuid,
        product: &ProductRow,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<Option<ProductRow>>;

    /// Delete a seller's product. Returns false if nothing was deleted.
    async fn delete_product(&self, seller_id: Uuid, product_id: Uuid) -> MetadataResult<bool>;

    /// List products matching a filter, newest first.
    async fn list_products(&self, filter: &ProductFilter) -> MetadataResult<Vec<ProductRow>>;

    /// Count products per approval status, optionally for one seller.
    async fn count_products_by_status(
        &self,
        seller_id: Option<Uuid>,
    ) -> MetadataResult<ApprovalCounts>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_counts_add() {
        let mut counts = ApprovalCounts::default();
        counts.add("pending", 3);
        counts.add("approved", 2);
        counts.add("under_review", 1);
        counts.add("archived", 9);
        assert_eq!(counts.pending, 3);
        assert_eq!(counts.approved, 2);
        assert_eq!(counts.under_review, 1);
        assert_eq!(counts.rejected, 0);
        assert_eq!(counts.total(), 6);
    }
}
