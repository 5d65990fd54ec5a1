//! Approval decisions and visibility repair.
//!
//! Every method here is a single statement: there is no locking or retry,
//! and concurrent writers resolve by last-write-wins.

use crate::error::MetadataResult;
use crate::models::{ProductRow, RepairRunRow};
use async_trait::async_trait;
use bazaar_core::ApprovalPatch;
use uuid::Uuid;

/// Repository for approval state.
#[async_trait]
pub trait ApprovalRepo: Send + Sync {
    /// Apply an approval patch as one UPDATE.
    ///
    /// Columns the patch leaves as `None` keep their stored value. Returns
    /// the updated row, or `None` when the product does not exist.
    async fn apply_approval_patch(
        &self,
        product_id: Uuid,
        patch: &ApprovalPatch,
    ) -> MetadataResult<Option<ProductRow>>;

    /// Set both visibility flags on approved products that are not active.
    /// Returns the number of rows updated.
    async fn activate_approved_hidden(&self) -> MetadataResult<u64>;

    /// Clear both visibility flags on rejected or under-review products that
    /// are still active. Returns the number of rows updated.
    async fn deactivate_unapproved_visible(&self) -> MetadataResult<u64>;

    /// Products whose flags disagree with their status.
    async fn list_inconsistent_products(&self, limit: u32) -> MetadataResult<Vec<ProductRow>>;

    /// Record a repair run.
    async fn create_repair_run(&self, run: &RepairRunRow) -> MetadataResult<()>;

    /// Most recent repair runs, newest first.
    async fn list_repair_runs(&self, limit: u32) -> MetadataResult<Vec<RepairRunRow>>;
}
