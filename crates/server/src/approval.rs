//! Product approval service.
//!
//! Applies an admin decision to a product as one update, then records a
//! seller notification. The update is never rolled back when the
//! notification fails.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use bazaar_core::{ApprovalDecision, ApprovalPatch, ApprovalStatus, NotificationKind};
use bazaar_metadata::models::{NotificationRow, ProductRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// Result of a successfully applied decision.
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    /// The product as stored after the update.
    pub product: ProductRow,
    /// Whether a seller notification was recorded.
    pub notified: bool,
}

impl ApprovalOutcome {
    /// Confirmation message returned to the admin console.
    pub fn message(&self) -> String {
        match self.product.status() {
            Ok(status) => format!("Product status updated to {status}"),
            Err(_) => "Product status updated".to_string(),
        }
    }
}

/// Reject decisions the configuration does not allow.
pub fn validate_decision(state: &AppState, decision: &ApprovalDecision) -> ApiResult<()> {
    if decision.status == ApprovalStatus::Rejected
        && state.config.approval.require_rejection_reason
        && decision
            .rejection_reason
            .as_deref()
            .is_none_or(|r| r.trim().is_empty())
    {
        return Err(ApiError::BadRequest(
            "rejection_reason is required when rejecting a product".to_string(),
        ));
    }
    Ok(())
}

/// Build a decision from its request fields.
///
/// An unknown status counts as a failed decision.
pub fn parse_decision(
    product_id: Uuid,
    approval_status: &str,
    rejection_reason: Option<String>,
    admin_notes: Option<String>,
) -> ApiResult<ApprovalDecision> {
    match ApprovalStatus::parse(approval_status) {
        Ok(status) => Ok(ApprovalDecision {
            status,
            rejection_reason,
            admin_notes,
        }),
        Err(e) => {
            let err = ApiError::from(e);
            metrics::record_approval_failure(err.code());
            tracing::warn!(
                product_id = %product_id,
                status = approval_status,
                error = %err,
                "Approval decision failed"
            );
            Err(err)
        }
    }
}

/// Apply an approval decision to a product.
///
/// `reviewer` is recorded as `reviewed_by` when known.
pub async fn apply_decision(
    state: &AppState,
    product_id: Uuid,
    decision: &ApprovalDecision,
    reviewer: Option<Uuid>,
) -> ApiResult<ApprovalOutcome> {
    let result = apply_decision_inner(state, product_id, decision, reviewer).await;
    match &result {
        Ok(outcome) => {
            metrics::APPROVAL_DECISIONS
                .with_label_values(&[decision.status.as_str()])
                .inc();
            tracing::info!(
                product_id = %product_id,
                status = %decision.status,
                reviewer = ?reviewer,
                notified = outcome.notified,
                "Approval decision applied"
            );
        }
        Err(e) => {
            metrics::record_approval_failure(e.code());
            tracing::warn!(
                product_id = %product_id,
                status = %decision.status,
                error = %e,
                "Approval decision failed"
            );
        }
    }
    result
}

async fn apply_decision_inner(
    state: &AppState,
    product_id: Uuid,
    decision: &ApprovalDecision,
    reviewer: Option<Uuid>,
) -> ApiResult<ApprovalOutcome> {
    validate_decision(state, decision)?;

    if state.metadata.get_product(product_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("product {product_id}")));
    }

    let patch = ApprovalPatch::for_decision(decision, reviewer, OffsetDateTime::now_utc());
    let product = state
        .metadata
        .apply_approval_patch(product_id, &patch)
        .await?
        // Deleted between the lookup and the update.
        .ok_or_else(|| ApiError::NotFound(format!("product {product_id}")))?;

    let notified = if state.config.approval.notify_sellers {
        notify_seller(state, &product, decision).await
    } else {
        false
    };

    Ok(ApprovalOutcome { product, notified })
}

/// Record a notification for the product's seller. Failures are logged only.
async fn notify_seller(state: &AppState, product: &ProductRow, decision: &ApprovalDecision) -> bool {
    let kind = NotificationKind::for_status(decision.status);
    let notification = NotificationRow {
        notification_id: Uuid::new_v4(),
        seller_id: product.seller_id,
        product_id: Some(product.product_id),
        kind: kind.as_str().to_string(),
        message: kind.message(&product.name, decision.rejection_reason.as_deref()),
        created_at: OffsetDateTime::now_utc(),
        read_at: None,
    };

    match state.metadata.create_notification(&notification).await {
        Ok(()) => {
            metrics::NOTIFICATIONS_SENT.inc();
            true
        }
        Err(e) => {
            metrics::NOTIFICATIONS_FAILED.inc();
            tracing::warn!(
                product_id = %product.product_id,
                seller_id = %product.seller_id,
                kind = %kind,
                error = %e,
                "Failed to record seller notification"
            );
            false
        }
    }
}
