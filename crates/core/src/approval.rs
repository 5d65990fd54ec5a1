//! Product approval lifecycle.
//!
//! A listing moves through `pending -> under_review -> approved | rejected`.
//! Two redundant visibility flags, `is_active` and `is_approved`, are derived
//! from the status when an approval decision is applied. The database does
//! not enforce the relationship, so [`ApprovalRecord::is_consistent`] and the
//! [`crate::consistency`] module exist to detect and repair drift.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

/// Approval status of a product listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Submitted by the seller, not yet picked up by an admin.
    Pending,
    /// An admin is looking at it.
    UnderReview,
    /// Publicly visible on the storefront.
    Approved,
    /// Refused; the seller sees the rejection reason.
    Rejected,
}

impl ApprovalStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [ApprovalStatus; 4] = [
        Self::Pending,
        Self::UnderReview,
        Self::Approved,
        Self::Rejected,
    ];

    /// Parse from the stored string form.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "under_review" => Ok(Self::UnderReview),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(crate::Error::InvalidApprovalStatus(s.to_string())),
        }
    }

    /// Get the stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Visibility flags implied by this status, or `None` when the status
    /// leaves the flags untouched.
    pub fn visibility(&self) -> Option<bool> {
        match self {
            Self::Approved => Some(true),
            Self::Rejected | Self::UnderReview => Some(false),
            Self::Pending => None,
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An approval decision as submitted by a reviewer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    /// Target status.
    pub status: ApprovalStatus,
    /// Reason shown to the seller. Only written for [`ApprovalStatus::Rejected`].
    #[serde(default)]
    pub rejection_reason: Option<String>,
    /// Internal reviewer notes. Written on every path when present.
    #[serde(default)]
    pub admin_notes: Option<String>,
}

impl ApprovalDecision {
    /// Decision with no free text attached.
    pub fn new(status: ApprovalStatus) -> Self {
        Self {
            status,
            rejection_reason: None,
            admin_notes: None,
        }
    }
}

/// Field patch produced by an approval decision.
///
/// Every `Option` column uses `None` for "leave the stored value alone";
/// the patch never clears a column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApprovalPatch {
    pub approval_status: ApprovalStatus,
    pub is_active: Option<bool>,
    pub is_approved: Option<bool>,
    pub approved_at: Option<OffsetDateTime>,
    pub rejected_at: Option<OffsetDateTime>,
    pub rejection_reason: Option<String>,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub updated_at: OffsetDateTime,
}

impl ApprovalPatch {
    /// Compute the patch for a decision.
    ///
    /// | target       | is_active / is_approved | extra                          |
    /// |--------------|-------------------------|--------------------------------|
    /// | approved     | true                    | `approved_at`                  |
    /// | rejected     | false                   | `rejection_reason`, `rejected_at` |
    /// | under_review | false                   |                                |
    /// | pending      | unchanged               |                                |
    ///
    /// `updated_at` is always set; `reviewed_by` is set when a reviewer is known.
    /// A later rejection does not clear `approved_at`.
    pub fn for_decision(
        decision: &ApprovalDecision,
        reviewer: Option<Uuid>,
        now: OffsetDateTime,
    ) -> Self {
        let visibility = decision.status.visibility();
        let (approved_at, rejected_at, rejection_reason) = match decision.status {
            ApprovalStatus::Approved => (Some(now), None, None),
            ApprovalStatus::Rejected => (None, Some(now), decision.rejection_reason.clone()),
            ApprovalStatus::UnderReview | ApprovalStatus::Pending => (None, None, None),
        };

        Self {
            approval_status: decision.status,
            is_active: visibility,
            is_approved: visibility,
            approved_at,
            rejected_at,
            rejection_reason,
            admin_notes: decision.admin_notes.clone(),
            reviewed_by: reviewer,
            updated_at: now,
        }
    }
}

/// The approval columns of a product, detached from storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApprovalRecord {
    pub approval_status: ApprovalStatus,
    pub is_active: bool,
    pub is_approved: bool,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub approved_at: Option<OffsetDateTime>,
    pub rejected_at: Option<OffsetDateTime>,
    pub reviewed_by: Option<Uuid>,
    pub updated_at: OffsetDateTime,
}

impl ApprovalRecord {
    /// A freshly submitted listing: pending and hidden.
    pub fn submitted(now: OffsetDateTime) -> Self {
        Self {
            approval_status: ApprovalStatus::Pending,
            is_active: false,
            is_approved: false,
            admin_notes: None,
            rejection_reason: None,
            approved_at: None,
            rejected_at: None,
            reviewed_by: None,
            updated_at: now,
        }
    }

    /// Apply a patch with the same semantics as the database update.
    pub fn apply(&mut self, patch: &ApprovalPatch) {
        self.approval_status = patch.approval_status;
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        if let Some(approved) = patch.is_approved {
            self.is_approved = approved;
        }
        if let Some(ts) = patch.approved_at {
            self.approved_at = Some(ts);
        }
        if let Some(ts) = patch.rejected_at {
            self.rejected_at = Some(ts);
        }
        if let Some(reason) = &patch.rejection_reason {
            self.rejection_reason = Some(reason.clone());
        }
        if let Some(notes) = &patch.admin_notes {
            self.admin_notes = Some(notes.clone());
        }
        if let Some(reviewer) = patch.reviewed_by {
            self.reviewed_by = Some(reviewer);
        }
        self.updated_at = patch.updated_at;
    }

    /// Whether the listing is shown on the storefront.
    pub fn is_publicly_visible(&self) -> bool {
        self.is_active && self.is_approved
    }

    /// Both flags are set if and only if the status is approved.
    pub fn is_consistent(&self) -> bool {
        let approved = self.approval_status == ApprovalStatus::Approved;
        self.is_active == approved && self.is_approved == approved
    }
}
