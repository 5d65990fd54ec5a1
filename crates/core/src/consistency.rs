//! Visibility flag drift detection and repair sweeps.

use crate::approval::{ApprovalRecord, ApprovalStatus};
use serde::{Deserialize, Serialize};

/// A bulk repair sweep. Each sweep is a single filtered update; rows it fixes
/// no longer match its predicate, so re-running it is a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RepairSweep {
    /// `approved` rows with `is_active = false` get both flags set.
    ActivateApproved,
    /// `rejected` / `under_review` rows with `is_active = true` get both flags cleared.
    DeactivateUnapproved,
}

impl RepairSweep {
    /// Sweeps in the order they are run.
    pub const ALL: [RepairSweep; 2] = [Self::ActivateApproved, Self::DeactivateUnapproved];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActivateApproved => "activate_approved",
            Self::DeactivateUnapproved => "deactivate_unapproved",
        }
    }

    /// Row filter of the sweep.
    pub fn matches(&self, record: &ApprovalRecord) -> bool {
        match self {
            Self::ActivateApproved => {
                record.approval_status == ApprovalStatus::Approved && !record.is_active
            }
            Self::DeactivateUnapproved => {
                matches!(
                    record.approval_status,
                    ApprovalStatus::Rejected | ApprovalStatus::UnderReview
                ) && record.is_active
            }
        }
    }

    /// Apply the sweep to one record. Returns whether the record matched.
    pub fn apply(&self, record: &mut ApprovalRecord) -> bool {
        if !self.matches(record) {
            return false;
        }
        let visible = matches!(self, Self::ActivateApproved);
        record.is_active = visible;
        record.is_approved = visible;
        true
    }
}

/// Why a record violates the visibility invariant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Drift {
    /// Approved but hidden from the storefront.
    ApprovedHidden,
    /// Rejected or under review but still active.
    UnapprovedVisible,
    /// Pending with flags left set, typically after a reset from approved.
    PendingVisible,
    /// Status agrees with `is_active` but `is_approved` disagrees.
    FlagMismatch,
}

impl Drift {
    /// Classify a record, or `None` if it is consistent.
    pub fn classify(record: &ApprovalRecord) -> Option<Self> {
        if record.is_consistent() {
            return None;
        }
        if RepairSweep::ActivateApproved.matches(record) {
            return Some(Self::ApprovedHidden);
        }
        if RepairSweep::DeactivateUnapproved.matches(record) {
            return Some(Self::UnapprovedVisible);
        }
        if record.approval_status == ApprovalStatus::Pending && record.is_active {
            return Some(Self::PendingVisible);
        }
        Some(Self::FlagMismatch)
    }

    /// The sweep that repairs this drift, if any.
    pub fn repaired_by(&self) -> Option<RepairSweep> {
        match self {
            Self::ApprovedHidden => Some(RepairSweep::ActivateApproved),
            Self::UnapprovedVisible => Some(RepairSweep::DeactivateUnapproved),
            Self::PendingVisible | Self::FlagMismatch => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApprovedHidden => "approved_hidden",
            Self::UnapprovedVisible => "unapproved_visible",
            Self::PendingVisible => "pending_visible",
            Self::FlagMismatch => "flag_mismatch",
        }
    }
}

/// Rows touched by a repair pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairStats {
    /// Rows updated by [`RepairSweep::ActivateApproved`].
    pub activated: u64,
    /// Rows updated by [`RepairSweep::DeactivateUnapproved`].
    pub deactivated: u64,
}

impl RepairStats {
    pub fn total(&self) -> u64 {
        self.activated + self.deactivated
    }

    /// Run both sweeps over an in-memory set of records.
    pub fn sweep_all(records: &mut [ApprovalRecord]) -> Self {
        let mut stats = Self::default();
        for record in records.iter_mut() {
            if RepairSweep::ActivateApproved.apply(record) {
                stats.activated += 1;
            }
        }
        for record in records.iter_mut() {
            if RepairSweep::DeactivateUnapproved.apply(record) {
                stats.deactivated += 1;
            }
        }
        stats
    }
}
