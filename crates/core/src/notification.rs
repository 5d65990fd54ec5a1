//! Seller notifications emitted by approval decisions.

use crate::approval::ApprovalStatus;
use std::fmt;

/// Kind of seller notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    ProductApproved,
    ProductRejected,
    ProductUnderReview,
    ProductPending,
}

impl NotificationKind {
    /// Notification sent when a product moves to `status`.
    pub fn for_status(status: ApprovalStatus) -> Self {
        match status {
            ApprovalStatus::Approved => Self::ProductApproved,
            ApprovalStatus::Rejected => Self::ProductRejected,
            ApprovalStatus::UnderReview => Self::ProductUnderReview,
            ApprovalStatus::Pending => Self::ProductPending,
        }
    }

    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "product_approved" => Ok(Self::ProductApproved),
            "product_rejected" => Ok(Self::ProductRejected),
            "product_under_review" => Ok(Self::ProductUnderReview),
            "product_pending" => Ok(Self::ProductPending),
            _ => Err(crate::Error::InvalidNotification(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductApproved => "product_approved",
            Self::ProductRejected => "product_rejected",
            Self::ProductUnderReview => "product_under_review",
            Self::ProductPending => "product_pending",
        }
    }

    /// Human-readable message for the seller dashboard.
    pub fn message(&self, product_name: &str, rejection_reason: Option<&str>) -> String {
        match self {
            Self::ProductApproved => {
                format!("Your product \"{product_name}\" was approved and is now live.")
            }
            Self::ProductRejected => match rejection_reason {
                Some(reason) => {
                    format!("Your product \"{product_name}\" was rejected: {reason}")
                }
                None => format!("Your product \"{product_name}\" was rejected."),
            },
            Self::ProductUnderReview => {
                format!("Your product \"{product_name}\" is under review.")
            }
            Self::ProductPending => {
                format!("Your product \"{product_name}\" was returned to the review queue.")
            }
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
