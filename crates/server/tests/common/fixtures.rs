//! Test fixtures for generating test data.

use bazaar_metadata::models::{ProductRow, SellerRow};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;
use uuid::Uuid;

/// Counter for generating unique seller emails.
static SELLER_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Compute SHA-256 hash of data as hex string.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub fn sha256_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    result.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A seller with a unique email.
#[allow(dead_code)]
pub fn seller_row(display_name: &str) -> SellerRow {
    let n = SELLER_COUNTER.fetch_add(1, Ordering::Relaxed);
    let now = OffsetDateTime::now_utc();
    SellerRow {
        seller_id: Uuid::new_v4(),
        display_name: display_name.to_string(),
        email: format!("seller-{n}-{}@bazaar.test", Uuid::new_v4().simple()),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// A product with explicit status and flags, for seeding drifted rows.
#[allow(dead_code)]
pub fn product_row(seller_id: Uuid, name: &str, status: &str, active: bool, approved: bool) -> ProductRow {
    let now = OffsetDateTime::now_utc();
    ProductRow {
        product_id: Uuid::new_v4(),
        seller_id,
        name: name.to_string(),
        description: Some(format!("{name} description")),
        price_cents: 2500,
        stock_quantity: 10,
        category: Some("home".to_string()),
        approval_status: status.to_string(),
        is_active: active,
        is_approved: approved,
        admin_notes: None,
        rejection_reason: None,
        approved_at: None,
        rejected_at: None,
        reviewed_by: None,
        created_at: now,
        updated_at: now,
    }
}

/// A freshly submitted product: pending and hidden.
#[allow(dead_code)]
pub fn pending_product(seller_id: Uuid, name: &str) -> ProductRow {
    product_row(seller_id, name, "pending", false, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hash_known_value() {
        assert_eq!(
            sha256_hash(b"test-admin-token"),
            "17d6bfe05d1b1fb7bc499f8e3f639c7b3eda4c40f321eef8887a0c04c89a99c5"
        );
    }

    #[test]
    fn test_seller_rows_have_unique_emails() {
        let a = seller_row("a");
        let b = seller_row("b");
        assert_ne!(a.email, b.email);
        assert_ne!(a.seller_id, b.seller_id);
    }
}
