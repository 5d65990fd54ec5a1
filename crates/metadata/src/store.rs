//! Metadata store trait and implementations.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::{
    ApprovalRepo, BootstrapRepo, NotificationRepo, ProductRepo, SellerRepo, TokenRepo,
};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore:
    ProductRepo
    + ApprovalRepo
    + SellerRepo
    + TokenRepo
    + NotificationRepo
    + BootstrapRepo
    + Send
    + Sync
{
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store.
    ///
    /// `path` may be `":memory:"` for a throwaway database.
    pub async fn new(
        path: impl AsRef<Path>,
        query_timeout_secs: Option<u64>,
    ) -> MetadataResult<Self> {
        let path = path.as_ref();
        let in_memory = path.as_os_str() == ":memory:";

        if !in_memory
            && let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let url = if in_memory {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path.display())
        };

        let opts = SqliteConnectOptions::from_str(&url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let mut pool_opts = SqlitePoolOptions::new()
            // One connection: SQLite serializes writers anyway, and an in-memory
            // database is private to its connection.
            .max_connections(1);
        if in_memory {
            pool_opts = pool_opts.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_opts.connect_with(opts).await?;

        let store = Self { pool };
        store.migrate().await?;

        if let Some(secs) = query_timeout_secs {
            tracing::debug!(
                query_timeout_secs = secs,
                "SQLite query timeout is advisory only; use PostgreSQL for enforced timeouts"
            );
        }

        Ok(store)
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Implement all the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use crate::repos::{ApprovalCounts, ProductFilter};
    use bazaar_core::ApprovalPatch;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[async_trait]
    impl SellerRepo for SqliteStore {
        async fn create_seller(&self, seller: &SellerRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO sellers (
                    seller_id, display_name, email, is_active, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(seller.seller_id)
            .bind(&seller.display_name)
            .bind(&seller.email)
            .bind(seller.is_active)
            .bind(seller.created_at)
            .bind(seller.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                MetadataError::from_insert(e, format!("seller email '{}'", seller.email))
            })?;
            Ok(())
        }

        async fn get_seller(&self, seller_id: Uuid) -> MetadataResult<Option<SellerRow>> {
            let row = sqlx::query_as::<_, SellerRow>("SELECT * FROM sellers WHERE seller_id = ?")
                .bind(seller_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_sellers(&self, limit: u32, offset: u32) -> MetadataResult<Vec<SellerRow>> {
            let rows = sqlx::query_as::<_, SellerRow>(
                "SELECT * FROM sellers ORDER BY created_at DESC, seller_id LIMIT ? OFFSET ?",
            )
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }
    }

    #[async_trait]
    impl ProductRepo for SqliteStore {
        async fn create_product(&self, product: &ProductRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO products (
                    product_id, seller_id, name, description, price_cents,
                    stock_quantity, category, approval_status, is_active, is_approved,
                    admin_notes, rejection_reason, approved_at, rejected_at,
                    reviewed_by, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(product.product_id)
            .bind(product.seller_id)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price_cents)
            .bind(product.stock_quantity)
            .bind(&product.category)
            .bind(&product.approval_status)
            .bind(product.is_active)
            .bind(product.is_approved)
            .bind(&product.admin_notes)
            .bind(&product.rejection_reason)
            .bind(product.approved_at)
            .bind(product.rejected_at)
            .bind(product.reviewed_by)
            .bind(product.created_at)
            .bind(product.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                MetadataError::from_insert(e, format!("product {}", product.product_id))
            })?;
            Ok(())
        }

        async fn get_product(&self, product_id: Uuid) -> MetadataResult<Option<ProductRow>> {
            let row =
                sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE product_id = ?")
                    .bind(product_id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row)
        }

        async fn update_product_details(
            &self,
            seller_id: Uuid,
            product: &ProductRow,
            updated_at: OffsetDateTime,
        ) -> MetadataResult<Option<ProductRow>> {
            let row = sqlx::query_as::<_, ProductRow>(
                r#"
                UPDATE products
                SET name = ?, description = ?, price_cents = ?, stock_quantity = ?,
                    category = ?, updated_at = ?
                WHERE product_id = ? AND seller_id = ?
                RETURNING *
                "#,
            )
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price_cents)
            .bind(product.stock_quantity)
            .bind(&product.category)
            .bind(updated_at)
            .bind(product.product_id)
            .bind(seller_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn delete_product(&self, seller_id: Uuid, product_id: Uuid) -> MetadataResult<bool> {
            let result = sqlx::query("DELETE FROM products WHERE product_id = ? AND seller_id = ?")
                .bind(product_id)
                .bind(seller_id)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn list_products(&self, filter: &ProductFilter) -> MetadataResult<Vec<ProductRow>> {
            let status = filter.status.map(|s| s.as_str());
            let rows = sqlx::query_as::<_, ProductRow>(
                r#"
                SELECT * FROM products
                WHERE (? IS NULL OR seller_id = ?)
                  AND (? IS NULL OR approval_status = ?)
                  AND (? IS NULL OR category = ?)
                  AND (? = 0 OR (is_active = 1 AND is_approved = 1))
                ORDER BY created_at DESC, product_id
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(filter.seller_id)
            .bind(filter.seller_id)
            .bind(status)
            .bind(status)
            .bind(&filter.category)
            .bind(&filter.category)
            .bind(filter.visible_only)
            .bind(i64::from(filter.limit))
            .bind(i64::from(filter.offset))
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn count_products_by_status(
            &self,
            seller_id: Option<Uuid>,
        ) -> MetadataResult<ApprovalCounts> {
            let rows: Vec<(String, i64)> = sqlx::query_as(
                r#"
                SELECT approval_status, COUNT(*) FROM products
                WHERE (? IS NULL OR seller_id = ?)
                GROUP BY approval_status
                "#,
            )
            .bind(seller_id)
            .bind(seller_id)
            .fetch_all(&self.pool)
            .await?;

            let mut counts = ApprovalCounts::default();
            for (status, count) in rows {
                counts.add(&status, count);
            }
            Ok(counts)
        }
    }

    #[async_trait]
    impl ApprovalRepo for SqliteStore {
        async fn apply_approval_patch(
            &self,
            product_id: Uuid,
            patch: &ApprovalPatch,
        ) -> MetadataResult<Option<ProductRow>> {
            let row = sqlx::query_as::<_, ProductRow>(
                r#"
                UPDATE products
                SET approval_status = ?,
                    is_active = COALESCE(?, is_active),
                    is_approved = COALESCE(?, is_approved),
                    approved_at = COALESCE(?, approved_at),
                    rejected_at = COALESCE(?, rejected_at),
                    rejection_reason = COALESCE(?, rejection_reason),
                    admin_notes = COALESCE(?, admin_notes),
                    reviewed_by = COALESCE(?, reviewed_by),
                    updated_at = ?
                WHERE product_id = ?
                RETURNING *
                "#,
            )
            .bind(patch.approval_status.as_str())
            .bind(patch.is_active)
            .bind(patch.is_approved)
            .bind(patch.approved_at)
            .bind(patch.rejected_at)
            .bind(&patch.rejection_reason)
            .bind(&patch.admin_notes)
            .bind(patch.reviewed_by)
            .bind(patch.updated_at)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn activate_approved_hidden(&self) -> MetadataResult<u64> {
            let result = sqlx::query(
                r#"
                UPDATE products
                SET is_active = 1, is_approved = 1
                WHERE approval_status = 'approved' AND is_active = 0
                "#,
            )
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected())
        }

        async fn deactivate_unapproved_visible(&self) -> MetadataResult<u64> {
            let result = sqlx::query(
                r#"
                UPDATE products
                SET is_active = 0, is_approved = 0
                WHERE approval_status IN ('rejected', 'under_review') AND is_active = 1
                "#,
            )
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected())
        }

        async fn list_inconsistent_products(&self, limit: u32) -> MetadataResult<Vec<ProductRow>> {
            let rows = sqlx::query_as::<_, ProductRow>(
                r#"
                SELECT * FROM products
                WHERE NOT (
                    (approval_status = 'approved' AND is_active = 1 AND is_approved = 1)
                    OR (approval_status <> 'approved' AND is_active = 0 AND is_approved = 0)
                )
                ORDER BY updated_at DESC, product_id
                LIMIT ?
                "#,
            )
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn create_repair_run(&self, run: &RepairRunRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO repair_runs (
                    run_id, trigger_kind, activated, deactivated, started_at,
                    finished_at, triggered_by, error
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(run.run_id)
            .bind(&run.trigger_kind)
            .bind(run.activated)
            .bind(run.deactivated)
            .bind(run.started_at)
            .bind(run.finished_at)
            .bind(run.triggered_by)
            .bind(&run.error)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn list_repair_runs(&self, limit: u32) -> MetadataResult<Vec<RepairRunRow>> {
            let rows = sqlx::query_as::<_, RepairRunRow>(
                "SELECT * FROM repair_runs ORDER BY started_at DESC, run_id LIMIT ?",
            )
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }
    }

    #[async_trait]
    impl TokenRepo for SqliteStore {
        async fn create_token(&self, token: &TokenRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO tokens (
                    token_id, seller_id, token_hash, scopes, expires_at,
                    revoked_at, created_at, last_used_at, description
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(token.token_id)
            .bind(token.seller_id)
            .bind(&token.token_hash)
            .bind(&token.scopes)
            .bind(token.expires_at)
            .bind(token.revoked_at)
            .bind(token.created_at)
            .bind(token.last_used_at)
            .bind(&token.description)
            .execute(&self.pool)
            .await
            .map_err(|e| MetadataError::from_insert(e, format!("token {}", token.token_id)))?;
            Ok(())
        }

        async fn get_token_by_hash(&self, token_hash: &str) -> MetadataResult<Option<TokenRow>> {
            let row = sqlx::query_as::<_, TokenRow>("SELECT * FROM tokens WHERE token_hash = ?")
                .bind(token_hash)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_token(&self, token_id: Uuid) -> MetadataResult<Option<TokenRow>> {
            let row = sqlx::query_as::<_, TokenRow>("SELECT * FROM tokens WHERE token_id = ?")
                .bind(token_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn touch_token(&self, token_id: Uuid, used_at: OffsetDateTime) -> MetadataResult<()> {
            sqlx::query("UPDATE tokens SET last_used_at = ? WHERE token_id = ?")
                .bind(used_at)
                .bind(token_id)
                .execute(&self.pool)
                .await?;
            Ok(())
        }

        async fn revoke_token(
            &self,
            token_id: Uuid,
            revoked_at: OffsetDateTime,
        ) -> MetadataResult<bool> {
            let result = sqlx::query(
                "UPDATE tokens SET revoked_at = COALESCE(revoked_at, ?) WHERE token_id = ?",
            )
            .bind(revoked_at)
            .bind(token_id)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn list_tokens(&self, seller_id: Option<Uuid>) -> MetadataResult<Vec<TokenRow>> {
            let rows = match seller_id {
                Some(id) => {
                    sqlx::query_as::<_, TokenRow>(
                        "SELECT * FROM tokens WHERE seller_id = ? ORDER BY created_at DESC",
                    )
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await?
                }
                None => {
                    sqlx::query_as::<_, TokenRow>("SELECT * FROM tokens ORDER BY created_at DESC")
                        .fetch_all(&self.pool)
                        .await?
                }
            };
            Ok(rows)
        }
    }

    #[async_trait]
    impl NotificationRepo for SqliteStore {
        async fn create_notification(&self, notification: &NotificationRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO notifications (
                    notification_id, seller_id, product_id, kind, message, created_at, read_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(notification.notification_id)
            .bind(notification.seller_id)
            .bind(notification.product_id)
            .bind(&notification.kind)
            .bind(&notification.message)
            .bind(notification.created_at)
            .bind(notification.read_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                MetadataError::from_insert(
                    e,
                    format!("notification {}", notification.notification_id),
                )
            })?;
            Ok(())
        }

        async fn list_notifications(
            &self,
            seller_id: Uuid,
            unread_only: bool,
            limit: u32,
        ) -> MetadataResult<Vec<NotificationRow>> {
            let rows = sqlx::query_as::<_, NotificationRow>(
                r#"
                SELECT * FROM notifications
                WHERE seller_id = ? AND (? = 0 OR read_at IS NULL)
                ORDER BY created_at DESC, notification_id
                LIMIT ?
                "#,
            )
            .bind(seller_id)
            .bind(unread_only)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn mark_notification_read(
            &self,
            seller_id: Uuid,
            notification_id: Uuid,
            read_at: OffsetDateTime,
        ) -> MetadataResult<bool> {
            let result = sqlx::query(
                r#"
                UPDATE notifications SET read_at = COALESCE(read_at, ?)
                WHERE notification_id = ? AND seller_id = ?
                "#,
            )
            .bind(read_at)
            .bind(notification_id)
            .bind(seller_id)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        }
    }

    #[async_trait]
    impl BootstrapRepo for SqliteStore {
        async fn get_bootstrap_token_id(&self) -> MetadataResult<Option<Uuid>> {
            let value: Option<Option<String>> =
                sqlx::query_scalar("SELECT bootstrap_token_id FROM bootstrap_state WHERE id = 1")
                    .fetch_optional(&self.pool)
                    .await?;
            value
                .flatten()
                .filter(|id| !id.is_empty())
                .map(|id| {
                    Uuid::parse_str(&id).map_err(|e| {
                        MetadataError::Internal(format!(
                            "invalid bootstrap_token_id uuid '{id}': {e}"
                        ))
                    })
                })
                .transpose()
        }

        async fn set_bootstrap_token_id(&self, token_id: Uuid) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO bootstrap_state (id, bootstrap_token_id)
                VALUES (1, ?)
                ON CONFLICT(id) DO UPDATE
                SET bootstrap_token_id = excluded.bootstrap_token_id
                "#,
            )
            .bind(token_id.to_string())
            .execute(&self.pool)
            .await?;
            Ok(())
        }
    }
}

/// SQLite schema.
const SCHEMA_SQL: &str = r#"
-- Sellers
CREATE TABLE IF NOT EXISTS sellers (
    seller_id BLOB PRIMARY KEY,
    display_name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Products. The visibility flags are derived from approval_status by the
-- application; no constraint ties them together.
CREATE TABLE IF NOT EXISTS products (
    product_id BLOB PRIMARY KEY,
    seller_id BLOB NOT NULL REFERENCES sellers(seller_id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT,
    price_cents INTEGER NOT NULL CHECK (price_cents >= 0),
    stock_quantity INTEGER NOT NULL DEFAULT 0 CHECK (stock_quantity >= 0),
    category TEXT,
    approval_status TEXT NOT NULL DEFAULT 'pending'
        CHECK (approval_status IN ('pending', 'under_review', 'approved', 'rejected')),
    is_active INTEGER NOT NULL DEFAULT 0,
    is_approved INTEGER NOT NULL DEFAULT 0,
    admin_notes TEXT,
    rejection_reason TEXT,
    approved_at TEXT,
    rejected_at TEXT,
    reviewed_by BLOB,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_products_seller ON products(seller_id);
CREATE INDEX IF NOT EXISTS idx_products_status ON products(approval_status, is_active);
CREATE INDEX IF NOT EXISTS idx_products_visible ON products(is_active, is_approved);

-- Tokens
CREATE TABLE IF NOT EXISTS tokens (
    token_id BLOB PRIMARY KEY,
    seller_id BLOB REFERENCES sellers(seller_id) ON DELETE CASCADE,
    token_hash TEXT NOT NULL UNIQUE,
    scopes TEXT NOT NULL,
    expires_at TEXT,
    revoked_at TEXT,
    created_at TEXT NOT NULL,
    last_used_at TEXT,
    description TEXT
);
CREATE INDEX IF NOT EXISTS idx_tokens_hash ON tokens(token_hash);
CREATE INDEX IF NOT EXISTS idx_tokens_seller ON tokens(seller_id);

-- Bootstrap marker
CREATE TABLE IF NOT EXISTS bootstrap_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    bootstrap_token_id TEXT
);
INSERT OR IGNORE INTO bootstrap_state (id, bootstrap_token_id) VALUES (1, NULL);

-- Seller notifications
CREATE TABLE IF NOT EXISTS notifications (
    notification_id BLOB PRIMARY KEY,
    seller_id BLOB NOT NULL REFERENCES sellers(seller_id) ON DELETE CASCADE,
    product_id BLOB REFERENCES products(product_id) ON DELETE SET NULL,
    kind TEXT NOT NULL,
    message TEXT NOT NULL,
    created_at TEXT NOT NULL,
    read_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_notifications_seller ON notifications(seller_id, created_at);

-- Repair run history
CREATE TABLE IF NOT EXISTS repair_runs (
    run_id BLOB PRIMARY KEY,
    trigger_kind TEXT NOT NULL,
    activated INTEGER NOT NULL DEFAULT 0,
    deactivated INTEGER NOT NULL DEFAULT 0,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    triggered_by BLOB,
    error TEXT
);
CREATE INDEX IF NOT EXISTS idx_repair_runs_started ON repair_runs(started_at);
"#;
