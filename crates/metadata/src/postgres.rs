//! PostgreSQL-based metadata store implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::*;
use crate::repos::{
    ApprovalCounts, ApprovalRepo, BootstrapRepo, NotificationRepo, ProductFilter, ProductRepo,
    SellerRepo, TokenRepo,
};
use crate::store::MetadataStore;
use async_trait::async_trait;
use bazaar_core::ApprovalPatch;
use bazaar_core::config::PgSslMode;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

/// PostgreSQL-based metadata store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    /// Create a new PostgreSQL store from individual connection parameters.
    ///
    /// Lets the password come from a separate secret (e.g. an env var)
    /// instead of being embedded in a URL.
    #[allow(clippy::too_many_arguments)]
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }

        if let Some(pass) = password {
            opts = opts.password(pass);
        }

        if let Some(mode) = ssl_mode {
            let sqlx_mode = match mode {
                PgSslMode::Disable => SqlxPgSslMode::Disable,
                PgSslMode::Prefer => SqlxPgSslMode::Prefer,
                PgSslMode::Require => SqlxPgSslMode::Require,
            };
            opts = opts.ssl_mode(sqlx_mode);
        }

        // Log connection info without password
        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            ssl_mode = ?ssl_mode,
            "Connecting to PostgreSQL with individual parameters"
        );

        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    async fn connect(
        mut opts: PgConnectOptions,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{}ms", timeout_ms))]);
            tracing::info!("PostgreSQL statement_timeout set to {}ms", timeout_ms);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }
}

#[async_trait]
impl MetadataStore for PostgresStore {
    async fn migrate(&self) -> MetadataResult<()> {
        // Prepared statements hold a single command, so run the schema piecewise.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl BootstrapRepo for PostgresStore {
    async fn get_bootstrap_token_id(&self) -> MetadataResult<Option<Uuid>> {
        // None: no row. Some(None): row with NULL marker.
        let value: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT bootstrap_token_id FROM bootstrap_state WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.flatten())
    }

    async fn set_bootstrap_token_id(&self, token_id: Uuid) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bootstrap_state (id, bootstrap_token_id)
            VALUES (1, $1)
            ON CONFLICT(id) DO UPDATE
            SET bootstrap_token_id = EXCLUDED.bootstrap_token_id
            "#,
        )
        .bind(token_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SellerRepo for PostgresStore {
    async fn create_seller(&self, seller: &SellerRow) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sellers (
                seller_id, display_name, email, is_active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
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
        .map_err(|e| MetadataError::from_insert(e, format!("seller email '{}'", seller.email)))?;
        Ok(())
    }

    async fn get_seller(&self, seller_id: Uuid) -> MetadataResult<Option<SellerRow>> {
        let row = sqlx::query_as::<_, SellerRow>("SELECT * FROM sellers WHERE seller_id = $1")
            .bind(seller_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_sellers(&self, limit: u32, offset: u32) -> MetadataResult<Vec<SellerRow>> {
        let rows = sqlx::query_as::<_, SellerRow>(
            "SELECT * FROM sellers ORDER BY created_at DESC, seller_id LIMIT $1 OFFSET $2",
        )
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl ProductRepo for PostgresStore {
    async fn create_product(&self, product: &ProductRow) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                product_id, seller_id, name, description, price_cents,
                stock_quantity, category, approval_status, is_active, is_approved,
                admin_notes, rejection_reason, approved_at, rejected_at,
                reviewed_by, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
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
        .map_err(|e| MetadataError::from_insert(e, format!("product {}", product.product_id)))?;
        Ok(())
    }

    async fn get_product(&self, product_id: Uuid) -> MetadataResult<Option<ProductRow>> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE product_id = $1")
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
            SET name = $1, description = $2, price_cents = $3, stock_quantity = $4,
                category = $5, updated_at = $6
            WHERE product_id = $7 AND seller_id = $8
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
        let result = sqlx::query("DELETE FROM products WHERE product_id = $1 AND seller_id = $2")
            .bind(product_id)
            .bind(seller_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_products(&self, filter: &ProductFilter) -> MetadataResult<Vec<ProductRow>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT * FROM products
            WHERE ($1::uuid IS NULL OR seller_id = $1)
              AND ($2::text IS NULL OR approval_status = $2)
              AND ($3::text IS NULL OR category = $3)
              AND (NOT $4 OR (is_active AND is_approved))
            ORDER BY created_at DESC, product_id
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.seller_id)
        .bind(filter.status.map(|s| s.as_str()))
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
            WHERE ($1::uuid IS NULL OR seller_id = $1)
            GROUP BY approval_status
            "#,
        )
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
impl ApprovalRepo for PostgresStore {
    async fn apply_approval_patch(
        &self,
        product_id: Uuid,
        patch: &ApprovalPatch,
    ) -> MetadataResult<Option<ProductRow>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            UPDATE products
            SET approval_status = $1,
                is_active = COALESCE($2, is_active),
                is_approved = COALESCE($3, is_approved),
                approved_at = COALESCE($4, approved_at),
                rejected_at = COALESCE($5, rejected_at),
                rejection_reason = COALESCE($6, rejection_reason),
                admin_notes = COALESCE($7, admin_notes),
                reviewed_by = COALESCE($8, reviewed_by),
                updated_at = $9
            WHERE product_id = $10
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
            SET is_active = TRUE, is_approved = TRUE
            WHERE approval_status = 'approved' AND is_active = FALSE
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
            SET is_active = FALSE, is_approved = FALSE
            WHERE approval_status IN ('rejected', 'under_review') AND is_active = TRUE
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
                (approval_status = 'approved' AND is_active AND is_approved)
                OR (approval_status <> 'approved' AND NOT is_active AND NOT is_approved)
            )
            ORDER BY updated_at DESC, product_id
            LIMIT $1
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
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
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
            "SELECT * FROM repair_runs ORDER BY started_at DESC, run_id LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl TokenRepo for PostgresStore {
    async fn create_token(&self, token: &TokenRow) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tokens (
                token_id, seller_id, token_hash, scopes, expires_at,
                revoked_at, created_at, last_used_at, description
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
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
        let row = sqlx::query_as::<_, TokenRow>("SELECT * FROM tokens WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_token(&self, token_id: Uuid) -> MetadataResult<Option<TokenRow>> {
        let row = sqlx::query_as::<_, TokenRow>("SELECT * FROM tokens WHERE token_id = $1")
            .bind(token_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn touch_token(&self, token_id: Uuid, used_at: OffsetDateTime) -> MetadataResult<()> {
        sqlx::query("UPDATE tokens SET last_used_at = $1 WHERE token_id = $2")
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
            "UPDATE tokens SET revoked_at = COALESCE(revoked_at, $1) WHERE token_id = $2",
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
                    "SELECT * FROM tokens WHERE seller_id = $1 ORDER BY created_at DESC",
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
impl NotificationRepo for PostgresStore {
    async fn create_notification(&self, notification: &NotificationRow) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                notification_id, seller_id, product_id, kind, message, created_at, read_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
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
            MetadataError::from_insert(e, format!("notification {}", notification.notification_id))
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
            WHERE seller_id = $1 AND (NOT $2 OR read_at IS NULL)
            ORDER BY created_at DESC, notification_id
            LIMIT $3
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
            UPDATE notifications SET read_at = COALESCE(read_at, $1)
            WHERE notification_id = $2 AND seller_id = $3
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
