//! Platform admin token provisioning at startup.

use anyhow::{Context, Result, bail};
use bazaar_core::config::AdminConfig;
use bazaar_core::token::TokenScope;
use bazaar_metadata::MetadataStore;
use bazaar_metadata::models::TokenRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Scopes granted to the platform admin token when the config lists none.
pub const DEFAULT_ADMIN_SCOPES: &[&str] = &["platform:admin"];

/// Make the configured admin hash usable as a platform token.
///
/// A hash already on file is adopted as-is. A new hash revokes the token
/// previously provisioned here, then is stored with the configured scopes.
/// Configuration is checked before anything is written.
pub async fn ensure_admin_token(metadata: &dyn MetadataStore, config: &AdminConfig) -> Result<()> {
    let hash = admin_hash(&config.token_hash)?;
    let scopes = admin_scopes(config)?;
    let now = OffsetDateTime::now_utc();

    if let Some(existing) = metadata.get_token_by_hash(&hash).await? {
        refuse_unusable(&existing, now)?;
        metadata.set_bootstrap_token_id(existing.token_id).await?;
        tracing::debug!(token_id = %existing.token_id, "Platform admin token on file");
        return Ok(());
    }

    if let Some(previous) = metadata.get_bootstrap_token_id().await? {
        metadata.revoke_token(previous, now).await?;
        tracing::info!(token_id = %previous, "Replaced platform admin token revoked");
    }

    let token = TokenRow {
        token_id: Uuid::new_v4(),
        seller_id: None,
        token_hash: hash,
        scopes: serde_json::to_string(&scopes)?,
        expires_at: None,
        revoked_at: None,
        created_at: now,
        last_used_at: None,
        description: config.token_description.clone(),
    };
    metadata
        .create_token(&token)
        .await
        .context("storing platform admin token")?;
    metadata.set_bootstrap_token_id(token.token_id).await?;
    tracing::info!(token_id = %token.token_id, ?scopes, "Platform admin token provisioned");

    Ok(())
}

/// Lowercase hex digest, with an optional `sha256:` prefix removed.
fn admin_hash(configured: &str) -> Result<String> {
    let digest = configured
        .strip_prefix("sha256:")
        .unwrap_or(configured)
        .to_ascii_lowercase();
    if digest.len() != 64 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
        bail!("admin.token_hash must be a 64-character SHA-256 hex digest");
    }
    Ok(digest)
}

/// Configured scopes, or the platform default. Seller scopes are refused.
fn admin_scopes(config: &AdminConfig) -> Result<Vec<String>> {
    let scopes = match &config.token_scopes {
        Some(scopes) => scopes.clone(),
        None => DEFAULT_ADMIN_SCOPES.iter().map(|s| s.to_string()).collect(),
    };
    for scope in &scopes {
        match TokenScope::parse(scope) {
            Ok(TokenScope::SellerWrite) => {
                bail!("admin.token_scopes cannot include seller:write")
            }
            Ok(_) => {}
            Err(_) => bail!("admin.token_scopes has unknown scope {scope:?}"),
        }
    }
    Ok(scopes)
}

/// A stored token with the admin hash is only adopted while it is live and unbound.
fn refuse_unusable(existing: &TokenRow, now: OffsetDateTime) -> Result<()> {
    let id = existing.token_id;
    if existing.revoked_at.is_some() {
        bail!("admin.token_hash belongs to revoked token {id}; configure a fresh secret");
    }
    if existing.expires_at.is_some_and(|at| at <= now) {
        bail!("admin.token_hash belongs to expired token {id}; configure a fresh secret");
    }
    if existing.seller_id.is_some() {
        bail!("admin.token_hash belongs to seller token {id}");
    }
    Ok(())
}
