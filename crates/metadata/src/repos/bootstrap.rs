//! Which token was provisioned from `[admin] token_hash`.

use crate::error::MetadataResult;
use async_trait::async_trait;
use uuid::Uuid;

/// Single-row record of the config-provisioned platform admin token.
///
/// Startup uses it to find the token to revoke when the configured hash changes.
#[async_trait]
pub trait BootstrapRepo: Send + Sync {
    /// Token currently provisioned from config, if any.
    async fn get_bootstrap_token_id(&self) -> MetadataResult<Option<Uuid>>;

    /// Point the record at `token_id`, replacing any previous value.
    async fn set_bootstrap_token_id(&self, token_id: Uuid) -> MetadataResult<()>;
}
