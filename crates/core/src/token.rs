//! Token types and authorization.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

/// Unique identifier for a token.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(Uuid);

impl TokenId {
    /// Generate a new random token ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidToken(format!("invalid token ID: {e}")))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TokenId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TokenId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", self.0)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token scopes for authorization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenScope {
    /// Browse the storefront.
    #[serde(rename = "catalog:read")]
    CatalogRead,
    /// Manage the seller's own listings.
    #[serde(rename = "seller:write")]
    SellerWrite,
    /// Review and decide on product approvals.
    #[serde(rename = "approval:admin")]
    ApprovalAdmin,
    /// Platform operations: repairs, sellers, tokens.
    #[serde(rename = "platform:admin")]
    PlatformAdmin,
}

impl TokenScope {
    /// Parse from string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "catalog:read" => Ok(Self::CatalogRead),
            "seller:write" => Ok(Self::SellerWrite),
            "approval:admin" => Ok(Self::ApprovalAdmin),
            "platform:admin" => Ok(Self::PlatformAdmin),
            _ => Err(crate::Error::InvalidToken(format!("unknown scope: {s}"))),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CatalogRead => "catalog:read",
            Self::SellerWrite => "seller:write",
            Self::ApprovalAdmin => "approval:admin",
            Self::PlatformAdmin => "platform:admin",
        }
    }

    /// Check if this scope implies another scope.
    ///
    /// Seller listings are owned data, so admin scopes do not imply `seller:write`.
    pub fn implies(&self, other: &Self) -> bool {
        match self {
            Self::PlatformAdmin => !matches!(other, Self::SellerWrite),
            Self::ApprovalAdmin => matches!(other, Self::ApprovalAdmin | Self::CatalogRead),
            Self::SellerWrite => matches!(other, Self::SellerWrite | Self::CatalogRead),
            Self::CatalogRead => matches!(other, Self::CatalogRead),
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Console a token holder belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Seller,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Seller => "seller",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated token with its metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    /// Token identifier.
    pub id: TokenId,
    /// Seller this token acts for (if any).
    pub seller_id: Option<Uuid>,
    /// Granted scopes.
    pub scopes: HashSet<TokenScope>,
    /// When the token expires.
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    /// When the token was revoked (if revoked).
    #[serde(with = "time::serde::rfc3339::option")]
    pub revoked_at: Option<OffsetDateTime>,
    /// When the token was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Description for the token.
    pub description: Option<String>,
}

impl Token {
    /// Check if the token is valid (not expired or revoked).
    pub fn is_valid(&self) -> bool {
        let now = OffsetDateTime::now_utc();

        if self.revoked_at.is_some() {
            return false;
        }

        if let Some(expires_at) = self.expires_at
            && now > expires_at
        {
            return false;
        }

        true
    }

    /// Check if the token has a specific scope.
    pub fn has_scope(&self, scope: TokenScope) -> bool {
        self.scopes.iter().any(|s| s.implies(&scope))
    }

    /// Highest role granted by the token's scopes.
    pub fn role(&self) -> Role {
        if self.has_scope(TokenScope::PlatformAdmin) {
            Role::SuperAdmin
        } else if self.has_scope(TokenScope::ApprovalAdmin) {
            Role::Admin
        } else if self.has_scope(TokenScope::SellerWrite) && self.seller_id.is_some() {
            Role::Seller
        } else {
            Role::Customer
        }
    }
}
