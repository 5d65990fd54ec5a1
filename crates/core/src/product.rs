//! Product listing input and validation.

use serde::{Deserialize, Serialize};

/// Maximum product name length in characters.
pub const MAX_NAME_LEN: usize = 200;

/// Maximum description length in characters.
pub const MAX_DESCRIPTION_LEN: usize = 5000;

/// Maximum category length in characters.
pub const MAX_CATEGORY_LEN: usize = 64;

/// Listing fields a seller controls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub category: Option<String>,
}

impl ProductDraft {
    /// Validate and normalize the draft.
    ///
    /// Names are trimmed; blank descriptions and categories become `None`.
    pub fn validated(self) -> crate::Result<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(invalid(format!(
                "name must be at most {MAX_NAME_LEN} characters"
            )));
        }

        let description = normalize_optional(self.description);
        if let Some(desc) = &description
            && desc.chars().count() > MAX_DESCRIPTION_LEN
        {
            return Err(invalid(format!(
                "description must be at most {MAX_DESCRIPTION_LEN} characters"
            )));
        }

        let category = normalize_optional(self.category);
        if let Some(cat) = &category
            && cat.chars().count() > MAX_CATEGORY_LEN
        {
            return Err(invalid(format!(
                "category must be at most {MAX_CATEGORY_LEN} characters"
            )));
        }

        if self.price_cents < 0 {
            return Err(invalid("price_cents must not be negative"));
        }
        if self.stock_quantity < 0 {
            return Err(invalid("stock_quantity must not be negative"));
        }

        Ok(Self {
            name,
            description,
            price_cents: self.price_cents,
            stock_quantity: self.stock_quantity,
            category,
        })
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn invalid(msg: impl Into<String>) -> crate::Error {
    crate::Error::InvalidProduct(msg.into())
}
