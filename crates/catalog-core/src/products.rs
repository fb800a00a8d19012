use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of image slots every product carries.
pub const IMAGE_SLOTS: usize = 5;

/// A catalog product as stored, including joined category and brand names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    /// Display name; doubles as the natural key for spreadsheet imports.
    pub description: String,
    pub detailed_description: Option<String>,
    pub price: Decimal,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub brand_id: Option<i64>,
    pub brand_name: Option<String>,
    /// Shown on the storefront landing page.
    pub featured: bool,
    /// Product is included in every subscription plan.
    pub applies_all_plans: bool,
    /// Image URLs by slot; index 0 is the primary image.
    pub images: [Option<String>; IMAGE_SLOTS],
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns `true` if any image slot holds a non-blank URL.
    #[must_use]
    pub fn has_images(&self) -> bool {
        self.images
            .iter()
            .any(|slot| slot.as_deref().is_some_and(|url| !url.trim().is_empty()))
    }

    /// Returns the URL in a 1-based image slot, if set.
    #[must_use]
    pub fn image(&self, slot: usize) -> Option<&str> {
        slot.checked_sub(1)
            .and_then(|idx| self.images.get(idx))
            .and_then(Option::as_deref)
    }

    /// Case-insensitive, whitespace-trimmed comparison against the display name.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.description.trim().to_lowercase() == name.trim().to_lowercase()
    }
}

/// Sparse update for a product.
///
/// `None` keeps the stored value. Nullable columns use `Option<Option<T>>`:
/// `Some(None)` clears the column, `Some(Some(v))` sets it.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductChanges {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub detailed_description: Option<Option<String>>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub category_id: Option<Option<i64>>,
    #[serde(default)]
    pub brand_id: Option<Option<i64>>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub applies_all_plans: Option<bool>,
    #[serde(default)]
    pub images: [Option<Option<String>>; IMAGE_SLOTS],
}

impl ProductChanges {
    /// Returns `true` when applying these changes would not touch any column.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.detailed_description.is_none()
            && self.price.is_none()
            && self.category_id.is_none()
            && self.brand_id.is_none()
            && self.featured.is_none()
            && self.applies_all_plans.is_none()
            && self.images.iter().all(Option::is_none)
    }

    /// Sets a 1-based image slot. Out-of-range slots are ignored.
    pub fn set_image(&mut self, slot: usize, url: impl Into<String>) {
        if let Some(entry) = slot.checked_sub(1).and_then(|idx| self.images.get_mut(idx)) {
            *entry = Some(Some(url.into()));
        }
    }

    /// Returns `true` if every supplied field already equals the product's value.
    #[must_use]
    pub fn is_noop_for(&self, product: &Product) -> bool {
        let same = |change: Option<&Option<String>>, current: &Option<String>| {
            change.is_none_or(|v| v == current)
        };

        self.description
            .as_ref()
            .is_none_or(|d| *d == product.description)
            && same(
                self.detailed_description.as_ref(),
                &product.detailed_description,
            )
            && self.price.is_none_or(|p| p == product.price)
            && self.category_id.is_none_or(|c| c == product.category_id)
            && self.brand_id.is_none_or(|b| b == product.brand_id)
            && self.featured.is_none_or(|f| f == product.featured)
            && self
                .applies_all_plans
                .is_none_or(|a| a == product.applies_all_plans)
            && self
                .images
                .iter()
                .zip(&product.images)
                .all(|(change, current)| same(change.as_ref(), current))
    }
}

/// Insert payload for a new product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub description: String,
    #[serde(default)]
    pub detailed_description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub brand_id: Option<i64>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub applies_all_plans: bool,
    #[serde(default)]
    pub images: [Option<String>; IMAGE_SLOTS],
}
