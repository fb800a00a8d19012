//! Point-in-time view of the catalog used to reconcile one run.

use std::collections::{BTreeSet, HashMap};

use catalog_core::Product;

/// Products plus the category and brand ids they may reference.
///
/// Loaded once before a run starts and never refreshed while it applies.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    products: Vec<Product>,
    by_id: HashMap<i64, usize>,
    category_ids: BTreeSet<i64>,
    brand_ids: BTreeSet<i64>,
}

impl CatalogSnapshot {
    pub fn new(
        products: Vec<Product>,
        category_ids: impl IntoIterator<Item = i64>,
        brand_ids: impl IntoIterator<Item = i64>,
    ) -> Self {
        let by_id = products
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.id, idx))
            .collect();
        Self {
            products,
            by_id,
            category_ids: category_ids.into_iter().collect(),
            brand_ids: brand_ids.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    #[must_use]
    pub fn by_id(&self, id: i64) -> Option<&Product> {
        self.by_id.get(&id).map(|idx| &self.products[*idx])
    }

    /// Every product whose description equals `name`, ignoring case and
    /// surrounding whitespace.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Vec<&Product> {
        self.products.iter().filter(|p| p.matches_name(name)).collect()
    }

    #[must_use]
    pub fn has_category(&self, id: i64) -> bool {
        self.category_ids.contains(&id)
    }

    #[must_use]
    pub fn has_brand(&self, id: i64) -> bool {
        self.brand_ids.contains(&id)
    }
}
