//! Matches validated rows to products in the snapshot.

use catalog_core::Product;

use crate::images::SlotTracker;
use crate::mapper::ValidatedRow;
use crate::pipeline::PipelineKind;
use crate::report::ImportOutcome;
use crate::snapshot::CatalogSnapshot;

/// Where an applicable row writes to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target<'a> {
    Existing(&'a Product),
    /// Full product import only: no product carries this name yet.
    Create,
}

/// Classification of a row after reconciliation. Everything except
/// `Applicable` is terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum RowStatus<'a> {
    Applicable(Target<'a>),
    /// The row would not change anything.
    Unchanged(&'a Product),
    NotFound(String),
    Invalid(Vec<String>),
    DuplicateTargetSlot(String),
    AlreadyHasImages(&'a Product),
}

impl RowStatus<'_> {
    #[must_use]
    pub fn is_applicable(&self) -> bool {
        matches!(self, Self::Applicable(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledRow<'a> {
    pub row: ValidatedRow,
    pub status: RowStatus<'a>,
}

impl ReconciledRow<'_> {
    /// Outcome for a row that will not be applied; `None` when applicable.
    #[must_use]
    pub fn rejection(&self) -> Option<ImportOutcome> {
        let n = self.row.row_number;
        let outcome = match &self.status {
            RowStatus::Applicable(_) => return None,
            RowStatus::Unchanged(product) => ImportOutcome::skipped(
                n,
                format!("'{}' (id {}) unchanged", product.description, product.id),
            ),
            RowStatus::NotFound(message) | RowStatus::DuplicateTargetSlot(message) => {
                ImportOutcome::error(n, message.clone())
            }
            RowStatus::Invalid(errors) => ImportOutcome::error(n, errors.join("; ")),
            RowStatus::AlreadyHasImages(product) => ImportOutcome::error(
                n,
                format!(
                    "'{}' (id {}) already has images",
                    product.description, product.id
                ),
            ),
        };
        Some(outcome)
    }
}

/// Reconciles the rows of one run against a fixed snapshot.
///
/// Stateful only for image files, where it remembers which slots earlier
/// files already claimed.
#[derive(Debug)]
pub struct Reconciler<'a> {
    kind: PipelineKind,
    snapshot: &'a CatalogSnapshot,
    slots: SlotTracker,
}

impl<'a> Reconciler<'a> {
    #[must_use]
    pub fn new(kind: PipelineKind, snapshot: &'a CatalogSnapshot) -> Self {
        Self {
            kind,
            snapshot,
            slots: SlotTracker::new(),
        }
    }

    /// Classifies one row. Never fails; the status carries the verdict.
    pub fn reconcile(&mut self, row: ValidatedRow) -> ReconciledRow<'a> {
        let status = self.classify(&row);
        ReconciledRow { row, status }
    }

    fn classify(&mut self, row: &ValidatedRow) -> RowStatus<'a> {
        if !row.is_valid() {
            return RowStatus::Invalid(row.errors.clone());
        }

        if let Some(upload) = &row.image {
            if let Err(message) = self.slots.claim(&upload.file.code, upload.file.slot) {
                return RowStatus::DuplicateTargetSlot(message);
            }
        }

        let product = match (row.id, row.natural_key.as_deref()) {
            (Some(id), _) => match self.snapshot.by_id(id) {
                Some(product) => product,
                None => return RowStatus::NotFound(format!("product id {id} not found")),
            },
            (None, Some(name)) => {
                let matches = self.snapshot.by_name(name);
                match matches.as_slice() {
                    [product] => *product,
                    [] if self.kind == PipelineKind::Products && row.create.is_some() => {
                        return RowStatus::Applicable(Target::Create);
                    }
                    [] => return RowStatus::NotFound(format!("no product named '{name}'")),
                    many => {
                        return RowStatus::NotFound(format!(
                            "'{name}' matches {} products",
                            many.len()
                        ));
                    }
                }
            }
            (None, None) => {
                return RowStatus::NotFound("row has no id or descripcion".to_string());
            }
        };

        if self.kind == PipelineKind::ImageFiles {
            return if product.has_images() {
                RowStatus::AlreadyHasImages(product)
            } else {
                RowStatus::Applicable(Target::Existing(product))
            };
        }

        if row.changes.is_noop_for(product) {
            RowStatus::Unchanged(product)
        } else {
            RowStatus::Applicable(Target::Existing(product))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::UploadedFile;
    use crate::mapper::map_file;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn product(id: i64, description: &str, price: i64) -> Product {
        Product {
            id,
            description: description.to_string(),
            detailed_description: None,
            price: Decimal::new(price, 0),
            category_id: None,
            category_name: None,
            brand_id: None,
            brand_name: None,
            featured: false,
            applies_all_plans: false,
            images: Default::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn snapshot() -> CatalogSnapshot {
        let mut with_image = product(3, "C3", 100);
        with_image.images[1] = Some("https://cdn.example.com/c3.jpg".to_string());
        CatalogSnapshot::new(
            vec![
                product(1, "Widget A", 1500),
                product(2, "Twin", 100),
                product(4, "twin ", 100),
                with_image,
                product(5, "A1", 100),
            ],
            [],
            [],
        )
    }

    fn row(id: Option<i64>, name: Option<&str>) -> ValidatedRow {
        ValidatedRow {
            row_number: 2,
            id,
            natural_key: name.map(str::to_string),
            changes: catalog_core::ProductChanges {
                price: Some(Decimal::new(1300, 0)),
                ..Default::default()
            },
            create: None,
            image: None,
            errors: Vec::new(),
        }
    }

    fn file(name: &str) -> ValidatedRow {
        map_file(
            0,
            UploadedFile {
                name: name.to_string(),
                bytes: vec![0xFF],
            },
        )
    }

    #[test]
    fn explicit_id_never_falls_back_to_name() {
        let snap = snapshot();
        let mut r = Reconciler::new(PipelineKind::Description, &snap);
        let out = r.reconcile(row(Some(999), Some("Widget A")));
        assert_eq!(
            out.status,
            RowStatus::NotFound("product id 999 not found".to_string())
        );
    }

    #[test]
    fn name_match_is_trimmed_and_case_insensitive() {
        let snap = snapshot();
        let mut r = Reconciler::new(PipelineKind::Prices, &snap);
        let out = r.reconcile(row(None, Some("  WIDGET a ")));
        assert!(matches!(out.status, RowStatus::Applicable(Target::Existing(p)) if p.id == 1));
    }

    #[test]
    fn ambiguous_name_is_not_found() {
        let snap = snapshot();
        let mut r = Reconciler::new(PipelineKind::Prices, &snap);
        let out = r.reconcile(row(None, Some("twin")));
        assert_eq!(
            out.status,
            RowStatus::NotFound("'twin' matches 2 products".to_string())
        );
    }

    #[test]
    fn unknown_name_creates_only_for_product_import() {
        let snap = snapshot();
        let mut unknown = row(None, Some("Nuevo"));
        unknown.create = Some(catalog_core::NewProduct {
            description: "Nuevo".to_string(),
            detailed_description: None,
            price: Decimal::new(100, 0),
            category_id: None,
            brand_id: None,
            featured: false,
            applies_all_plans: false,
            images: Default::default(),
        });

        let mut r = Reconciler::new(PipelineKind::Products, &snap);
        assert_eq!(
            r.reconcile(unknown.clone()).status,
            RowStatus::Applicable(Target::Create)
        );

        let mut r = Reconciler::new(PipelineKind::Prices, &snap);
        assert!(matches!(r.reconcile(unknown).status, RowStatus::NotFound(_)));
    }

    #[test]
    fn same_price_is_unchanged() {
        let snap = snapshot();
        let mut r = Reconciler::new(PipelineKind::Prices, &snap);
        let mut same = row(None, Some("Widget A"));
        same.changes.price = Some(Decimal::new(1500, 0));
        assert!(matches!(r.reconcile(same).status, RowStatus::Unchanged(p) if p.id == 1));
    }

    #[test]
    fn invalid_rows_stay_invalid() {
        let snap = snapshot();
        let mut r = Reconciler::new(PipelineKind::Prices, &snap);
        let mut bad = row(None, Some("Widget A"));
        bad.errors.push("invalid price 'x'".to_string());
        let out = r.reconcile(bad);
        assert_eq!(
            out.status,
            RowStatus::Invalid(vec!["invalid price 'x'".to_string()])
        );
        assert_eq!(
            out.rejection().map(|o| o.detail_line()),
            Some("row 2: invalid price 'x'".to_string())
        );
    }

    #[test]
    fn image_file_for_product_with_images_is_rejected() {
        let snap = snapshot();
        let mut r = Reconciler::new(PipelineKind::ImageFiles, &snap);
        let out = r.reconcile(file("C3_1.jpg"));
        assert!(matches!(out.status, RowStatus::AlreadyHasImages(p) if p.id == 3));
    }

    #[test]
    fn duplicate_slot_rejects_second_file_only() {
        let snap = snapshot();
        let mut r = Reconciler::new(PipelineKind::ImageFiles, &snap);
        let first = r.reconcile(file("A1_3.jpg"));
        let second = r.reconcile(file("A1_3.jpg"));
        assert!(first.status.is_applicable());
        assert!(matches!(second.status, RowStatus::DuplicateTargetSlot(_)));
    }

    #[test]
    fn slot_is_claimed_before_lookup() {
        let snap = snapshot();
        let mut r = Reconciler::new(PipelineKind::ImageFiles, &snap);
        assert!(matches!(
            r.reconcile(file("ZZ_1.jpg")).status,
            RowStatus::NotFound(_)
        ));
        assert!(matches!(
            r.reconcile(file("ZZ_1.png")).status,
            RowStatus::DuplicateTargetSlot(_)
        ));
    }
}
