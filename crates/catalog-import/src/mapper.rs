//! Maps raw rows (or uploaded image files) to typed, validated rows.

use catalog_core::{NewProduct, ProductChanges, IMAGE_SLOTS};
use rust_decimal::Decimal;

use crate::coerce::{parse_bool, parse_leading_int, parse_price, round_up_100, CellValue};
use crate::images::{ImageFileName, UploadedFile};
use crate::pipeline::PipelineKind;
use crate::reader::RawRow;
use crate::snapshot::CatalogSnapshot;

/// An image waiting to be uploaded into one product slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file: ImageFileName,
    pub bytes: Vec<u8>,
}

/// A row after coercion and validation.
///
/// A row with a non-empty `errors` list is never applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRow {
    pub row_number: usize,
    pub id: Option<i64>,
    pub natural_key: Option<String>,
    pub changes: ProductChanges,
    /// Insert payload for the full product import when no product matches.
    pub create: Option<NewProduct>,
    /// Image file payload for the filename-coded image import.
    pub image: Option<ImageUpload>,
    pub errors: Vec<String>,
}

impl ValidatedRow {
    fn new(row_number: usize, id: Option<i64>, natural_key: Option<String>) -> Self {
        Self {
            row_number,
            id,
            natural_key,
            changes: ProductChanges::default(),
            create: None,
            image: None,
            errors: Vec::new(),
        }
    }

    /// Short human label: `id 42` or `'Widget A'`.
    #[must_use]
    pub fn label(&self) -> String {
        match (self.id, &self.natural_key) {
            (Some(id), _) => format!("id {id}"),
            (None, Some(name)) => format!("'{name}'"),
            (None, None) => "row without key".to_string(),
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Maps one spreadsheet row for `kind`.
///
/// Returns `None` for rows with neither an id nor a natural key; those are
/// dropped without an error. Image files go through [`map_file`] instead.
#[must_use]
pub fn map_row(kind: PipelineKind, row: &RawRow, snapshot: &CatalogSnapshot) -> Option<ValidatedRow> {
    match kind {
        PipelineKind::Description => map_description(row),
        PipelineKind::Prices => map_prices(row),
        PipelineKind::ImageUrls => map_image_urls(row),
        PipelineKind::Products => map_product(row, snapshot),
        PipelineKind::ImageFiles => None,
    }
}

/// Maps one uploaded image file. `position` is its 0-based upload index.
#[must_use]
pub fn map_file(position: usize, file: UploadedFile) -> ValidatedRow {
    let row_number = position + 1;
    match ImageFileName::parse(&file.name) {
        Ok(parsed) => {
            let mut row = ValidatedRow::new(row_number, None, Some(parsed.code.clone()));
            if file.bytes.is_empty() {
                row.errors.push(format!("file '{}' is empty", file.name));
            }
            row.image = Some(ImageUpload {
                file: parsed,
                bytes: file.bytes,
            });
            row
        }
        Err(message) => {
            let mut row = ValidatedRow::new(row_number, None, None);
            row.errors.push(message);
            row
        }
    }
}

fn rounded_price(cell: &CellValue) -> Result<Decimal, String> {
    round_up_100(parse_price(cell)?)
        .ok_or_else(|| format!("invalid price '{}'", cell.as_text()))
}

fn id_and_name(row: &RawRow) -> (Option<i64>, Option<String>) {
    (
        parse_leading_int(row.cell("id")),
        row.cell("descripcion").non_empty_text(),
    )
}

fn map_description(row: &RawRow) -> Option<ValidatedRow> {
    let (id, name) = id_and_name(row);
    if id.is_none() && name.is_none() {
        return None;
    }

    let mut out = ValidatedRow::new(row.row_number, id, name);
    out.changes.detailed_description = row
        .cell("descripcion_detallada")
        .non_empty_text()
        .map(Some);
    Some(out)
}

fn map_prices(row: &RawRow) -> Option<ValidatedRow> {
    let name = row.cell("descripcion").non_empty_text()?;
    let mut out = ValidatedRow::new(row.row_number, None, Some(name));

    match rounded_price(row.cell("precio")) {
        Ok(price) => out.changes.price = Some(price),
        Err(e) => out.errors.push(e),
    }
    if let Some(cell) = row.get("destacado") {
        out.changes.featured = Some(parse_bool(cell));
    }
    if let Some(detailed) = row.cell("descripcion_detallada").non_empty_text() {
        out.changes.detailed_description = Some(Some(detailed));
    }
    Some(out)
}

fn map_image_urls(row: &RawRow) -> Option<ValidatedRow> {
    let (id, name) = id_and_name(row);
    if id.is_none() && name.is_none() {
        return None;
    }

    let mut out = ValidatedRow::new(row.row_number, id, name);
    for slot in 1..=IMAGE_SLOTS {
        let column = if slot == 1 {
            "imagen".to_string()
        } else {
            format!("imagen_{slot}")
        };
        if let Some(url) = row.cell(&column).non_empty_text() {
            out.changes.set_image(slot, url);
        }
    }
    Some(out)
}

fn map_product(row: &RawRow, snapshot: &CatalogSnapshot) -> Option<ValidatedRow> {
    let (id, name) = id_and_name(row);
    if id.is_none() && name.is_none() {
        return None;
    }

    let mut out = ValidatedRow::new(row.row_number, id, name.clone());
    if name.is_none() {
        out.errors.push("descripcion is required".to_string());
    }
    out.changes.description.clone_from(&name);

    let price = match rounded_price(row.cell("precio")) {
        Ok(p) => Some(p),
        Err(e) => {
            out.errors.push(e);
            None
        }
    };
    out.changes.price = price;

    let applies_all_plans = row.get("aplica_todos_plan").map(parse_bool);
    out.changes.applies_all_plans = applies_all_plans;

    let category_id = reference_id(row, "fk_id_categoria", "category", |id| {
        snapshot.has_category(id)
    });
    let brand_id = reference_id(row, "fk_id_marca", "brand", |id| snapshot.has_brand(id));
    let category_id = category_id.unwrap_or_else(|e| {
        out.errors.push(e);
        None
    });
    let brand_id = brand_id.unwrap_or_else(|e| {
        out.errors.push(e);
        None
    });
    out.changes.category_id = category_id.map(Some);
    out.changes.brand_id = brand_id.map(Some);

    if let (None, Some(description), Some(price), true) = (id, name, price, out.is_valid()) {
        out.create = Some(NewProduct {
            description,
            detailed_description: None,
            price,
            category_id,
            brand_id,
            featured: false,
            applies_all_plans: applies_all_plans.unwrap_or(false),
            images: Default::default(),
        });
    }
    Some(out)
}

/// Reads an optional foreign-key column. Empty cells mean "no value".
fn reference_id(
    row: &RawRow,
    column: &str,
    entity: &str,
    exists: impl Fn(i64) -> bool,
) -> Result<Option<i64>, String> {
    let cell = row.cell(column);
    if cell.is_empty() {
        return Ok(None);
    }
    let id = parse_leading_int(cell)
        .ok_or_else(|| format!("invalid {column} '{}'", cell.as_text()))?;
    if exists(id) {
        Ok(Some(id))
    } else {
        Err(format!("{entity} {id} does not exist"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[(&str, &str)]) -> RawRow {
        RawRow::new(
            2,
            fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), CellValue::text(v)))
                .collect(),
        )
    }

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot::new(Vec::new(), [1, 2], [10])
    }

    #[test]
    fn keyless_rows_are_dropped() {
        let r = row(&[("id", ""), ("descripcion", ""), ("descripcion_detallada", "x")]);
        assert!(map_row(PipelineKind::Description, &r, &snapshot()).is_none());

        let r = row(&[("descripcion", " "), ("precio", "100")]);
        assert!(map_row(PipelineKind::Prices, &r, &snapshot()).is_none());
    }

    #[test]
    fn description_row_prefers_id_and_keeps_text() {
        let r = row(&[("id", "42"), ("descripcion_detallada", "Nuevo texto")]);
        let mapped = map_row(PipelineKind::Description, &r, &snapshot()).unwrap();
        assert_eq!(mapped.id, Some(42));
        assert_eq!(
            mapped.changes.detailed_description,
            Some(Some("Nuevo texto".to_string()))
        );
        assert!(mapped.is_valid());
    }

    #[test]
    fn description_non_numeric_id_falls_to_name() {
        let r = row(&[("id", "abc"), ("descripcion", "Widget A")]);
        let mapped = map_row(PipelineKind::Description, &r, &snapshot()).unwrap();
        assert_eq!(mapped.id, None);
        assert_eq!(mapped.natural_key.as_deref(), Some("Widget A"));
        assert!(mapped.changes.is_empty());
    }

    #[test]
    fn prices_row_rounds_price_up() {
        let r = row(&[("descripcion", "Widget A"), ("precio", "1,234.50")]);
        let mapped = map_row(PipelineKind::Prices, &r, &snapshot()).unwrap();
        assert_eq!(mapped.changes.price, Some(Decimal::new(1300, 0)));
        assert_eq!(mapped.changes.featured, None);
    }

    #[test]
    fn prices_featured_applies_only_when_column_present() {
        let r = row(&[("descripcion", "Widget A"), ("precio", "1500"), ("destacado", "")]);
        let mapped = map_row(PipelineKind::Prices, &r, &snapshot()).unwrap();
        assert_eq!(mapped.changes.featured, Some(false));

        let r = row(&[("descripcion", "Widget A"), ("precio", "1500"), ("destacado", "Sí")]);
        let mapped = map_row(PipelineKind::Prices, &r, &snapshot()).unwrap();
        assert_eq!(mapped.changes.featured, Some(true));
    }

    #[test]
    fn prices_bad_price_is_a_row_error() {
        let r = row(&[("descripcion", "Widget A"), ("precio", "gratis")]);
        let mapped = map_row(PipelineKind::Prices, &r, &snapshot()).unwrap();
        assert_eq!(mapped.errors, vec!["invalid price 'gratis'".to_string()]);
    }

    #[test]
    fn prices_price_too_large_to_round_is_a_row_error() {
        let r = row(&[
            ("descripcion", "Widget A"),
            ("precio", "79228162514264337593543950335"),
        ]);
        let mapped = map_row(PipelineKind::Prices, &r, &snapshot()).unwrap();
        assert_eq!(mapped.changes.price, None);
        assert_eq!(
            mapped.errors,
            vec!["invalid price '79228162514264337593543950335'".to_string()]
        );
    }

    #[test]
    fn image_urls_map_to_slots() {
        let r = row(&[
            ("id", "7"),
            ("descripcion", "Widget"),
            ("imagen", "https://cdn.example.com/1.jpg"),
            ("imagen_3", "https://cdn.example.com/3.jpg"),
            ("imagen_2", ""),
        ]);
        let mapped = map_row(PipelineKind::ImageUrls, &r, &snapshot()).unwrap();
        assert_eq!(
            mapped.changes.images[0],
            Some(Some("https://cdn.example.com/1.jpg".to_string()))
        );
        assert_eq!(mapped.changes.images[1], None);
        assert_eq!(
            mapped.changes.images[2],
            Some(Some("https://cdn.example.com/3.jpg".to_string()))
        );
    }

    #[test]
    fn product_without_id_builds_insert_payload() {
        let r = row(&[
            ("descripcion", "Taladro"),
            ("precio", "9950"),
            ("aplica_todos_plan", "si"),
            ("fk_id_categoria", "2"),
            ("fk_id_marca", "10"),
        ]);
        let mapped = map_row(PipelineKind::Products, &r, &snapshot()).unwrap();
        let create = mapped.create.expect("insert payload");
        assert_eq!(create.description, "Taladro");
        assert_eq!(create.price, Decimal::new(10_000, 0));
        assert!(create.applies_all_plans);
        assert_eq!(create.category_id, Some(2));
        assert_eq!(create.brand_id, Some(10));
    }

    #[test]
    fn product_with_id_has_no_insert_payload() {
        let r = row(&[("id", "5"), ("descripcion", "Taladro"), ("precio", "100")]);
        let mapped = map_row(PipelineKind::Products, &r, &snapshot()).unwrap();
        assert!(mapped.create.is_none());
        assert_eq!(mapped.changes.description.as_deref(), Some("Taladro"));
    }

    #[test]
    fn product_unknown_references_are_errors() {
        let r = row(&[
            ("descripcion", "Taladro"),
            ("precio", "100"),
            ("fk_id_categoria", "99"),
            ("fk_id_marca", "marca"),
        ]);
        let mapped = map_row(PipelineKind::Products, &r, &snapshot()).unwrap();
        assert_eq!(
            mapped.errors,
            vec![
                "category 99 does not exist".to_string(),
                "invalid fk_id_marca 'marca'".to_string()
            ]
        );
        assert!(mapped.create.is_none());
    }

    #[test]
    fn product_with_id_but_no_name_is_invalid() {
        let r = row(&[("id", "5"), ("descripcion", ""), ("precio", "100")]);
        let mapped = map_row(PipelineKind::Products, &r, &snapshot()).unwrap();
        assert_eq!(mapped.errors, vec!["descripcion is required".to_string()]);
    }

    #[test]
    fn file_mapping_numbers_rows_from_one() {
        let mapped = map_file(
            0,
            UploadedFile {
                name: "A1_1.jpg".to_string(),
                bytes: vec![1, 2, 3],
            },
        );
        assert_eq!(mapped.row_number, 1);
        assert_eq!(mapped.natural_key.as_deref(), Some("A1"));
        assert!(mapped.is_valid());
    }

    #[test]
    fn bad_file_name_is_invalid_without_key() {
        let mapped = map_file(
            3,
            UploadedFile {
                name: "A1_6.jpg".to_string(),
                bytes: vec![1],
            },
        );
        assert_eq!(mapped.row_number, 4);
        assert!(mapped.natural_key.is_none());
        assert!(mapped.errors[0].starts_with("invalid file name"));
    }

    #[test]
    fn empty_file_is_invalid() {
        let mapped = map_file(
            0,
            UploadedFile {
                name: "A1_1.png".to_string(),
                bytes: Vec::new(),
            },
        );
        assert_eq!(mapped.errors, vec!["file 'A1_1.png' is empty".to_string()]);
    }
}
