//! Downloadable price-update template.

use catalog_core::Product;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

/// Products copied into the template as example rows.
pub const TEMPLATE_SAMPLE_ROWS: usize = 3;

const COLUMNS: [(&str, f64); 6] = [
    ("Descripción", 40.0),
    ("Precio", 12.0),
    ("Categoría", 20.0),
    ("Marca", 20.0),
    ("Destacado", 12.0),
    ("Descripción Detallada", 60.0),
];

/// Builds the price template as XLSX bytes: a header row plus the first
/// three products of `products`.
///
/// # Errors
///
/// Returns [`XlsxError`] if the workbook cannot be written.
pub fn price_template(products: &[Product]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Precios")?;

    for (col, (title, width)) in (0u16..).zip(COLUMNS) {
        sheet.write_string_with_format(0, col, title, &header)?;
        sheet.set_column_width(col, width)?;
    }

    for (row, product) in (1u32..).zip(products.iter().take(TEMPLATE_SAMPLE_ROWS)) {
        sheet.write_string(row, 0, &product.description)?;
        sheet.write_number(row, 1, product.price.to_f64().unwrap_or_default())?;
        sheet.write_string(row, 2, product.category_name.as_deref().unwrap_or(""))?;
        sheet.write_string(row, 3, product.brand_name.as_deref().unwrap_or(""))?;
        sheet.write_string(row, 4, if product.featured { "Sí" } else { "No" })?;
        sheet.write_string(row, 5, product.detailed_description.as_deref().unwrap_or(""))?;
    }

    workbook.save_to_buffer()
}
