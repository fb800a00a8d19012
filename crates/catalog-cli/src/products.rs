//! Read and delete handlers for catalog products.

use catalog_db::ProductRow;

/// Print a table of live products, optionally filtered by description.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_products_list(
    pool: &sqlx::PgPool,
    search: Option<&str>,
    limit: i64,
) -> anyhow::Result<()> {
    let rows = catalog_db::list_products(pool, search, limit.clamp(1, 1_000)).await?;

    if rows.is_empty() {
        println!(
            "no products found{}",
            search.map(|s| format!(" matching '{s}'")).unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "{:<8}{:<12}{:<18}{:<14}{:<8}DESCRIPTION",
        "ID", "PRICE", "CATEGORY", "BRAND", "IMAGES"
    );
    for row in &rows {
        println!(
            "{:<8}{:<12}{:<18}{:<14}{:<8}{}",
            row.id,
            row.price,
            truncate(row.category_name.as_deref().unwrap_or("\u{2014}"), 16),
            truncate(row.brand_name.as_deref().unwrap_or("\u{2014}"), 12),
            image_count(row),
            truncate(&row.description, 60),
        );
    }

    Ok(())
}

/// Print every attribute of one product.
///
/// # Errors
///
/// Returns an error if the product does not exist or the query fails.
pub(crate) async fn run_products_get(pool: &sqlx::PgPool, id: i64) -> anyhow::Result<()> {
    let row = catalog_db::get_product(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {id} not found"))?;

    println!("id:                {}", row.id);
    println!("description:       {}", row.description);
    println!(
        "detail:            {}",
        row.detailed_description.as_deref().unwrap_or("\u{2014}")
    );
    println!("price:             {}", row.price);
    println!(
        "category:          {}",
        labelled(row.category_id, row.category_name.as_deref())
    );
    println!(
        "brand:             {}",
        labelled(row.brand_id, row.brand_name.as_deref())
    );
    println!("featured:          {}", row.featured);
    println!("applies all plans: {}", row.applies_all_plans);
    for (slot, url) in image_urls(&row).iter().enumerate() {
        if let Some(url) = url {
            println!("image {}:           {url}", slot + 1);
        }
    }
    println!("updated:           {}", row.updated_at.format("%Y-%m-%d %H:%M"));

    Ok(())
}

/// Soft-delete a product.
///
/// # Errors
///
/// Returns an error if the product does not exist or the update fails.
pub(crate) async fn run_products_delete(pool: &sqlx::PgPool, id: i64) -> anyhow::Result<()> {
    if !catalog_db::soft_delete_product(pool, id).await? {
        anyhow::bail!("product {id} not found");
    }
    tracing::info!(product_id = id, "product deleted");
    println!("deleted product {id}");
    Ok(())
}

fn image_urls(row: &ProductRow) -> [Option<&str>; 5] {
    [
        row.image_url_1.as_deref(),
        row.image_url_2.as_deref(),
        row.image_url_3.as_deref(),
        row.image_url_4.as_deref(),
        row.image_url_5.as_deref(),
    ]
}

fn image_count(row: &ProductRow) -> usize {
    image_urls(row)
        .iter()
        .flatten()
        .filter(|u| !u.trim().is_empty())
        .count()
}

fn labelled(id: Option<i64>, name: Option<&str>) -> String {
    match (id, name) {
        (Some(id), Some(name)) => format!("{name} ({id})"),
        (Some(id), None) => id.to_string(),
        (None, _) => "\u{2014}".to_string(),
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() > max_chars {
        format!("{}...", value.chars().take(max_chars).collect::<String>())
    } else {
        value.to_string()
    }
}
