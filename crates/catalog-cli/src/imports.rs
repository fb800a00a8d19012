//! Import and template command handlers.
//!
//! Each run loads the catalog snapshot once, reconciles the whole input
//! against it, then applies the applicable rows in paced batches.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use catalog_core::AppConfig;
use catalog_import::{CatalogSnapshot, Importer, PipelineKind, Progress, UploadedFile};

/// Load the point-in-time view an import run reconciles against.
///
/// # Errors
///
/// Returns an error if any of the snapshot queries fail.
pub(crate) async fn load_snapshot(pool: &sqlx::PgPool) -> anyhow::Result<CatalogSnapshot> {
    let products = catalog_db::load_snapshot(pool).await?;
    let category_ids = catalog_db::list_category_ids(pool).await?;
    let brand_ids = catalog_db::list_brand_ids(pool).await?;
    Ok(CatalogSnapshot::new(products, category_ids, brand_ids))
}

/// Run one import and print its report.
///
/// # Errors
///
/// Returns an error if the input cannot be read, the file is rejected before
/// any row is touched, or an image-files run that is not a dry run has no
/// object storage configured.
/// Row-level failures are part of the printed report, not errors.
pub(crate) async fn run_import(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    kind: PipelineKind,
    path: &Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    let snapshot = load_snapshot(pool).await?;
    let importer = Importer::new(&snapshot, config.import).dry_run(dry_run);
    let writer = catalog_db::PgCatalog::new(pool.clone());

    let report = if kind.takes_files() {
        let files = read_image_dir(path)?;
        if files.is_empty() {
            anyhow::bail!("no files found in {}", path.display());
        }
        if dry_run {
            importer.preview_files(files, print_progress).await
        } else {
            let uploader = catalog_storage::StorageClient::new(&config.storage)
                .context("image-files import needs object storage")?;
            importer
                .run_files(files, &writer, &uploader, print_progress)
                .await
        }
    } else {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        importer
            .run_sheet(kind, file_name, bytes, &writer, print_progress)
            .await?
    };
    eprintln!();

    print!("{report}");
    if report.omitted_details > 0 {
        println!("({} detail lines omitted)", report.omitted_details);
    }
    Ok(())
}

/// Write the price-update template to `out`.
///
/// # Errors
///
/// Returns an error if the snapshot query, workbook build, or file write fails.
pub(crate) async fn run_template(pool: &sqlx::PgPool, out: &Path) -> anyhow::Result<()> {
    let products = catalog_db::load_snapshot(pool).await?;
    let bytes = catalog_import::price_template(&products)?;
    tokio::fs::write(out, bytes)
        .await
        .with_context(|| format!("failed to write {}", out.display()))?;
    println!("wrote price template to {}", out.display());
    Ok(())
}

/// Read every regular file directly under `dir`, sorted by name so upload
/// order (and therefore row numbering) is stable across runs.
///
/// # Errors
///
/// Returns an error if `dir` or any file in it cannot be read.
pub(crate) fn read_image_dir(dir: &Path) -> anyhow::Result<Vec<UploadedFile>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(UploadedFile { name, bytes })
        })
        .collect()
}

fn print_progress(progress: Progress) {
    let mut stderr = std::io::stderr();
    let _ = write!(
        stderr,
        "\rprogress: {:>3}% ({}/{})",
        progress.percent(),
        progress.processed,
        progress.total
    );
    let _ = stderr.flush();
}
