//! End-to-end import runs: read, map, reconcile, apply, report.

use catalog_core::{CatalogWriter, ImageUploader, ImportSettings, ProductChanges};

use crate::apply::{run_batches, BatchOptions, BatchRunState, Progress};
use crate::error::ImportError;
use crate::images::UploadedFile;
use crate::mapper::{map_file, map_row};
use crate::pipeline::PipelineKind;
use crate::reader;
use crate::reconcile::{ReconciledRow, Reconciler, RowStatus, Target};
use crate::report::{ImportOutcome, ImportReport};
use crate::snapshot::CatalogSnapshot;

/// Every source row of one run, reconciled but not yet applied.
#[derive(Debug)]
pub struct ImportPlan<'a> {
    pub kind: PipelineKind,
    pub rows: Vec<ReconciledRow<'a>>,
    /// Rows dropped for having neither an id nor a name.
    pub keyless: usize,
}

impl ImportPlan<'_> {
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.rows.len() + self.keyless
    }

    #[must_use]
    pub fn applicable(&self) -> usize {
        self.rows.iter().filter(|r| r.status.is_applicable()).count()
    }
}

/// Runs imports against one catalog snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Importer<'a> {
    snapshot: &'a CatalogSnapshot,
    settings: ImportSettings,
    dry_run: bool,
}

impl<'a> Importer<'a> {
    #[must_use]
    pub fn new(snapshot: &'a CatalogSnapshot, settings: ImportSettings) -> Self {
        Self {
            snapshot,
            settings,
            dry_run: false,
        }
    }

    /// Plan and report without writing anything.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reads, validates, and reconciles a spreadsheet.
    ///
    /// # Errors
    ///
    /// Fails before any row is touched when the file cannot be decoded, the
    /// header row breaks the column contract, or `kind` takes image files.
    pub fn plan_sheet(
        &self,
        kind: PipelineKind,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ImportPlan<'a>, ImportError> {
        if kind.takes_files() {
            return Err(ImportError::ExpectsFiles(kind.name()));
        }

        let stream = reader::open(file_name, bytes)?;
        kind.check_schema(stream.headers())?;

        let raw_rows = stream.collect::<Result<Vec<_>, _>>()?;
        let mut reconciler = Reconciler::new(kind, self.snapshot);
        let mut plan = ImportPlan {
            kind,
            rows: Vec::with_capacity(raw_rows.len()),
            keyless: 0,
        };

        for raw in &raw_rows {
            match map_row(kind, raw, self.snapshot) {
                Some(row) => plan.rows.push(reconciler.reconcile(row)),
                None => plan.keyless += 1,
            }
        }

        tracing::info!(
            kind = %kind,
            file = file_name,
            rows = plan.total_rows(),
            applicable = plan.applicable(),
            "import planned"
        );
        Ok(plan)
    }

    /// Validates and reconciles a set of `CODE_N.ext` image files.
    #[must_use]
    pub fn plan_files(&self, files: Vec<UploadedFile>) -> ImportPlan<'a> {
        let kind = PipelineKind::ImageFiles;
        let mut reconciler = Reconciler::new(kind, self.snapshot);
        let rows: Vec<ReconciledRow<'a>> = files
            .into_iter()
            .enumerate()
            .map(|(position, file)| reconciler.reconcile(map_file(position, file)))
            .collect();

        let plan = ImportPlan {
            kind,
            rows,
            keyless: 0,
        };
        tracing::info!(
            kind = %kind,
            files = plan.total_rows(),
            applicable = plan.applicable(),
            "import planned"
        );
        plan
    }

    /// Imports a spreadsheet for one of the sheet-based pipelines.
    ///
    /// # Errors
    ///
    /// See [`Importer::plan_sheet`]. Row-level failures are reported in the
    /// returned [`ImportReport`], never as `Err`.
    pub async fn run_sheet<W, P>(
        &self,
        kind: PipelineKind,
        file_name: &str,
        bytes: Vec<u8>,
        writer: &W,
        on_progress: P,
    ) -> Result<ImportReport, ImportError>
    where
        W: CatalogWriter,
        P: FnMut(Progress),
    {
        let plan = self.plan_sheet(kind, file_name, bytes)?;
        let report = self
            .execute(plan, move |row| apply_sheet_row(writer, row), on_progress)
            .await;
        Ok(report)
    }

    /// Uploads filename-coded images and links each to its product slot.
    pub async fn run_files<W, U, P>(
        &self,
        files: Vec<UploadedFile>,
        writer: &W,
        uploader: &U,
        on_progress: P,
    ) -> ImportReport
    where
        W: CatalogWriter,
        U: ImageUploader,
        P: FnMut(Progress),
    {
        let plan = self.plan_files(files);
        self.execute(
            plan,
            move |row| apply_image_row(writer, uploader, row),
            on_progress,
        )
        .await
    }

    /// Reports what an image-files run would do without uploading or writing.
    ///
    /// Needs no uploader, so it works without object storage.
    pub async fn preview_files<P>(
        &self,
        files: Vec<UploadedFile>,
        on_progress: P,
    ) -> ImportReport
    where
        P: FnMut(Progress),
    {
        let plan = self.plan_files(files);
        self.dry_run(true)
            .execute(
                plan,
                |row| std::future::ready(preview(&row)),
                on_progress,
            )
            .await
    }

    async fn execute<'p, F, Fut, P>(
        &self,
        plan: ImportPlan<'p>,
        apply: F,
        mut on_progress: P,
    ) -> ImportReport
    where
        F: FnMut(ReconciledRow<'p>) -> Fut,
        Fut: std::future::Future<Output = ImportOutcome>,
        P: FnMut(Progress),
    {
        let kind = plan.kind;
        let total_rows = plan.total_rows();
        let mut state = BatchRunState::new(&self.settings);
        for _ in 0..plan.keyless {
            state.skip_silently();
        }

        let mut applicable = Vec::new();
        for row in plan.rows {
            match row.rejection() {
                Some(outcome) => state.hold(outcome),
                None => applicable.push(row),
            }
        }

        if self.dry_run {
            let total = applicable.len();
            for row in &applicable {
                state.record(&preview(row));
            }
            on_progress(Progress {
                processed: total,
                total,
            });
        } else {
            run_batches(
                applicable,
                BatchOptions::from(&self.settings),
                &mut state,
                apply,
                on_progress,
            )
            .await;
        }

        let report = state.into_report(kind, total_rows, self.dry_run);
        tracing::info!(
            kind = %kind,
            dry_run = self.dry_run,
            rows = report.total_rows,
            success = report.success,
            errors = report.errors,
            skipped = report.skipped,
            "import finished"
        );
        report
    }
}

fn preview(row: &ReconciledRow<'_>) -> ImportOutcome {
    let n = row.row.row_number;
    match (&row.status, &row.row.image) {
        (RowStatus::Applicable(Target::Existing(product)), Some(upload)) => ImportOutcome::success(
            n,
            format!(
                "would upload {} as image {} of '{}' (id {})",
                upload.file.object_path(),
                upload.file.slot,
                product.description,
                product.id
            ),
        ),
        (RowStatus::Applicable(Target::Existing(product)), None) => with_price_change(
            ImportOutcome::success(
                n,
                format!("would update '{}' (id {})", product.description, product.id),
            ),
            product.price,
            &row.row.changes,
        ),
        _ => ImportOutcome::success(n, format!("would create {}", row.row.label())),
    }
}

fn with_price_change(
    outcome: ImportOutcome,
    before: rust_decimal::Decimal,
    changes: &ProductChanges,
) -> ImportOutcome {
    match changes.price {
        Some(after) if after != before => outcome.with_change(before, after),
        _ => outcome,
    }
}

async fn apply_sheet_row<W: CatalogWriter>(writer: &W, row: ReconciledRow<'_>) -> ImportOutcome {
    let n = row.row.row_number;
    match row.status {
        RowStatus::Applicable(Target::Existing(product)) => {
            match writer.update_product(product.id, &row.row.changes).await {
                Ok(Some(updated)) => with_price_change(
                    ImportOutcome::success(
                        n,
                        format!("updated '{}' (id {})", updated.description, updated.id),
                    ),
                    product.price,
                    &row.row.changes,
                ),
                Ok(None) => {
                    ImportOutcome::error(n, format!("product {} no longer exists", product.id))
                }
                Err(e) => ImportOutcome::error(n, e.to_string()),
            }
        }
        RowStatus::Applicable(Target::Create) => match &row.row.create {
            Some(new_product) => match writer.create_product(new_product).await {
                Ok(created) => ImportOutcome::success(
                    n,
                    format!("created '{}' (id {})", created.description, created.id),
                ),
                Err(e) => ImportOutcome::error(n, e.to_string()),
            },
            None => ImportOutcome::error(n, "row has nothing to create"),
        },
        _ => row
            .rejection()
            .unwrap_or_else(|| ImportOutcome::error(n, "row is not applicable")),
    }
}

async fn apply_image_row<W, U>(writer: &W, uploader: &U, row: ReconciledRow<'_>) -> ImportOutcome
where
    W: CatalogWriter,
    U: ImageUploader,
{
    let n = row.row.row_number;
    let (RowStatus::Applicable(Target::Existing(product)), Some(upload)) =
        (&row.status, &row.row.image)
    else {
        return row
            .rejection()
            .unwrap_or_else(|| ImportOutcome::error(n, "row has no image to upload"));
    };

    let path = upload.file.object_path();
    let url = match uploader
        .upload_image(&path, &upload.bytes, upload.file.content_type())
        .await
    {
        Ok(url) => url,
        Err(e) => return ImportOutcome::error(n, e.to_string()),
    };

    let mut changes = ProductChanges::default();
    changes.set_image(upload.file.slot, url.clone());

    match writer.update_product(product.id, &changes).await {
        Ok(Some(_)) => ImportOutcome::success(
            n,
            format!(
                "image {} of '{}' (id {}) set to {url}",
                upload.file.slot, product.description, product.id
            ),
        ),
        Ok(None) => ImportOutcome::error(n, format!("product {} no longer exists", product.id)),
        Err(e) => ImportOutcome::error(n, format!("uploaded {path} but {e}")),
    }
}
