//! Spreadsheet and image-file import pipeline for the product catalog.
//!
//! One run flows `reader` → `mapper` → `reconcile` → `apply` → `report`.
//! [`Importer`] wires the stages together for each [`PipelineKind`].

pub mod apply;
pub mod coerce;
pub mod error;
pub mod headers;
pub mod images;
pub mod importer;
pub mod mapper;
pub mod pipeline;
pub mod reader;
pub mod reconcile;
pub mod report;
pub mod snapshot;
pub mod template;

pub use apply::{run_batches, BatchOptions, BatchRunState, Progress};
pub use coerce::{parse_bool, parse_leading_int, parse_price, round_up_100, CellValue};
pub use error::{ImportError, ReadError, SchemaError};
pub use images::{ImageFileName, SlotTracker, UploadedFile};
pub use importer::{ImportPlan, Importer};
pub use mapper::{map_file, map_row, ImageUpload, ValidatedRow};
pub use pipeline::{ColumnContract, PipelineKind};
pub use reader::{FileFormat, Header, RawRow, RowStream};
pub use reconcile::{ReconciledRow, Reconciler, RowStatus, Target};
pub use report::{DetailLog, ImportOutcome, ImportReport, OutcomeStatus};
pub use snapshot::CatalogSnapshot;
pub use template::price_template;
