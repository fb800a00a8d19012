use thiserror::Error;

/// The uploaded file could not be decoded into rows.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("unsupported file format for \"{file_name}\": expected .csv, .xlsx, or .xls")]
    UnsupportedFormat { file_name: String },

    #[error("file is empty or malformed: a header row and at least one data row are required")]
    EmptyOrMalformed,

    #[error("CSV decode error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet decode error: {0}")]
    Spreadsheet(#[from] calamine::Error),
}

/// The header row does not satisfy the pipeline's column contract.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("missing required column: {0}")]
    MissingRequiredColumn(String),

    #[error("unexpected columns: {}", .0.join(", "))]
    ForbiddenColumn(Vec<String>),
}

/// Run-level failure. Row-level problems never surface here; they are
/// reported as outcomes in the final report instead.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("pipeline '{0}' takes image files, not a spreadsheet")]
    ExpectsFiles(&'static str),

    #[error("pipeline '{0}' takes a spreadsheet, not image files")]
    ExpectsSheet(&'static str),
}
