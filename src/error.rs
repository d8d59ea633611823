use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReconError>;

#[derive(Error, Debug)]
pub enum ReconError {
    /// A required upload is absent; nothing is processed.
    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("cannot read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("cannot write workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sheet '{sheet}' does not fit in a worksheet ({rows} rows x {cols} columns)")]
    SheetTooLarge { sheet: String, rows: usize, cols: usize },

    #[error("{path}: {message}")]
    Input { path: PathBuf, message: String },
}
