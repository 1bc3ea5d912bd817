use thiserror::Error;

/// Convenience result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// Error type returned by sheet sources and the compile driver.
///
/// This is a single error enum shared across all sheet sources (Excel, Google
/// Sheets payloads, CSV) and the batch driver. Data-level problems inside a
/// sheet are deliberately *not* errors; they surface as
/// [`crate::compile::CompileWarning`]s so a batch can keep going.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Workbook read error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// CSV source error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The requested sheet does not exist in the source.
    #[error("missing sheet '{sheet}'")]
    MissingSheet { sheet: String },

    /// The source payload does not have the expected shape (e.g. a Sheets API
    /// response without grid data).
    #[error("source mismatch: {message}")]
    SourceMismatch { message: String },
}
