use thiserror::Error;

pub type RvResult<T> = Result<T, RealvolError>;

#[derive(Debug, Error)]
pub enum RealvolError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// Errors raised while validating pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid bucket width: {0}")]
    InvalidBucketWidth(String),

    #[error("Invalid bucket width set: {0}")]
    InvalidWidthSet(String),

    #[error("Invalid session window (open: {open}, close: {close}): {msg}")]
    InvalidSessionWindow {
        open: String,
        close: String,
        msg: String,
    },

    #[error("Invalid timezone identifier: '{0}'")]
    InvalidTimezone(String),
}

/// Errors related to input schema and frame computation.
///
/// Schema errors are fatal: a missing required column produces no partial
/// output. Out-of-range timestamps are NOT errors; those rows are nulled and
/// dropped inside the pipeline.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Required column '{column}' missing from input (found: {found:?})")]
    MissingColumn { column: String, found: Vec<String> },

    #[error("Data frame error: {0}")]
    DataFrame(String),

    #[error("Unexpected output schema: {0}")]
    UnexpectedSchema(String),
}

/// Errors related to reading and writing columnar files.
///
/// Kept distinct from [`DataError`] so callers can tell a broken file apart
/// from a well-read file with the wrong columns.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO operation failed")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed")]
    Json(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Failed to read '{path}': {msg}")]
    ReadFailed { path: String, msg: String },

    #[error("Failed to write '{path}': {msg}")]
    WriteFailed { path: String, msg: String },
}
