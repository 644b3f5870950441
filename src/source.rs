use std::path::Path;

use polars::{
    error::PolarsError,
    prelude::{DataType, LazyFrame, PlPath, ScanArgsParquet, col, lit},
};
use strum::IntoEnumIterator;

use crate::{
    error::{DataError, IoError, RealvolError, RvResult},
    pipeline::Stage,
    schema::{BarCol, RawCol},
};

/// Lazily scans one daily bar file.
///
/// # Errors
/// Returns [`IoError::ReadFailed`] when the file does not exist or cannot be
/// opened. Column-level problems are reported later by
/// [`validate_bar_schema`], as a [`DataError`].
pub(crate) fn scan_bars(path: &Path) -> RvResult<LazyFrame> {
    let uri = path_to_str(path)?;

    std::fs::metadata(path).map_err(|e| IoError::ReadFailed {
        path: uri.to_string(),
        msg: e.to_string(),
    })?;

    LazyFrame::scan_parquet(PlPath::new(uri), ScanArgsParquet::default()).map_err(|e| {
        IoError::ReadFailed {
            path: uri.to_string(),
            msg: e.to_string(),
        }
        .into()
    })
}

pub(crate) fn path_to_str(path: &Path) -> RvResult<&str> {
    path.to_str().ok_or_else(|| {
        IoError::FileSystem(format!(
            "Path contains invalid UTF-8 characters: {}",
            path.display()
        ))
        .into()
    })
}

/// Checks that every required input column is present.
///
/// Schema errors are fatal: the pipeline produces no partial output for a
/// malformed file.
pub(crate) fn validate_bar_schema(lf: &mut LazyFrame) -> RvResult<()> {
    let schema = lf.collect_schema().map_err(|e| -> RealvolError {
        match &e {
            PolarsError::IO { .. } => IoError::ReadFailed {
                path: "<input frame>".to_string(),
                msg: e.to_string(),
            }
            .into(),
            _ => DataError::DataFrame(format!("Failed to resolve input schema: {e}")).into(),
        }
    })?;

    for required in RawCol::iter() {
        if schema.get(required.as_str()).is_none() {
            return Err(DataError::MissingColumn {
                column: required.as_str().to_string(),
                found: schema.iter_names().map(|n| n.to_string()).collect(),
            }
            .into());
        }
    }

    Ok(())
}

/// Projects the raw bar file onto the canonical observation columns.
///
/// Upper-cases the ticker into `symbol`, casts `close` to Float64 and
/// `window_start` to Int64. Rows with a non-positive close are dropped here,
/// before any logarithm can see them; prices must be strictly positive.
pub(crate) struct IngestProjection;

impl Stage for IngestProjection {
    fn name(&self) -> &'static str {
        "ingest"
    }

    fn apply(&self, lf: LazyFrame) -> LazyFrame {
        lf.select([
            col(RawCol::Ticker)
                .str()
                .to_uppercase()
                .alias(BarCol::Symbol),
            col(RawCol::Close).cast(DataType::Float64),
            col(RawCol::WindowStart).cast(DataType::Int64),
        ])
        .filter(col(BarCol::Close).gt(lit(0.0)))
    }
}
