use std::{fs, path::Path};

use polars::prelude::{
    CsvWriterOptions, DataFrame, IntoLazy, LazyFrame, ParquetWriteOptions, PlPath, SchemaRef,
    SinkOptions, SinkTarget,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    error::{DataError, IoError, RvResult},
    report::polars_ext::DataFrameExt,
    source::path_to_str,
};

// ================================================================================================
// Traits
// ================================================================================================

/// Defines a common interface for result-table types.
pub trait Report {
    /// Access the underlying DataFrame (Immutable).
    fn as_df(&self) -> &DataFrame;

    /// Access the underlying DataFrame (Mutable).
    fn as_df_mut(&mut self) -> &mut DataFrame;
}

pub trait ReportName {
    fn base_name(&self) -> String;

    fn filename(&self, ext: FileExtension) -> String {
        format!("{}.{}", self.base_name(), ext)
    }
}

pub trait ToSchema {
    /// Returns the canonical schema for this report type.
    fn to_schema() -> SchemaRef;
}

pub trait ToJson {
    /// Serializes the report to a generic JSON Value.
    /// Returns a `Value::Array` containing row objects.
    fn to_json(&self) -> RvResult<serde_json::Value>;
}

pub trait ToCsv {
    /// Writes the report to a CSV file in the target directory.
    ///
    /// # Side Effects
    /// - Creates the directory if missing.
    /// - Overwrites the file if it exists.
    fn to_csv(
        &self,
        dir: impl AsRef<Path>,
        opts: Option<&CsvWriterOptions>,
        sink_opts: Option<&SinkOptions>,
    ) -> RvResult<()>;
}

pub trait ToParquet {
    fn to_parquet(
        &self,
        dir: impl AsRef<Path>,
        opts: Option<&ParquetWriteOptions>,
        sink_opts: Option<&SinkOptions>,
    ) -> RvResult<()>;
}

// ================================================================================================
// Blanket Implementations
// ================================================================================================

impl<T> ToJson for T
where
    T: Report,
{
    fn to_json(&self) -> RvResult<serde_json::Value> {
        let rows = self.as_df().to_json_rows()?;
        Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
    }
}

impl<T> ToCsv for T
where
    T: Report + ReportName,
{
    fn to_csv(
        &self,
        dir: impl AsRef<Path>,
        opts: Option<&CsvWriterOptions>,
        sink_opts: Option<&SinkOptions>,
    ) -> RvResult<()> {
        let file_path = dir.as_ref().join(self.filename(FileExtension::Csv));
        let lf = self.as_df().clone().lazy();
        sink_csv_path_with(lf, &file_path, opts, sink_opts)
    }
}

impl<T> ToParquet for T
where
    T: Report + ReportName,
{
    fn to_parquet(
        &self,
        dir: impl AsRef<Path>,
        opts: Option<&ParquetWriteOptions>,
        sink_opts: Option<&SinkOptions>,
    ) -> RvResult<()> {
        let file_path = dir.as_ref().join(self.filename(FileExtension::Parquet));
        let lf = self.as_df().clone().lazy();
        sink_parquet_path_with(lf, &file_path, opts, sink_opts)
    }
}

// ================================================================================================
// Sink Helpers
// ================================================================================================

/// Streams a lazy plan into a Parquet file at an exact path, creating parent
/// directories as needed.
pub(crate) fn sink_parquet_path(lf: LazyFrame, path: &Path) -> RvResult<()> {
    sink_parquet_path_with(lf, path, None, None)
}

fn sink_parquet_path_with(
    lf: LazyFrame,
    path: &Path,
    opts: Option<&ParquetWriteOptions>,
    sink_opts: Option<&SinkOptions>,
) -> RvResult<()> {
    let target = sink_target(path)?;
    let options = opts.cloned().unwrap_or_default();
    let sink_opts = sink_opts.cloned().unwrap_or_default();

    let sink_plan = lf
        .with_new_streaming(true)
        .sink_parquet(target, options, None, sink_opts)
        .map_err(|e| DataError::DataFrame(format!("Failed to build Parquet sink plan: {e}")))?;

    let _ = sink_plan.collect().map_err(|e| IoError::WriteFailed {
        path: path.display().to_string(),
        msg: e.to_string(),
    })?;

    Ok(())
}

fn sink_csv_path_with(
    lf: LazyFrame,
    path: &Path,
    opts: Option<&CsvWriterOptions>,
    sink_opts: Option<&SinkOptions>,
) -> RvResult<()> {
    let target = sink_target(path)?;
    let options = opts.cloned().unwrap_or_default();
    let sink_opts = sink_opts.cloned().unwrap_or_default();

    let sink_plan = lf
        .with_new_streaming(true)
        .sink_csv(target, options, None, sink_opts)
        .map_err(|e| DataError::DataFrame(format!("Failed to build CSV sink plan: {e}")))?;

    let _ = sink_plan.collect().map_err(|e| IoError::WriteFailed {
        path: path.display().to_string(),
        msg: e.to_string(),
    })?;

    Ok(())
}

fn sink_target(path: &Path) -> RvResult<SinkTarget> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        fs::create_dir_all(dir).map_err(|e| {
            IoError::FileSystem(format!(
                "Failed to create directory {}: {}",
                dir.display(),
                e
            ))
        })?;
    }

    let uri = path_to_str(path)?;
    Ok(SinkTarget::Path(PlPath::new(uri)))
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum FileExtension {
    Csv,
    Parquet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension_display() {
        assert_eq!(FileExtension::Csv.to_string(), "csv");
        assert_eq!(FileExtension::Parquet.to_string(), "parquet");
    }

    #[test]
    fn test_filename_composition() {
        struct Dummy;
        impl ReportName for Dummy {
            fn base_name(&self) -> String {
                "daily_rv".to_string()
            }
        }

        assert_eq!(Dummy.filename(FileExtension::Parquet), "daily_rv.parquet");
        assert_eq!(Dummy.filename(FileExtension::Csv), "daily_rv.csv");
    }
}
