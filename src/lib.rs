pub mod config;
mod error;
mod pipeline;
mod report;
mod schema;
mod source;

pub use config::{BucketWidth, RvConfig, SessionWindow};
pub use error::{ConfigError, DataError, IoError, RealvolError, RvResult};
pub use pipeline::epoch::{EpochUnit, normalize_epoch};
pub use pipeline::{RunSummary, compute_daily_rv, rv_daily_for_file};
pub use report::daily_rv::DailyRv;
pub use report::io::{FileExtension, Report, ReportName, ToCsv, ToJson, ToParquet, ToSchema};
pub use schema::{BarCol, BucketCol, DailyRvCol, RawCol};
