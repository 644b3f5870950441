use std::path::Path;

use polars::{
    error::PolarsError,
    prelude::{IntoLazy, LazyFrame, SortMultipleOptions, UnionArgs, concat, len},
};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    config::{BucketWidth, RvConfig},
    error::{DataError, IoError, RealvolError, RvResult},
    report::{daily_rv::DailyRv, io::sink_parquet_path, io::Report},
    schema::DailyRvCol,
    source::{self, IngestProjection},
};

pub(crate) mod bucket;
pub(crate) mod epoch;
pub(crate) mod returns;
pub(crate) mod rv;
pub(crate) mod session;

use bucket::Bucketizer;
use epoch::EpochNormalizer;
use returns::ReturnEngine;
use rv::DailyRvAggregator;
use session::SessionFilter;

/// One step of the transform: a stateless LazyFrame-to-LazyFrame rewrite.
///
/// Stages carry no mutable state and append to the lazy plan only, so a
/// pipeline is an ordered list of stages folded over the input. Each stage
/// is independently testable against a hand-built frame.
pub(crate) trait Stage {
    fn name(&self) -> &'static str;

    fn apply(&self, lf: LazyFrame) -> LazyFrame;
}

fn apply_stages(lf: LazyFrame, stages: &[&dyn Stage]) -> LazyFrame {
    stages.iter().fold(lf, |lf, stage| {
        debug!(stage = stage.name(), "appending transform to plan");
        stage.apply(lf)
    })
}

/// Row counts of one file-level invocation, reported back so the external
/// orchestration layer can record run metadata in its ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Rows in the raw input file.
    pub input_rows: u64,
    /// Rows in the realized-variance output table.
    pub output_rows: u64,
}

/// Computes the daily realized-variance table for one day's raw bar frame.
///
/// This is the pure core: the input carries `ticker`, `close` and
/// `window_start` columns (extra columns are ignored), and the output holds
/// one row per (symbol, trade_date, K) for every configured K, sorted by
/// that key. Each (symbol, trade_date) group is independent; the per-width
/// plans are unioned and executed once on the streaming engine so memory use
/// does not scale with the number of widths.
///
/// # Errors
/// Fails fast on a missing required column ([`DataError::MissingColumn`]);
/// rows with unusable timestamps or non-positive prices are silently dropped
/// instead.
#[tracing::instrument(skip_all, fields(widths = cfg.widths().len()))]
pub fn compute_daily_rv(mut lf: LazyFrame, cfg: &RvConfig) -> RvResult<DailyRv> {
    source::validate_bar_schema(&mut lf)?;

    let session_filter = SessionFilter::new(cfg)?;
    let base = apply_stages(
        lf,
        &[&IngestProjection, &EpochNormalizer, &session_filter],
    );

    let plans: Vec<LazyFrame> = cfg
        .widths()
        .par_iter()
        .map(|&width| width_plan(base.clone(), width, cfg))
        .collect();

    let merged = concat(
        plans,
        UnionArgs {
            parallel: true,
            rechunk: true,
            ..Default::default()
        },
    )
    .map_err(|e| DataError::DataFrame(format!("Failed to build union plan: {e}")))?;

    let df = merged
        .sort(
            [
                DailyRvCol::Symbol.as_str(),
                DailyRvCol::TradeDate.as_str(),
                DailyRvCol::K.as_str(),
            ],
            SortMultipleOptions::default(),
        )
        .with_new_streaming(true)
        .collect()
        .map_err(|e| DataError::DataFrame(format!("Pipeline execution failed: {e}")))?;

    info!(rows = df.height(), "daily realized variance computed");
    DailyRv::new(df)
}

fn width_plan(base: LazyFrame, width: BucketWidth, cfg: &RvConfig) -> LazyFrame {
    let bucketizer = Bucketizer::new(width, cfg.session());
    let aggregator = DailyRvAggregator::new(width, cfg.annualization_factor(width));
    apply_stages(base, &[&bucketizer, &ReturnEngine, &aggregator])
}

/// Runs the whole transform for one daily file: scan the raw parquet,
/// compute every configured resolution, and sink the result table to
/// `output` as parquet.
///
/// Pure given its inputs — no shared files, no global counters — so an
/// orchestrator may run one invocation per worker process without
/// coordination.
#[tracing::instrument(skip(cfg))]
pub fn rv_daily_for_file(input: &Path, output: &Path, cfg: &RvConfig) -> RvResult<RunSummary> {
    let lf = source::scan_bars(input)?;
    let input_rows = count_rows(lf.clone(), input)?;

    let report = compute_daily_rv(lf, cfg)?;
    let output_rows = report.height() as u64;

    sink_parquet_path(report.as_df().clone().lazy(), output)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        input_rows,
        output_rows,
        "realized-variance file written"
    );
    Ok(RunSummary {
        input_rows,
        output_rows,
    })
}

fn count_rows(lf: LazyFrame, path: &Path) -> RvResult<u64> {
    let df = lf
        .select([len().alias("n")])
        .collect()
        .map_err(|e| -> RealvolError {
            match &e {
                PolarsError::IO { .. } => IoError::ReadFailed {
                    path: path.display().to_string(),
                    msg: e.to_string(),
                }
                .into(),
                _ => DataError::DataFrame(format!("Failed to count input rows: {e}")).into(),
            }
        })?;

    let n = df
        .column("n")
        .ok()
        .and_then(|c| c.u32().ok())
        .and_then(|ca| ca.get(0))
        .unwrap_or(0);
    Ok(u64::from(n))
}
