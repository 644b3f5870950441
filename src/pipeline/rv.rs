use polars::prelude::{LazyFrame, col, len, lit};
use strum::IntoEnumIterator;

use crate::{
    config::BucketWidth,
    pipeline::Stage,
    schema::{BucketCol, DailyRvCol},
};

/// Collapses the bucket returns of one resolution into one row per
/// (symbol, trade_date), tagged with the bucket width K.
///
/// `rv` is the mean of squared log returns over the day. A day with no valid
/// return (a single observed bucket, e.g. a holiday-shortened session) is a
/// degenerate but valid row: `n_ret = 0`, `rv = 0.0`, both sigmas zero.
///
/// `sigma_annualized = sigma_daily * sqrt(annualization_factor)`, where the
/// factor counts K-minute periods per year and is supplied by the caller so
/// it stays consistent with the configured session length.
pub(crate) struct DailyRvAggregator {
    width: BucketWidth,
    annualization_factor: f64,
}

impl DailyRvAggregator {
    pub(crate) fn new(width: BucketWidth, annualization_factor: f64) -> Self {
        Self {
            width,
            annualization_factor,
        }
    }
}

impl Stage for DailyRvAggregator {
    fn name(&self) -> &'static str {
        "daily_rv_aggregator"
    }

    fn apply(&self, lf: LazyFrame) -> LazyFrame {
        let r = || col(BucketCol::Return);

        lf.group_by([col(BucketCol::Symbol), col(BucketCol::TradeDate)])
            .agg([
                len().alias(DailyRvCol::NBuckets),
                r().count().alias(DailyRvCol::NRet),
                (r() * r())
                    .mean()
                    .fill_null(lit(0.0))
                    .alias(DailyRvCol::Rv),
            ])
            .with_columns([
                col(DailyRvCol::Rv).sqrt().alias(DailyRvCol::SigmaDaily),
                (col(DailyRvCol::Rv).sqrt() * lit(self.annualization_factor.sqrt()))
                    .alias(DailyRvCol::SigmaAnnualized),
                lit(self.width.minutes() as i32).alias(DailyRvCol::K),
            ])
            .select(DailyRvCol::iter().map(col).collect::<Vec<_>>())
    }
}
