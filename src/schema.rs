use polars::prelude::PlSmallStr;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Columns of the raw daily bar file delivered by the acquisition layer.
///
/// The input carries one row per minute bar per symbol, with `window_start`
/// an epoch integer of unknown granularity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum RawCol {
    /// Ticker symbol as delivered (any case).
    Ticker,
    /// Close price of the bar.
    Close,
    /// Bar start as an epoch integer of unknown unit (s / ms / µs / ns).
    WindowStart,
}

/// Columns of the normalized per-observation frame.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum BarCol {
    /// Upper-cased ticker symbol.
    Symbol,
    /// Close price (Float64, strictly positive after ingest).
    Close,
    /// Canonical UTC epoch milliseconds; null where no epoch unit matched or
    /// the rescaled instant fell outside the sane calendar range.
    WsMs,
    /// Observation instant in the exchange's local civil time.
    TsLocal,
}

/// Columns of the per-bucket frame produced by the bucketizer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum BucketCol {
    /// Upper-cased ticker symbol.
    Symbol,
    /// Anchored bucket boundary in exchange-local time.
    BucketStart,
    /// Close price of the chronologically last observation in the bucket.
    CloseK,
    /// Local calendar date the bucket belongs to.
    TradeDate,
    /// Log return against the previous bucket of the same (symbol, trade_date);
    /// null on the first bucket of each group.
    #[strum(serialize = "r")]
    Return,
}

/// Columns of the daily realized-variance output table.
///
/// One row per (symbol, trade_date, K).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum DailyRvCol {
    /// Upper-cased ticker symbol.
    Symbol,
    /// Local trading date.
    TradeDate,
    /// Bucket width in minutes this row was sampled at.
    #[strum(serialize = "K")]
    K,
    /// Number of buckets observed that day (empty buckets are absent).
    NBuckets,
    /// Number of valid returns that day (`n_buckets - 1` when no gaps).
    NRet,
    /// Realized variance: mean of squared log returns; 0.0 on days with no
    /// valid return.
    Rv,
    /// `sqrt(rv)`.
    SigmaDaily,
    /// `sigma_daily * sqrt(annualization_factor(K))`.
    SigmaAnnualized,
}

macro_rules! impl_col_names {
    ($($col:ident),+ $(,)?) => {
        $(
            impl From<$col> for PlSmallStr {
                fn from(value: $col) -> Self {
                    value.as_str().into()
                }
            }

            impl From<&$col> for PlSmallStr {
                fn from(value: &$col) -> Self {
                    value.as_str().into()
                }
            }

            impl $col {
                pub fn name(&self) -> PlSmallStr {
                    (*self).into()
                }

                pub fn as_str(&self) -> &'static str {
                    self.into()
                }
            }
        )+
    };
}

impl_col_names!(RawCol, BarCol, BucketCol, DailyRvCol);
