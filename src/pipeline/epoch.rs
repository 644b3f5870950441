use polars::prelude::{
    Column, DataType, Expr, Field, Int64Chunked, IntoColumn, IntoSeries, LazyFrame, PolarsResult,
    col,
};
use strum::Display;

use crate::{
    pipeline::Stage,
    schema::{BarCol, RawCol},
};

/// Lower bound of the sane calendar range, 2000-01-01T00:00:00Z in epoch ms.
pub(crate) const MS_MIN: i64 = 946_684_800_000;
/// Exclusive upper bound of the sane calendar range, 2100-01-01T00:00:00Z.
pub(crate) const MS_MAX: i64 = 4_102_444_800_000;

/// The granularity of a raw epoch integer, detected by magnitude.
///
/// Bands are non-overlapping: 10-digit values are seconds, 13-digit values
/// milliseconds, 16-digit microseconds, 19-digit nanoseconds. Anything
/// outside every band is unrecognized and classifies to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EpochUnit {
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl EpochUnit {
    /// Classifies a raw epoch integer into exactly one unit band.
    pub fn classify(raw: i64) -> Option<Self> {
        match raw {
            1_000_000_000..=9_999_999_999 => Some(Self::Seconds),
            1_000_000_000_000..=9_999_999_999_999 => Some(Self::Milliseconds),
            1_000_000_000_000_000..=9_999_999_999_999_999 => Some(Self::Microseconds),
            1_000_000_000_000_000_000..=i64::MAX => Some(Self::Nanoseconds),
            _ => None,
        }
    }

    /// Rescales a raw value of this unit to epoch milliseconds.
    ///
    /// Sub-millisecond precision is floored away.
    pub fn rescale_to_millis(self, raw: i64) -> i64 {
        match self {
            Self::Seconds => raw * 1_000,
            Self::Milliseconds => raw,
            Self::Microseconds => raw / 1_000,
            Self::Nanoseconds => raw / 1_000_000,
        }
    }
}

/// Normalizes one raw epoch integer to canonical UTC milliseconds.
///
/// Total and deterministic: unclassifiable magnitudes and rescaled instants
/// outside `[2000-01-01, 2100-01-01)` come back as `None`, never as an error.
/// Every `Some` result lands in the milliseconds band, so re-normalizing an
/// output is a no-op.
pub fn normalize_epoch(raw: i64) -> Option<i64> {
    let unit = EpochUnit::classify(raw)?;
    let ms = unit.rescale_to_millis(raw);
    (MS_MIN..MS_MAX).contains(&ms).then_some(ms)
}

fn normalize_epoch_udf(c: Column) -> PolarsResult<Column> {
    let out: Int64Chunked = c
        .i64()?
        .into_iter()
        .map(|opt| opt.and_then(normalize_epoch))
        .collect();
    Ok(out.into_series().into_column())
}

/// Expression producing the nullable canonical-milliseconds column from
/// `window_start`.
pub(crate) fn canonical_ms_expr() -> Expr {
    col(RawCol::WindowStart).map(normalize_epoch_udf, |_, _| {
        Ok(Field {
            name: BarCol::WsMs.name(),
            dtype: DataType::Int64,
        })
    })
}

/// Rewrites `window_start` into canonical UTC milliseconds and drops the
/// rows no unit assignment could make sense of.
pub(crate) struct EpochNormalizer;

impl Stage for EpochNormalizer {
    fn name(&self) -> &'static str {
        "epoch_normalizer"
    }

    fn apply(&self, lf: LazyFrame) -> LazyFrame {
        lf.select([
            col(BarCol::Symbol),
            col(BarCol::Close),
            canonical_ms_expr().alias(BarCol::WsMs),
        ])
        .filter(col(BarCol::WsMs).is_not_null())
    }
}
