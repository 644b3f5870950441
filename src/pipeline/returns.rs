use polars::prelude::{LazyFrame, SortMultipleOptions, col, lit};

use crate::{pipeline::Stage, schema::BucketCol};

/// Computes the log return between consecutive buckets of the same
/// (symbol, trade_date) group.
///
/// The lag is windowed over (symbol, trade_date) *before* shifting — a
/// global shift would hand the first bucket of a day the previous day's
/// close and corrupt its return. The first bucket of each group therefore
/// carries a null return, which the aggregator excludes rather than
/// treating as zero.
pub(crate) struct ReturnEngine;

impl Stage for ReturnEngine {
    fn name(&self) -> &'static str {
        "return_engine"
    }

    fn apply(&self, lf: LazyFrame) -> LazyFrame {
        lf.sort(
            [
                BucketCol::Symbol.as_str(),
                BucketCol::TradeDate.as_str(),
                BucketCol::BucketStart.as_str(),
            ],
            SortMultipleOptions::default(),
        )
        .with_column(
            (col(BucketCol::CloseK) / col(BucketCol::CloseK).shift(lit(1)))
                .log(std::f64::consts::E.into())
                .over([col(BucketCol::Symbol), col(BucketCol::TradeDate)])
                .alias(BucketCol::Return),
        )
    }
}

#[cfg(test)]
mod tests {
    use polars::{df, prelude::IntoLazy};

    use super::*;

    fn returns_of(df: polars::frame::DataFrame) -> Vec<Option<f64>> {
        let out = ReturnEngine.apply(df.lazy()).collect().unwrap();
        out.column(BucketCol::Return.as_str())
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_first_bucket_has_no_return() {
        let df = df![
            "symbol" => &["AAA", "AAA"],
            "trade_date" => &["2024-01-02", "2024-01-02"],
            "bucket_start" => &[1_i64, 2],
            "close_k" => &[100.0, 101.0],
        ]
        .unwrap();

        let r = returns_of(df);
        assert_eq!(r[0], None);
        assert!((r[1].unwrap() - (101.0_f64 / 100.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_returns_never_cross_day_boundary() {
        // Day 1 closes on 101, day 2 opens on 101: a global shift would give
        // day 2's first bucket a zero return instead of none.
        let df = df![
            "symbol" => &["AAA", "AAA", "AAA", "AAA"],
            "trade_date" => &["2024-01-02", "2024-01-02", "2024-01-03", "2024-01-03"],
            "bucket_start" => &[1_i64, 2, 1, 2],
            "close_k" => &[100.0, 101.0, 101.0, 99.0],
        ]
        .unwrap();

        let r = returns_of(df);
        assert_eq!(r[0], None);
        assert!((r[1].unwrap() - (101.0_f64 / 100.0).ln()).abs() < 1e-12);
        assert_eq!(r[2], None, "day boundary must reset the lag");
        assert!((r[3].unwrap() - (99.0_f64 / 101.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_returns_windowed_per_symbol() {
        let df = df![
            "symbol" => &["AAA", "BBB", "AAA", "BBB"],
            "trade_date" => &["2024-01-02", "2024-01-02", "2024-01-02", "2024-01-02"],
            "bucket_start" => &[1_i64, 1, 2, 2],
            "close_k" => &[100.0, 50.0, 102.0, 51.0],
        ]
        .unwrap();

        // After the internal sort the frame is AAA(1), AAA(2), BBB(1), BBB(2).
        let r = returns_of(df);
        assert_eq!(r[0], None);
        assert!((r[1].unwrap() - (102.0_f64 / 100.0).ln()).abs() < 1e-12);
        assert_eq!(r[2], None);
        assert!((r[3].unwrap() - (51.0_f64 / 50.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_row_order_does_not_matter() {
        let ordered = df![
            "symbol" => &["AAA", "AAA", "AAA"],
            "trade_date" => &["2024-01-02", "2024-01-02", "2024-01-02"],
            "bucket_start" => &[1_i64, 2, 3],
            "close_k" => &[100.0, 101.0, 99.5],
        ]
        .unwrap();
        let shuffled = df![
            "symbol" => &["AAA", "AAA", "AAA"],
            "trade_date" => &["2024-01-02", "2024-01-02", "2024-01-02"],
            "bucket_start" => &[3_i64, 1, 2],
            "close_k" => &[99.5, 100.0, 101.0],
        ]
        .unwrap();

        assert_eq!(returns_of(ordered), returns_of(shuffled));
    }
}
