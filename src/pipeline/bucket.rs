use polars::prelude::{
    DurationArgs, Expr, LazyFrame, SortMultipleOptions, col, duration, lit,
};

use crate::{
    config::{BucketWidth, SessionWindow},
    pipeline::Stage,
    schema::{BarCol, BucketCol},
};

/// Assigns each observation to a fixed-width time bucket anchored at session
/// open, then collapses every (symbol, bucket) group to a single row.
///
/// The grid is `bucket_start = floor_to_grid(ts_local - anchor, K) + anchor`
/// with `anchor = session_open mod K`, so the first bucket of the day starts
/// exactly at session open for any K. Buckets with no observations are
/// simply absent.
///
/// Per bucket, `close_k` is the close of the chronologically last
/// observation and `trade_date` its local calendar date (shared by all
/// observations of one bucket, since the session filter rules out buckets
/// straddling midnight).
pub(crate) struct Bucketizer {
    width: BucketWidth,
    anchor_minutes: u32,
}

impl Bucketizer {
    pub(crate) fn new(width: BucketWidth, session: SessionWindow) -> Self {
        Self {
            width,
            anchor_minutes: session.anchor_offset(width),
        }
    }

    fn bucket_start_expr(&self) -> Expr {
        let every = lit(self.width.duration_string());

        if self.anchor_minutes == 0 {
            return col(BarCol::TsLocal).dt().truncate(every);
        }

        let anchor = duration(DurationArgs {
            minutes: lit(i64::from(self.anchor_minutes)),
            ..DurationArgs::new()
        });
        (col(BarCol::TsLocal) - anchor.clone())
            .dt()
            .truncate(every)
            + anchor
    }
}

impl Stage for Bucketizer {
    fn name(&self) -> &'static str {
        "bucketizer"
    }

    fn apply(&self, lf: LazyFrame) -> LazyFrame {
        lf.with_column(self.bucket_start_expr().alias(BucketCol::BucketStart))
            .group_by([col(BarCol::Symbol), col(BucketCol::BucketStart)])
            .agg([
                col(BarCol::Close)
                    .sort_by([col(BarCol::TsLocal)], SortMultipleOptions::default())
                    .last()
                    .alias(BucketCol::CloseK),
                col(BarCol::TsLocal)
                    .dt()
                    .date()
                    .first()
                    .alias(BucketCol::TradeDate),
            ])
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone as _};
    use chrono_tz::Tz;
    use polars::{df, prelude::IntoLazy};

    use super::*;
    use crate::{config::RvConfig, pipeline::session::SessionFilter};

    fn ny_ms(h: u32, mi: u32) -> i64 {
        Tz::America__New_York
            .with_ymd_and_hms(2024, 1, 2, h, mi, 0)
            .unwrap()
            .timestamp_millis()
    }

    /// Builds the session-level frame (symbol, close, ts_local) the
    /// bucketizer consumes.
    fn session_frame(rows: &[(&str, f64, i64)]) -> LazyFrame {
        let symbols: Vec<&str> = rows.iter().map(|r| r.0).collect();
        let closes: Vec<f64> = rows.iter().map(|r| r.1).collect();
        let ws: Vec<i64> = rows.iter().map(|r| r.2).collect();
        let df = df![
            "symbol" => &symbols,
            "close" => &closes,
            "ws_ms" => &ws,
        ]
        .unwrap();
        SessionFilter::new(&RvConfig::default())
            .unwrap()
            .apply(df.lazy())
    }

    fn sorted_buckets(lf: LazyFrame) -> Vec<(i64, f64)> {
        let out = lf
            .sort(
                [BucketCol::BucketStart.as_str()],
                SortMultipleOptions::default(),
            )
            .collect()
            .unwrap();
        let starts = out
            .column(BucketCol::BucketStart.as_str())
            .unwrap()
            .datetime()
            .unwrap()
            .physical()
            .clone();
        let closes = out
            .column(BucketCol::CloseK.as_str())
            .unwrap()
            .f64()
            .unwrap()
            .clone();
        starts
            .into_no_null_iter()
            .zip(closes.into_no_null_iter())
            .collect()
    }

    #[test]
    fn test_five_minute_buckets_take_last_close() {
        // Rows deliberately out of chronological order: close_k must follow
        // observation time, not row order.
        let lf = session_frame(&[
            ("AAA", 100.5, ny_ms(9, 34)),
            ("AAA", 100.0, ny_ms(9, 30)),
            ("AAA", 100.2, ny_ms(9, 31)),
            ("AAA", 101.0, ny_ms(9, 35)),
        ]);

        let width = BucketWidth::new(5).unwrap();
        let buckets = sorted_buckets(Bucketizer::new(width, SessionWindow::default()).apply(lf));

        assert_eq!(
            buckets,
            vec![(ny_ms(9, 30), 100.5), (ny_ms(9, 35), 101.0)],
            "two buckets, each closing on its chronologically last observation"
        );
    }

    #[test]
    fn test_anchor_aligns_grid_with_session_open() {
        // K=7 does not divide the 09:30 open (570 = 81*7 + 3), so a
        // midnight-aligned grid would start buckets at 09:27/09:34. The
        // anchored grid starts them at 09:30/09:37.
        let lf = session_frame(&[
            ("AAA", 100.0, ny_ms(9, 30)),
            ("AAA", 100.5, ny_ms(9, 36)),
            ("AAA", 101.0, ny_ms(9, 37)),
        ]);

        let width = BucketWidth::new(7).unwrap();
        let buckets = sorted_buckets(Bucketizer::new(width, SessionWindow::default()).apply(lf));

        assert_eq!(
            buckets,
            vec![(ny_ms(9, 30), 100.5), (ny_ms(9, 37), 101.0)],
        );
    }

    #[test]
    fn test_empty_buckets_are_absent() {
        // Observations at 09:30 and 10:00 with K=5: the buckets in between
        // must not materialize.
        let lf = session_frame(&[
            ("AAA", 100.0, ny_ms(9, 30)),
            ("AAA", 101.0, ny_ms(10, 0)),
        ]);

        let width = BucketWidth::new(5).unwrap();
        let buckets = sorted_buckets(Bucketizer::new(width, SessionWindow::default()).apply(lf));

        assert_eq!(buckets.len(), 2);
    }

    #[test]
    fn test_trade_date_is_local_calendar_date() {
        let lf = session_frame(&[("AAA", 100.0, ny_ms(9, 30))]);

        let width = BucketWidth::new(5).unwrap();
        let out = Bucketizer::new(width, SessionWindow::default())
            .apply(lf)
            .collect()
            .unwrap();

        let days_since_epoch = out
            .column(BucketCol::TradeDate.as_str())
            .unwrap()
            .date()
            .unwrap()
            .physical()
            .get(0)
            .unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .signed_duration_since(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
            .num_days();
        assert_eq!(i64::from(days_since_epoch), expected);
    }
}
