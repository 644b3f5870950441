use polars::prelude::{DataType, Expr, LazyFrame, PlSmallStr, TimeUnit, TimeZone, col, lit};

use crate::{
    config::{RvConfig, SessionWindow},
    error::{ConfigError, RvResult},
    pipeline::Stage,
    schema::BarCol,
};

/// Builds a Polars time zone from the configured exchange zone.
pub(crate) fn polars_time_zone(tz: chrono_tz::Tz) -> RvResult<TimeZone> {
    TimeZone::opt_try_new(Some(PlSmallStr::from_static(tz.name())))
        .map_err(|e| ConfigError::InvalidTimezone(format!("{}: {e}", tz.name())))?
        .ok_or_else(|| ConfigError::InvalidTimezone(tz.name().to_string()).into())
}

/// Minute-of-day of a local datetime expression, 0-1439.
fn minute_of_day(ts: Expr) -> Expr {
    ts.clone().dt().hour().cast(DataType::Int32) * lit(60)
        + ts.dt().minute().cast(DataType::Int32)
}

/// Converts canonical UTC milliseconds to exchange-local time and keeps only
/// observations inside the regular trading session.
///
/// The window is half-open `[open, close)` in local wall-clock time, so with
/// the default 09:30-16:00 session a bar stamped 16:00 is excluded while the
/// 15:59 bar survives.
pub(crate) struct SessionFilter {
    window: SessionWindow,
    tz: TimeZone,
}

impl SessionFilter {
    pub(crate) fn new(cfg: &RvConfig) -> RvResult<Self> {
        Ok(Self {
            window: cfg.session(),
            tz: polars_time_zone(cfg.timezone())?,
        })
    }
}

impl Stage for SessionFilter {
    fn name(&self) -> &'static str {
        "session_filter"
    }

    fn apply(&self, lf: LazyFrame) -> LazyFrame {
        let ts_local = col(BarCol::WsMs)
            .cast(DataType::Datetime(
                TimeUnit::Milliseconds,
                Some(TimeZone::UTC),
            ))
            .dt()
            .convert_time_zone(self.tz.clone());

        let mod_expr = minute_of_day(col(BarCol::TsLocal));

        lf.select([
            col(BarCol::Symbol),
            col(BarCol::Close),
            ts_local.alias(BarCol::TsLocal),
        ])
        .filter(
            mod_expr
                .clone()
                .gt_eq(lit(self.window.open_minute() as i32))
                .and(mod_expr.lt(lit(self.window.close_minute() as i32))),
        )
    }
}
