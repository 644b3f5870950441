use chrono::{NaiveTime, Timelike};
use chrono_tz::Tz;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, RvResult};

/// Minutes in one calendar day; the upper bound for a bucket width.
const MINUTES_PER_DAY: u32 = 24 * 60;

/// A resampling bucket width in minutes.
///
/// Strictly positive and at most one day. A width wider than the trading
/// session is legal and simply yields a single bucket per day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BucketWidth(u32);

impl BucketWidth {
    /// Creates a bucket width of `minutes` minutes.
    ///
    /// # Errors
    /// Returns an error unless `1 <= minutes <= 1440`.
    pub fn new(minutes: u32) -> RvResult<Self> {
        if minutes == 0 || minutes > MINUTES_PER_DAY {
            return Err(ConfigError::InvalidBucketWidth(format!(
                "bucket width must be in the range 1-{MINUTES_PER_DAY} minutes, got {minutes}"
            ))
            .into());
        }
        Ok(Self(minutes))
    }

    pub fn minutes(&self) -> u32 {
        self.0
    }

    /// The width as a Polars duration string, e.g. `"5m"`.
    pub(crate) fn duration_string(&self) -> String {
        format!("{}m", self.0)
    }
}

/// The regular-trading-hours window in exchange-local time.
///
/// # Semantics
/// The interval is **half-open**: `[open, close)`. Minute bars are stamped at
/// window start, so with the default 09:30-16:00 window the last retained bar
/// is 15:59 (covering 15:59-16:00) and no end-of-day partial bucket arises.
///
/// Boundaries have minute precision; seconds must be zero. Windows cannot
/// wrap around midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionWindow {
    open: NaiveTime,
    close: NaiveTime,
}

impl SessionWindow {
    /// Creates a new session window.
    ///
    /// # Errors
    /// Returns an error if:
    /// - either boundary carries a non-zero seconds component,
    /// - `open >= close` (midnight wrapping is not supported).
    pub fn new(open: NaiveTime, close: NaiveTime) -> RvResult<Self> {
        let err = |msg: &str| ConfigError::InvalidSessionWindow {
            open: open.to_string(),
            close: close.to_string(),
            msg: msg.to_string(),
        };

        if open.second() != 0 || open.nanosecond() != 0 {
            return Err(err("open must have minute precision (seconds must be zero)").into());
        }
        if close.second() != 0 || close.nanosecond() != 0 {
            return Err(err("close must have minute precision (seconds must be zero)").into());
        }
        if open >= close {
            return Err(err(
                "open must be strictly before close (wrapping past midnight is not supported)",
            )
            .into());
        }

        Ok(Self { open, close })
    }

    /// US equities regular trading hours, 09:30-16:00.
    pub fn us_equities_rth() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 30, 0).expect("valid RTH open"),
            close: NaiveTime::from_hms_opt(16, 0, 0).expect("valid RTH close"),
        }
    }

    /// Inclusive session open.
    pub fn open(&self) -> NaiveTime {
        self.open
    }

    /// Exclusive session close.
    pub fn close(&self) -> NaiveTime {
        self.close
    }

    /// Session open as a minute-of-day offset.
    pub fn open_minute(&self) -> u32 {
        self.open.hour() * 60 + self.open.minute()
    }

    /// Session close as a minute-of-day offset.
    pub fn close_minute(&self) -> u32 {
        self.close.hour() * 60 + self.close.minute()
    }

    /// Session length in minutes; the per-day period count for K=1.
    pub fn minutes(&self) -> u32 {
        self.close_minute() - self.open_minute()
    }

    /// The sub-grid anchor offset for bucket width `width`:
    /// `session_open mod K`, in minutes.
    ///
    /// Flooring `(ts_local - anchor)` to a K-minute grid and adding the anchor
    /// back aligns bucket boundaries with session open instead of midnight.
    pub fn anchor_offset(&self, width: BucketWidth) -> u32 {
        self.open_minute() % width.minutes()
    }
}

impl Default for SessionWindow {
    fn default() -> Self {
        Self::us_equities_rth()
    }
}

/// Configuration of the realized-volatility pipeline.
///
/// Describes the transform only; input and output locations are arguments of
/// the file-level entry points. All settings are explicit — nothing is read
/// from the process environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RvConfig {
    widths: Vec<BucketWidth>,
    session: SessionWindow,
    timezone: Tz,
    trading_days_per_year: u16,
}

impl Default for RvConfig {
    fn default() -> Self {
        let widths = [1, 5, 15, 30]
            .into_iter()
            .map(|k| BucketWidth::new(k).expect("default widths are valid"))
            .collect();
        Self {
            widths,
            session: SessionWindow::default(),
            timezone: Tz::America__New_York,
            trading_days_per_year: 252,
        }
    }
}

impl RvConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the set of bucket widths to compute.
    ///
    /// # Errors
    /// Returns an error if the set is empty, contains a duplicate, or any
    /// width is out of range.
    pub fn with_widths(self, minutes: impl IntoIterator<Item = u32>) -> RvResult<Self> {
        let widths = minutes
            .into_iter()
            .map(BucketWidth::new)
            .collect::<RvResult<Vec<_>>>()?;

        if widths.is_empty() {
            return Err(
                ConfigError::InvalidWidthSet("at least one bucket width is required".to_string())
                    .into(),
            );
        }
        if let Some(dup) = widths.iter().duplicates().next() {
            return Err(ConfigError::InvalidWidthSet(format!(
                "duplicate bucket width: {}m",
                dup.minutes()
            ))
            .into());
        }

        Ok(Self { widths, ..self })
    }

    pub fn with_session(self, session: SessionWindow) -> Self {
        Self { session, ..self }
    }

    pub fn with_timezone(self, timezone: Tz) -> Self {
        Self { timezone, ..self }
    }

    /// Sets the exchange timezone from an IANA identifier such as
    /// `"America/New_York"`.
    pub fn with_timezone_name(self, name: &str) -> RvResult<Self> {
        let timezone = name
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(name.to_string()))?;
        Ok(Self { timezone, ..self })
    }

    pub fn with_trading_days_per_year(self, trading_days_per_year: u16) -> Self {
        Self {
            trading_days_per_year,
            ..self
        }
    }

    pub fn widths(&self) -> &[BucketWidth] {
        &self.widths
    }

    pub fn session(&self) -> SessionWindow {
        self.session
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn trading_days_per_year(&self) -> u16 {
        self.trading_days_per_year
    }

    /// The variance annualization factor for bucket width `width`.
    ///
    /// `rv` is a mean squared return per K-minute bucket, so the number of
    /// such periods in a year is
    /// `trading_days_per_year * minutes_per_session / K`.
    pub fn annualization_factor(&self, width: BucketWidth) -> f64 {
        f64::from(self.trading_days_per_year) * f64::from(self.session.minutes())
            / f64::from(width.minutes())
    }
}
