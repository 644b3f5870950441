use std::{
    fs::File,
    path::PathBuf,
    sync::Once,
};

use chrono::TimeZone as _;
use chrono_tz::Tz;
use polars::{df, frame::DataFrame, prelude::ParquetWriter};

static INIT: Once = Once::new();

/// Installs a test tracing subscriber once per test binary. Controlled via
/// `RUST_LOG`, silent by default.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Epoch milliseconds of a New York wall-clock instant in January 2024
/// (EST, UTC-5).
pub fn ny_ms(day: u32, hour: u32, minute: u32) -> i64 {
    Tz::America__New_York
        .with_ymd_and_hms(2024, 1, day, hour, minute, 0)
        .unwrap()
        .timestamp_millis()
}

/// One day's raw bar frame in the acquisition-layer schema.
pub fn raw_frame(rows: &[(&str, f64, i64)]) -> DataFrame {
    let tickers: Vec<&str> = rows.iter().map(|r| r.0).collect();
    let closes: Vec<f64> = rows.iter().map(|r| r.1).collect();
    let ws: Vec<i64> = rows.iter().map(|r| r.2).collect();
    df![
        "ticker" => &tickers,
        "close" => &closes,
        "window_start" => &ws,
    ]
    .unwrap()
}

/// A per-test-process path under the system temp directory.
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("realvol-it-{}-{}", std::process::id(), name))
}

/// Writes a frame as a parquet fixture and returns its path.
pub fn write_parquet_fixture(mut df: DataFrame, name: &str) -> PathBuf {
    let path = temp_path(name);
    let file = File::create(&path).expect("failed to create fixture file");
    ParquetWriter::new(file)
        .finish(&mut df)
        .expect("failed to write fixture parquet");
    path
}
