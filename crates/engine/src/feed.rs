use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::{info, warn};

use common::{Bar, Error, Result};

/// Header names of the OHLCV columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub date: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            date: "date".into(),
            open: "open".into(),
            high: "high".into(),
            low: "low".into(),
            close: "close".into(),
            volume: "volume".into(),
        }
    }
}

/// Where the bars come from and which dates to keep.
#[derive(Debug, Clone, Default)]
pub struct DataConfig {
    pub path: PathBuf,
    pub columns: ColumnMap,
    /// Inclusive lower bound on the bar date.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the bar date.
    pub to: Option<NaiveDate>,
}

impl DataConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Load bars from a headed CSV file, oldest first.
pub fn load_csv(cfg: &DataConfig) -> Result<Vec<Bar>> {
    let file = File::open(&cfg.path).map_err(|e| {
        Error::Data(format!("failed to open OHLCV CSV {}: {e}", cfg.path.display()))
    })?;
    let bars = read_bars(file, cfg)?;
    info!(path = %cfg.path.display(), bars = bars.len(), "Loaded bars");
    Ok(bars)
}

/// Parse bars from any reader. `load_csv` uses a file.
pub fn read_bars<R: Read>(reader: R, cfg: &DataConfig) -> Result<Vec<Bar>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = reader.headers()?.clone();

    let idx = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::Data(format!("missing column '{name}' in CSV header")))
    };
    let cols = [
        idx(&cfg.columns.date)?,
        idx(&cfg.columns.open)?,
        idx(&cfg.columns.high)?,
        idx(&cfg.columns.low)?,
        idx(&cfg.columns.close)?,
        idx(&cfg.columns.volume)?,
    ];

    let mut bars = Vec::new();
    let mut invalid = 0usize;

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        // header is line 1
        let line = row + 2;
        let field = |i: usize| record.get(cols[i]).unwrap_or("");

        let timestamp = parse_timestamp(field(0))
            .ok_or_else(|| Error::Data(format!("line {line}: unparseable date '{}'", field(0))))?;

        let date = timestamp.date_naive();
        if cfg.from.is_some_and(|from| date < from) || cfg.to.is_some_and(|to| date > to) {
            continue;
        }

        let price = |i: usize, name: &str| -> Result<f64> {
            field(i).parse::<f64>().map_err(|_| {
                Error::Data(format!("line {line}: unparseable {name} '{}'", field(i)))
            })
        };
        let bar = Bar {
            timestamp,
            open: price(1, "open")?,
            high: price(2, "high")?,
            low: price(3, "low")?,
            close: price(4, "close")?,
            volume: price(5, "volume")?,
        };

        if !is_sane(&bar) {
            invalid += 1;
            continue;
        }
        bars.push(bar);
    }

    if invalid > 0 {
        warn!(rows = invalid, "Skipped rows with non-positive or non-finite prices");
    }
    if bars.windows(2).any(|w| w[1].timestamp < w[0].timestamp) {
        warn!("Bars out of order, sorting by timestamp");
        bars.sort_by_key(|b| b.timestamp);
    }
    if bars.is_empty() {
        return Err(Error::Data("no bars left after filtering".into()));
    }
    Ok(bars)
}

/// Prices finite and positive, volume finite and non-negative.
fn is_sane(bar: &Bar) -> bool {
    let price_ok = |p: f64| p.is_finite() && p > 0.0;
    price_ok(bar.open)
        && price_ok(bar.high)
        && price_ok(bar.low)
        && price_ok(bar.close)
        && bar.volume.is_finite()
        && bar.volume >= 0.0
}

/// Accepts `YYYY-M-D` / `YYYY/M/D`, optionally followed by `HH:MM:SS`. Read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}
