use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use common::Result;

/// Portfolio value at the close of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Outcome of one backtest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BacktestReport {
    pub strategy: String,
    pub bars: usize,
    pub starting_value: f64,
    pub final_value: f64,
    pub orders_submitted: usize,
    pub orders_completed: usize,
    pub orders_failed: usize,
    pub trades_closed: usize,
    pub gross_pnl: f64,
    pub net_pnl: f64,
    #[serde(skip)]
    pub equity: Vec<EquityPoint>,
}

impl BacktestReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the equity curve as `timestamp,value` rows.
    pub fn write_equity_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["timestamp", "value"])?;
        for point in &self.equity {
            writer.write_record([point.timestamp.to_rfc3339(), format!("{:.4}", point.value)])?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl std::fmt::Display for BacktestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Strategy: {}", self.strategy)?;
        writeln!(f, "Bars: {}", self.bars)?;
        writeln!(f, "Starting Portfolio Value: {:.2}", self.starting_value)?;
        writeln!(f, "Final Portfolio Value: {:.2}", self.final_value)?;
        writeln!(
            f,
            "Orders: {} submitted, {} completed, {} canceled/margin/rejected",
            self.orders_submitted, self.orders_completed, self.orders_failed
        )?;
        write!(
            f,
            "Closed trades: {} (gross {:.2}, net {:.2})",
            self.trades_closed, self.gross_pnl, self.net_pnl
        )
    }
}
