pub mod backtest;
pub mod feed;
pub mod report;

pub use backtest::Backtest;
pub use feed::{load_csv, read_bars, ColumnMap, DataConfig};
pub use report::{BacktestReport, EquityPoint};
