use std::path::Path;

use serde::{Deserialize, Serialize};

use common::{Error, Result};

/// Top-level strategy config file (TOML).
///
/// Example `config/strategy.toml`:
/// ```toml
/// [strategy]
/// name = "SMA 15 crossover"
/// variant = "crossover"
/// ma_period = 15
///
/// # only read by the MACD histogram variant
/// hist_lookback = 3
/// macd_fast = 12
/// macd_slow = 26
/// macd_signal = 9
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    #[serde(default)]
    pub strategy: StrategyParams,
}

/// Which comparison drives entries and exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalVariant {
    /// Close against its simple moving average.
    #[default]
    Crossover,
    /// MACD histogram against its own short mean.
    MacdHistMeanRevert,
}

impl std::fmt::Display for SignalVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalVariant::Crossover => write!(f, "crossover"),
            SignalVariant::MacdHistMeanRevert => write!(f, "macd_hist_mean_revert"),
        }
    }
}

/// Immutable strategy parameters, fixed at construction.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StrategyParams {
    /// Human-readable name shown in logs and reports.
    pub name: String,
    pub variant: SignalVariant,
    /// SMA period for the crossover variant.
    pub ma_period: usize,
    /// Number of histogram values (current bar included) averaged by the
    /// mean-reversion variant.
    pub hist_lookback: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            name: "signal".to_string(),
            variant: SignalVariant::Crossover,
            ma_period: 15,
            hist_lookback: 3,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

impl StrategyParams {
    pub fn validate(&self) -> Result<()> {
        if self.ma_period == 0 {
            return Err(Error::Config("ma_period must be >= 1".into()));
        }
        if self.hist_lookback < 2 {
            return Err(Error::Config(format!(
                "hist_lookback must be >= 2, got {}",
                self.hist_lookback
            )));
        }
        if self.macd_fast == 0 || self.macd_fast >= self.macd_slow {
            return Err(Error::Config(format!(
                "MACD fast period must be in 1..slow, got fast={} slow={}",
                self.macd_fast, self.macd_slow
            )));
        }
        if self.macd_signal == 0 {
            return Err(Error::Config("macd_signal must be >= 1".into()));
        }
        Ok(())
    }
}

impl StrategyFileConfig {
    /// Load from a TOML file and validate the parameters.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "failed to read strategy config at '{}': {e}",
                path.display()
            ))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let cfg: StrategyFileConfig = toml::from_str(content)?;
        cfg.strategy.validate()?;
        Ok(cfg)
    }
}
