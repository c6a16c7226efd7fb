use crate::{Error, Result};

/// Run configuration loaded from environment variables at startup.
/// Every value has a default; CLI flags override what is read here.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // Data
    pub data_path: String,

    // Strategy config file path
    pub strategy_config_path: String,

    // Broker
    pub cash: f64,
    /// Fraction of traded value charged per fill (0.001 = 0.1%).
    pub commission: f64,
    /// Fixed number of units per order.
    pub stake: f64,
    pub slippage_bps: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: "data/sh.000003.csv".to_string(),
            strategy_config_path: "config/strategy.toml".to_string(),
            cash: 1000.0,
            commission: 0.0,
            stake: 10.0,
            slippage_bps: 0.0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    /// Loads `.env` if present. Fails on values that do not parse.
    pub fn from_env() -> Result<Self> {
        // a missing .env is fine
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(error = %e, "No .env loaded");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let cfg = Config {
            data_path: lookup("BACKTEST_DATA_PATH").unwrap_or(defaults.data_path),
            strategy_config_path: lookup("STRATEGY_CONFIG_PATH")
                .unwrap_or(defaults.strategy_config_path),
            cash: parse_f64(&lookup, "BROKER_CASH")?.unwrap_or(defaults.cash),
            commission: parse_f64(&lookup, "BROKER_COMMISSION")?.unwrap_or(defaults.commission),
            stake: parse_f64(&lookup, "SIZER_STAKE")?.unwrap_or(defaults.stake),
            slippage_bps: parse_f64(&lookup, "PAPER_SLIPPAGE_BPS")?
                .unwrap_or(defaults.slippage_bps),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.cash.is_finite() && self.cash > 0.0) {
            return Err(Error::Config(format!("BROKER_CASH must be > 0, got {}", self.cash)));
        }
        if !(self.commission.is_finite() && (0.0..1.0).contains(&self.commission)) {
            return Err(Error::Config(format!(
                "BROKER_COMMISSION must be in [0, 1), got {}",
                self.commission
            )));
        }
        if !(self.stake.is_finite() && self.stake > 0.0) {
            return Err(Error::Config(format!("SIZER_STAKE must be > 0, got {}", self.stake)));
        }
        if !(self.slippage_bps.is_finite() && self.slippage_bps >= 0.0) {
            return Err(Error::Config(format!(
                "PAPER_SLIPPAGE_BPS must be >= 0, got {}",
                self.slippage_bps
            )));
        }
        Ok(())
    }
}

fn parse_f64<F>(lookup: &F, key: &str) -> Result<Option<f64>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<f64>().map(Some).map_err(|_| {
            Error::Config(format!("{key} must be a number, got '{raw}'"))
        }),
    }
}
