pub mod config;
pub mod indicators;
pub mod machine;
pub mod signal;

pub use config::{SignalVariant, StrategyFileConfig, StrategyParams};
pub use indicators::{IndicatorSet, IndicatorSnapshot, Lookback};
pub use machine::{PendingOrder, SignalStrategy, StrategyState};

use common::{Bar, BrokerEvent, OrderGateway};

/// All strategy implementations must satisfy this trait.
pub trait Strategy: Send {
    /// Human-readable name of this strategy instance.
    fn name(&self) -> &str;

    /// Evaluate one bar and optionally submit an order through `gateway`.
    ///
    /// Called once per bar, after every broker notification due before the bar
    /// has been delivered through `handle_event`.
    fn on_bar(
        &mut self,
        bar: &Bar,
        indicators: &IndicatorSnapshot<'_>,
        gateway: &mut dyn OrderGateway,
    );

    /// Single entry point for order and trade notifications.
    fn handle_event(&mut self, event: &BrokerEvent);
}
