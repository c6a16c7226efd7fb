use tracing::{info, warn};

use common::{Bar, BrokerEvent, Error, OrderStatus, Result};
use paper::{BrokerConfig, PaperBroker};
use strategy::{IndicatorSet, SignalStrategy, Strategy, StrategyParams};

use crate::report::{BacktestReport, EquityPoint};

/// Drives one strategy over a historical bar series.
///
/// Per bar, in order: queued orders fill at the open, broker notifications
/// reach the strategy, indicators and valuation take the close, then the
/// strategy sees the bar. Nothing runs concurrently with a bar.
pub struct Backtest {
    strategy: Box<dyn Strategy>,
    broker: PaperBroker,
    indicators: IndicatorSet,
    report: BacktestReport,
}

impl Backtest {
    pub fn new(strategy: Box<dyn Strategy>, broker: PaperBroker, indicators: IndicatorSet) -> Self {
        let report = BacktestReport {
            strategy: strategy.name().to_string(),
            starting_value: broker.value(),
            ..BacktestReport::default()
        };
        Self {
            strategy,
            broker,
            indicators,
            report,
        }
    }

    /// The usual wiring: a `SignalStrategy` with indicators sized from the same params.
    pub fn signal(params: StrategyParams, broker: BrokerConfig) -> Self {
        let indicators = IndicatorSet::new(&params);
        Self::new(
            Box::new(SignalStrategy::new(params)),
            PaperBroker::new(broker),
            indicators,
        )
    }

    /// Run every bar and return the report.
    pub fn run(mut self, bars: &[Bar]) -> Result<BacktestReport> {
        let Some(last) = bars.last() else {
            return Err(Error::Data("backtest needs at least one bar".into()));
        };

        info!(
            strategy = %self.report.strategy,
            bars = bars.len(),
            "Starting Portfolio Value: {:.2}",
            self.report.starting_value
        );

        for bar in bars {
            self.step(bar);
        }

        if self.broker.has_queued_orders() {
            warn!("Data exhausted with an order still queued, canceling");
            self.broker.cancel_pending(last.timestamp);
            self.dispatch();
        }

        self.report.bars = bars.len();
        self.report.final_value = self.broker.value();
        info!(
            strategy = %self.report.strategy,
            trades = self.report.trades_closed,
            "Final Portfolio Value: {:.2}",
            self.report.final_value
        );
        Ok(self.report)
    }

    fn step(&mut self, bar: &Bar) {
        self.broker.execute_pending(bar);
        self.dispatch();

        self.indicators.update(bar.close);
        self.broker.mark(bar);

        let snapshot = self.indicators.snapshot();
        self.strategy.on_bar(bar, &snapshot, &mut self.broker);

        self.report.equity.push(EquityPoint {
            timestamp: bar.timestamp,
            value: self.broker.value(),
        });
    }

    /// Hand every buffered broker notification to the strategy, oldest first.
    fn dispatch(&mut self) {
        for event in self.broker.drain_events() {
            self.record(&event);
            self.strategy.handle_event(&event);
        }
    }

    fn record(&mut self, event: &BrokerEvent) {
        match event {
            BrokerEvent::Order(order) => match order.status {
                OrderStatus::Submitted => self.report.orders_submitted += 1,
                OrderStatus::Accepted => {}
                OrderStatus::Completed => self.report.orders_completed += 1,
                OrderStatus::Canceled | OrderStatus::Margin | OrderStatus::Rejected => {
                    self.report.orders_failed += 1
                }
            },
            BrokerEvent::Trade(trade) if trade.is_closed => {
                self.report.trades_closed += 1;
                self.report.gross_pnl += trade.gross_pnl;
                self.report.net_pnl += trade.net_pnl;
            }
            BrokerEvent::Trade(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2000, 1, 3, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                timestamp: start + Duration::days(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 1.0,
            })
            .collect()
    }

    fn backtest(ma_period: usize, cash: f64) -> Backtest {
        Backtest::signal(
            StrategyParams {
                ma_period,
                ..StrategyParams::default()
            },
            BrokerConfig {
                cash,
                ..BrokerConfig::default()
            },
        )
    }

    #[test]
    fn empty_series_is_an_error() {
        assert!(backtest(2, 1000.0).run(&[]).is_err());
    }

    #[test]
    fn flat_prices_never_trade() {
        let report = backtest(2, 1000.0).run(&bars(&[10.0; 10])).unwrap();
        assert_eq!(report.orders_submitted, 0);
        assert_eq!(report.final_value, 1000.0);
        assert_eq!(report.equity.len(), 10);
    }

    #[test]
    fn rise_then_fall_closes_one_trade() {
        // sma(2): bar 3 close 12 > 11 → buy fills at bar 4 open 13;
        // bar 5 close 10 < 11.5 → sell fills at bar 6 open 9.
        let series = bars(&[10.0, 10.0, 12.0, 13.0, 10.0, 9.0, 9.0]);
        let report = backtest(2, 1000.0).run(&series).unwrap();
        assert_eq!(report.orders_submitted, 2);
        assert_eq!(report.orders_completed, 2);
        assert_eq!(report.trades_closed, 1);
        assert!((report.gross_pnl - (9.0 - 13.0) * 10.0).abs() < 1e-9);
        assert!((report.final_value - 960.0).abs() < 1e-9);
    }

    #[test]
    fn order_left_at_end_is_canceled() {
        let series = bars(&[10.0, 10.0, 12.0]);
        let report = backtest(2, 1000.0).run(&series).unwrap();
        assert_eq!(report.orders_submitted, 1);
        assert_eq!(report.orders_failed, 1);
        assert_eq!(report.orders_completed, 0);
    }

    #[test]
    fn insufficient_cash_margins_and_retries() {
        let series = bars(&[10.0, 10.0, 12.0, 13.0, 14.0]);
        let report = backtest(2, 50.0).run(&series).unwrap();
        assert_eq!(report.orders_completed, 0);
        assert!(report.orders_failed >= 1);
        assert_eq!(report.final_value, 50.0);
    }
}
