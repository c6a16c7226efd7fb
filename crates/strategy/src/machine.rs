use tracing::{debug, info, warn};

use common::{
    Bar, BrokerEvent, OrderEvent, OrderGateway, OrderHandle, OrderId, OrderSide, OrderStatus,
    Position, TradeEvent,
};

use crate::config::StrategyParams;
use crate::indicators::IndicatorSnapshot;
use crate::signal::{self, Bias};
use crate::Strategy;

/// The single order a strategy may have outstanding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOrder {
    pub id: OrderId,
    pub side: OrderSide,
}

impl From<OrderHandle> for PendingOrder {
    fn from(handle: OrderHandle) -> Self {
        Self {
            id: handle.id,
            side: handle.side,
        }
    }
}

/// Where the strategy stands. Waiting states carry the order they wait on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyState {
    Flat,
    PendingEntry(PendingOrder),
    InPosition,
    PendingExit(PendingOrder),
}

impl StrategyState {
    pub fn pending(&self) -> Option<&PendingOrder> {
        match self {
            StrategyState::PendingEntry(p) | StrategyState::PendingExit(p) => Some(p),
            StrategyState::Flat | StrategyState::InPosition => None,
        }
    }
}

impl std::fmt::Display for StrategyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyState::Flat => write!(f, "flat"),
            StrategyState::PendingEntry(_) => write!(f, "pending_entry"),
            StrategyState::InPosition => write!(f, "in_position"),
            StrategyState::PendingExit(_) => write!(f, "pending_exit"),
        }
    }
}

/// Long-only signal strategy: one order in flight at most, entries and exits
/// driven by the configured `SignalVariant`.
pub struct SignalStrategy {
    params: StrategyParams,
    state: StrategyState,
    position: Position,
    bars_seen: usize,
    /// Bar count at the last fill.
    bar_executed: Option<usize>,
}

impl SignalStrategy {
    pub fn new(params: StrategyParams) -> Self {
        info!(name = %params.name, variant = %params.variant, "Strategy created");
        Self {
            params,
            state: StrategyState::Flat,
            position: Position::default(),
            bars_seen: 0,
            bar_executed: None,
        }
    }

    pub fn state(&self) -> &StrategyState {
        &self.state
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn bar_executed(&self) -> Option<usize> {
        self.bar_executed
    }

    fn on_order(&mut self, event: &OrderEvent) {
        let date = event.timestamp.format("%Y-%m-%d");

        if !event.status.is_terminal() {
            debug!(%date, order = %event.order_id, status = %event.status, "Order in flight");
            return;
        }

        let Some(pending) = self.state.pending() else {
            warn!(
                %date,
                order = %event.order_id,
                status = %event.status,
                "Notification with no pending order"
            );
            return;
        };
        if pending.id != event.order_id {
            warn!(
                %date,
                order = %event.order_id,
                expected = %pending.id,
                "Notification for an unknown order"
            );
            return;
        }

        let next = match (&self.state, event.status, event.execution) {
            (_, OrderStatus::Completed, None) => {
                warn!(
                    %date,
                    order = %event.order_id,
                    "Completed order without execution details, ignored"
                );
                return;
            }
            (StrategyState::PendingEntry(_), OrderStatus::Completed, Some(exec)) => {
                info!(
                    %date,
                    price = exec.price,
                    cost = exec.value,
                    comm = exec.commission,
                    "BUY EXECUTED"
                );
                self.position = Position {
                    size: exec.size,
                    entry_price: exec.price,
                    entry_commission: exec.commission,
                };
                self.bar_executed = Some(self.bars_seen);
                StrategyState::InPosition
            }
            (StrategyState::PendingExit(_), OrderStatus::Completed, Some(exec)) => {
                info!(
                    %date,
                    price = exec.price,
                    cost = exec.value,
                    comm = exec.commission,
                    "SELL EXECUTED"
                );
                self.position = Position::default();
                self.bar_executed = Some(self.bars_seen);
                StrategyState::Flat
            }
            (StrategyState::PendingEntry(_), _, _) => {
                warn!(%date, status = %event.status, "Order Canceled/Margin/Rejected");
                StrategyState::Flat
            }
            (StrategyState::PendingExit(_), _, _) => {
                warn!(%date, status = %event.status, "Order Canceled/Margin/Rejected");
                StrategyState::InPosition
            }
            (StrategyState::Flat | StrategyState::InPosition, _, _) => return,
        };
        self.state = next;
    }

    fn on_trade(&self, trade: &TradeEvent) {
        if !trade.is_closed {
            return;
        }
        info!(
            date = %trade.timestamp.format("%Y-%m-%d"),
            gross = trade.gross_pnl,
            net = trade.net_pnl,
            "OPERATION PROFIT"
        );
    }
}

impl Strategy for SignalStrategy {
    fn name(&self) -> &str {
        &self.params.name
    }

    fn on_bar(
        &mut self,
        bar: &Bar,
        indicators: &IndicatorSnapshot<'_>,
        gateway: &mut dyn OrderGateway,
    ) {
        self.bars_seen += 1;
        let date = bar.date();
        info!(%date, close = bar.close, "Close");

        if self.state.pending().is_some() {
            debug!(%date, state = %self.state, "Order pending, skipping bar");
            return;
        }

        let Some(bias) =
            signal::evaluate(self.params.variant, bar, indicators, self.params.hist_lookback)
        else {
            debug!(%date, "Insufficient history, no signal");
            return;
        };

        let side = match (&self.state, bias) {
            (StrategyState::Flat, Bias::Bullish) => OrderSide::Buy,
            (StrategyState::InPosition, Bias::Bearish) => OrderSide::Sell,
            _ => return,
        };

        info!(%date, close = bar.close, "{side} CREATE");
        let pending = PendingOrder::from(gateway.submit(side));
        self.state = match side {
            OrderSide::Buy => StrategyState::PendingEntry(pending),
            OrderSide::Sell => StrategyState::PendingExit(pending),
        };
    }

    fn handle_event(&mut self, event: &BrokerEvent) {
        match event {
            BrokerEvent::Order(order) => self.on_order(order),
            BrokerEvent::Trade(trade) => self.on_trade(trade),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::Lookback;
    use chrono::{DateTime, TimeZone, Utc};
    use common::Execution;

    #[derive(Default)]
    struct RecordingGateway {
        submitted: Vec<OrderHandle>,
    }

    impl OrderGateway for RecordingGateway {
        fn submit(&mut self, side: OrderSide) -> OrderHandle {
            let handle = OrderHandle {
                id: OrderId::from(format!("o{}", self.submitted.len() + 1).as_str()),
                side,
            };
            self.submitted.push(handle.clone());
            handle
        }
    }

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2000, 1, 4, 0, 0, 0).unwrap()
    }

    fn bar(close: f64) -> Bar {
        Bar {
            timestamp: ts(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100.0,
        }
    }

    fn feed(s: &mut SignalStrategy, gw: &mut RecordingGateway, close: f64, sma: f64) {
        let hist = Lookback::new(3);
        let snap = IndicatorSnapshot {
            sma: Some(sma),
            macd: None,
            histogram: &hist,
        };
        s.on_bar(&bar(close), &snap, gw);
    }

    fn order_event(handle: &OrderHandle, status: OrderStatus) -> BrokerEvent {
        let execution = (status == OrderStatus::Completed).then_some(Execution {
            price: 12.0,
            size: 10.0,
            value: 120.0,
            commission: 0.12,
        });
        BrokerEvent::Order(OrderEvent {
            order_id: handle.id.clone(),
            side: handle.side,
            status,
            execution,
            timestamp: ts(),
        })
    }

    fn crossover() -> SignalStrategy {
        SignalStrategy::new(StrategyParams::default())
    }

    #[test]
    fn crossover_determinism() {
        let mut s = crossover();
        let mut gw = RecordingGateway::default();

        feed(&mut s, &mut gw, 10.0, 11.0);
        assert!(gw.submitted.is_empty());
        assert_eq!(s.state(), &StrategyState::Flat);

        feed(&mut s, &mut gw, 12.0, 11.0);
        assert_eq!(gw.submitted.len(), 1);
        assert_eq!(gw.submitted[0].side, OrderSide::Buy);
        assert!(matches!(s.state(), StrategyState::PendingEntry(_)));
    }

    #[test]
    fn equality_holds_position() {
        let mut s = crossover();
        let mut gw = RecordingGateway::default();
        feed(&mut s, &mut gw, 11.0, 11.0);
        assert!(gw.submitted.is_empty());
    }

    #[test]
    fn completed_buy_then_sell_round_trip() {
        let mut s = crossover();
        let mut gw = RecordingGateway::default();

        feed(&mut s, &mut gw, 12.0, 11.0);
        let buy = gw.submitted[0].clone();
        s.handle_event(&order_event(&buy, OrderStatus::Submitted));
        s.handle_event(&order_event(&buy, OrderStatus::Accepted));
        assert!(matches!(s.state(), StrategyState::PendingEntry(_)));

        s.handle_event(&order_event(&buy, OrderStatus::Completed));
        assert_eq!(s.state(), &StrategyState::InPosition);
        assert_eq!(s.position().entry_price, 12.0);
        assert_eq!(s.position().entry_commission, 0.12);
        assert_eq!(s.bar_executed(), Some(1));

        feed(&mut s, &mut gw, 10.0, 11.0);
        let sell = gw.submitted[1].clone();
        assert_eq!(sell.side, OrderSide::Sell);
        assert!(matches!(s.state(), StrategyState::PendingExit(_)));

        s.handle_event(&order_event(&sell, OrderStatus::Completed));
        assert_eq!(s.state(), &StrategyState::Flat);
        assert!(s.position().is_flat());
    }

    #[test]
    fn completion_without_execution_is_ignored() {
        let mut s = crossover();
        let mut gw = RecordingGateway::default();
        feed(&mut s, &mut gw, 12.0, 11.0);
        let buy = gw.submitted[0].clone();

        s.handle_event(&BrokerEvent::Order(OrderEvent {
            order_id: buy.id.clone(),
            side: buy.side,
            status: OrderStatus::Completed,
            execution: None,
            timestamp: ts(),
        }));
        assert!(matches!(s.state(), StrategyState::PendingEntry(_)));
        assert!(s.position().is_flat());
        assert_eq!(s.bar_executed(), None);

        s.handle_event(&order_event(&buy, OrderStatus::Completed));
        assert_eq!(s.state(), &StrategyState::InPosition);
        assert_eq!(s.position().size, 10.0);
    }

    #[test]
    fn rejected_entry_reverts_to_flat() {
        for status in [OrderStatus::Canceled, OrderStatus::Margin, OrderStatus::Rejected] {
            let mut s = crossover();
            let mut gw = RecordingGateway::default();
            feed(&mut s, &mut gw, 12.0, 11.0);
            s.handle_event(&order_event(&gw.submitted[0], status));
            assert_eq!(s.state(), &StrategyState::Flat, "status {status}");
            assert!(s.state().pending().is_none());
        }
    }

    #[test]
    fn rejected_exit_reverts_to_in_position() {
        let mut s = crossover();
        let mut gw = RecordingGateway::default();
        feed(&mut s, &mut gw, 12.0, 11.0);
        s.handle_event(&order_event(&gw.submitted[0], OrderStatus::Completed));
        feed(&mut s, &mut gw, 10.0, 11.0);
        s.handle_event(&order_event(&gw.submitted[1], OrderStatus::Margin));
        assert_eq!(s.state(), &StrategyState::InPosition);
        assert_eq!(s.position().size, 10.0);
    }

    #[test]
    fn pending_order_blocks_new_submissions() {
        let mut s = crossover();
        let mut gw = RecordingGateway::default();
        feed(&mut s, &mut gw, 12.0, 11.0);
        let before = s.state().clone();
        for close in [20.0, 1.0, 11.0] {
            feed(&mut s, &mut gw, close, 11.0);
        }
        assert_eq!(gw.submitted.len(), 1);
        assert_eq!(s.state(), &before);
    }

    #[test]
    fn notification_for_other_order_is_ignored() {
        let mut s = crossover();
        let mut gw = RecordingGateway::default();
        feed(&mut s, &mut gw, 12.0, 11.0);
        let stranger = OrderHandle {
            id: OrderId::from("elsewhere"),
            side: OrderSide::Buy,
        };
        s.handle_event(&order_event(&stranger, OrderStatus::Completed));
        assert!(matches!(s.state(), StrategyState::PendingEntry(_)));
    }

    #[test]
    fn histogram_variant_buys_above_mean() {
        let mut s = SignalStrategy::new(StrategyParams {
            variant: crate::SignalVariant::MacdHistMeanRevert,
            ..StrategyParams::default()
        });
        let mut gw = RecordingGateway::default();
        let mut hist = Lookback::new(3);

        for v in [1.0, 2.0] {
            hist.push(v);
            let snap = IndicatorSnapshot { sma: None, macd: None, histogram: &hist };
            s.on_bar(&bar(10.0), &snap, &mut gw);
            assert!(gw.submitted.is_empty(), "must not fire before 3 values");
        }

        hist.push(3.0);
        let snap = IndicatorSnapshot { sma: None, macd: None, histogram: &hist };
        s.on_bar(&bar(10.0), &snap, &mut gw);
        assert_eq!(gw.submitted.len(), 1);
        assert_eq!(gw.submitted[0].side, OrderSide::Buy);
    }

    #[test]
    fn closed_trade_does_not_change_state() {
        let mut s = crossover();
        s.handle_event(&BrokerEvent::Trade(TradeEvent {
            gross_pnl: 5.0,
            net_pnl: 4.5,
            is_closed: true,
            timestamp: ts(),
        }));
        assert_eq!(s.state(), &StrategyState::Flat);
    }
}
