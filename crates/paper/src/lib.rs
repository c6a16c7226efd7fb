use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use common::{
    Bar, BrokerEvent, Config, Execution, Order, OrderEvent, OrderGateway, OrderHandle, OrderSide,
    OrderStatus, TradeEvent,
};

/// Broker parameters. Built from the run `Config`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrokerConfig {
    pub cash: f64,
    /// Fraction of traded value charged on every fill.
    pub commission: f64,
    /// Units per order (fixed-size sizer).
    pub stake: f64,
    pub slippage_bps: f64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            cash: 1000.0,
            commission: 0.0,
            stake: 10.0,
            slippage_bps: 0.0,
        }
    }
}

impl From<&Config> for BrokerConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            cash: cfg.cash,
            commission: cfg.commission,
            stake: cfg.stake,
            slippage_bps: cfg.slippage_bps,
        }
    }
}

/// Ledger of the single traded asset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Holding {
    size: f64,
    avg_price: f64,
    /// Commission paid on the legs of the open trade.
    open_commission: f64,
}

/// Simulated broker for backtests.
///
/// Orders queue on submission and fill at the next bar's open with
/// configurable slippage. Notifications are buffered until the driver drains
/// them. No short selling: a sell larger than the holding is rejected.
pub struct PaperBroker {
    config: BrokerConfig,
    cash: f64,
    holding: Holding,
    queued: Vec<Order>,
    events: Vec<BrokerEvent>,
    last_price: Option<f64>,
    clock: DateTime<Utc>,
}

impl PaperBroker {
    pub fn new(config: BrokerConfig) -> Self {
        info!(
            cash = config.cash,
            commission = config.commission,
            stake = config.stake,
            slippage_bps = config.slippage_bps,
            "PaperBroker initialized"
        );
        Self {
            config,
            cash: config.cash,
            holding: Holding::default(),
            queued: Vec::new(),
            events: Vec::new(),
            last_price: None,
            clock: DateTime::<Utc>::default(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Units currently held.
    pub fn position_size(&self) -> f64 {
        self.holding.size
    }

    pub fn has_queued_orders(&self) -> bool {
        !self.queued.is_empty()
    }

    /// Cash plus the holding marked at the last known close.
    pub fn value(&self) -> f64 {
        self.cash + self.holding.size * self.last_price.unwrap_or(self.holding.avg_price)
    }

    /// Record the bar's close for valuation.
    pub fn mark(&mut self, bar: &Bar) {
        self.clock = bar.timestamp;
        self.last_price = Some(bar.close);
    }

    /// Fill every queued order at `bar.open`.
    pub fn execute_pending(&mut self, bar: &Bar) {
        self.clock = bar.timestamp;
        for order in std::mem::take(&mut self.queued) {
            self.execute(order, bar.open);
        }
    }

    /// Cancel every queued order, e.g. when the data runs out.
    pub fn cancel_pending(&mut self, at: DateTime<Utc>) {
        self.clock = at;
        for order in std::mem::take(&mut self.queued) {
            debug!(order = %order.id, side = %order.side, "Order canceled");
            self.push_order_event(&order, OrderStatus::Canceled, None);
        }
    }

    /// Take all buffered notifications, oldest first.
    pub fn drain_events(&mut self) -> Vec<BrokerEvent> {
        std::mem::take(&mut self.events)
    }

    fn execute(&mut self, order: Order, open: f64) {
        // Apply slippage: buys pay more, sells receive less
        let slip = self.config.slippage_bps / 10_000.0;
        let price = match order.side {
            OrderSide::Buy => open * (1.0 + slip),
            OrderSide::Sell => open * (1.0 - slip),
        };
        let value = price * order.quantity;
        let commission = value * self.config.commission;

        match order.side {
            OrderSide::Buy => {
                if value + commission > self.cash {
                    warn!(
                        order = %order.id,
                        needed = value + commission,
                        cash = self.cash,
                        "Insufficient cash, order margined"
                    );
                    self.push_order_event(&order, OrderStatus::Margin, None);
                    return;
                }
                self.cash -= value + commission;
                let opened = self.holding.size == 0.0;
                let new_size = self.holding.size + order.quantity;
                self.holding.avg_price =
                    (self.holding.avg_price * self.holding.size + value) / new_size;
                self.holding.size = new_size;
                self.holding.open_commission += commission;

                self.push_order_event(&order, OrderStatus::Completed, Some(Execution {
                    price,
                    size: order.quantity,
                    value,
                    commission,
                }));
                if opened {
                    self.events.push(BrokerEvent::Trade(TradeEvent {
                        gross_pnl: 0.0,
                        net_pnl: -commission,
                        is_closed: false,
                        timestamp: self.clock,
                    }));
                }
            }
            OrderSide::Sell => {
                if order.quantity > self.holding.size {
                    warn!(
                        order = %order.id,
                        quantity = order.quantity,
                        held = self.holding.size,
                        "Sell exceeds holding, order rejected"
                    );
                    self.push_order_event(&order, OrderStatus::Rejected, None);
                    return;
                }
                self.cash += value - commission;
                let entry = self.holding.avg_price;
                let entry_commission = self.holding.open_commission;
                self.holding.size -= order.quantity;

                self.push_order_event(&order, OrderStatus::Completed, Some(Execution {
                    price,
                    size: order.quantity,
                    value,
                    commission,
                }));

                let gross = (price - entry) * order.quantity;
                if self.holding.size == 0.0 {
                    let net = gross - entry_commission - commission;
                    self.holding = Holding::default();
                    self.events.push(BrokerEvent::Trade(TradeEvent {
                        gross_pnl: gross,
                        net_pnl: net,
                        is_closed: true,
                        timestamp: self.clock,
                    }));
                } else {
                    self.holding.open_commission += commission;
                }
            }
        }

        debug!(
            order = %order.id,
            side = %order.side,
            open = open,
            fill = price,
            qty = order.quantity,
            cash = self.cash,
            "Paper fill simulated"
        );
    }

    fn push_order_event(
        &mut self,
        order: &Order,
        status: OrderStatus,
        execution: Option<Execution>,
    ) {
        self.events.push(BrokerEvent::Order(OrderEvent {
            order_id: order.id.clone(),
            side: order.side,
            status,
            execution,
            timestamp: self.clock,
        }));
    }
}

impl OrderGateway for PaperBroker {
    fn submit(&mut self, side: OrderSide) -> OrderHandle {
        let order = Order::market(side, self.config.stake);
        debug!(order = %order.id, side = %side, qty = order.quantity, "Order queued");
        self.push_order_event(&order, OrderStatus::Submitted, None);
        self.push_order_event(&order, OrderStatus::Accepted, None);
        let handle = order.handle();
        self.queued.push(order);
        handle
    }
}
