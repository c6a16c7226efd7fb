use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV step of historical market data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Calendar date of the bar, as it appears in log lines.
    pub fn date(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }
}

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Opaque identity of a submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a gateway hands back on submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHandle {
    pub id: OrderId,
    pub side: OrderSide,
}

/// A market order queued at a simulated venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: OrderSide,
    pub quantity: f64,
}

impl Order {
    pub fn market(side: OrderSide, quantity: f64) -> Self {
        Self {
            id: OrderId::new(),
            side,
            quantity,
        }
    }

    pub fn handle(&self) -> OrderHandle {
        OrderHandle {
            id: self.id.clone(),
            side: self.side,
        }
    }
}

/// Lifecycle status reported for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Submitted,
    Accepted,
    Completed,
    Canceled,
    Margin,
    Rejected,
}

impl OrderStatus {
    /// Terminal statuses end the order's life; exactly one arrives per order.
    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Submitted | OrderStatus::Accepted)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Submitted => "submitted",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Completed => "completed",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Margin => "margin",
            OrderStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Execution details of a completed order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub price: f64,
    pub size: f64,
    /// price * size
    pub value: f64,
    pub commission: f64,
}

/// Order status notification delivered to the strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: OrderId,
    pub side: OrderSide,
    pub status: OrderStatus,
    /// Present only when `status == Completed`.
    pub execution: Option<Execution>,
    pub timestamp: DateTime<Utc>,
}

/// Trade notification: a position was opened or brought back to flat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub gross_pnl: f64,
    /// Gross minus the commissions paid on both legs.
    pub net_pnl: f64,
    pub is_closed: bool,
    pub timestamp: DateTime<Utc>,
}

/// Everything a broker tells a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BrokerEvent {
    Order(OrderEvent),
    Trade(TradeEvent),
}

/// A holding in the single traded asset. `size == 0.0` means flat.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub size: f64,
    pub entry_price: f64,
    pub entry_commission: f64,
}

impl Position {
    pub fn is_flat(&self) -> bool {
        self.size == 0.0
    }
}
