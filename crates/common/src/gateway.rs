use crate::{OrderHandle, OrderSide};

/// Where strategies send orders.
///
/// `PaperBroker` implements this for backtests. Submission is fire-and-forget:
/// the returned handle only identifies the order, and its outcome arrives later
/// as an `OrderEvent` through the strategy's event entry point.
pub trait OrderGateway {
    /// Queue a market order on the given side. Sizing is the gateway's concern.
    fn submit(&mut self, side: OrderSide) -> OrderHandle;
}
