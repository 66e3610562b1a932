//! Selection of abandoned orders.
//!
//! An order that was created but never paid for, and has not moved on from `pending`, holds stock that nobody is going
//! to buy. Once such an order is older than the staleness threshold it is cancelled and its stock is returned.
//!
//! Deciding *which* orders to cancel is a pure function of the clock, the threshold and the orders themselves, and
//! lives here so it can be tested without a database. Applying the plan is the backend's job
//! (see [`crate::traits::OrderManagement::cancel_stale_orders`]).
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::db_types::Order;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockRestoration {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleOrderCancellation {
    pub order_id: i64,
    /// Stock to hand back. Empty if the order is not holding any stock.
    pub restorations: Vec<StockRestoration>,
}

/// Returns a cancellation for every order in `orders` that is unpaid, still `pending`, and was created before
/// `now - threshold`. Other orders are ignored, so callers can pass a superset of the candidates.
pub fn plan_stale_order_cancellations(
    now: DateTime<Utc>,
    threshold: Duration,
    orders: &[Order],
) -> Vec<StaleOrderCancellation> {
    let cutoff = now - threshold;
    orders
        .iter()
        .filter(|o| o.is_unpaid_and_pending() && o.created_at < cutoff)
        .map(|o| {
            let restorations = if o.stock_committed {
                o.items.iter().map(|i| StockRestoration { product_id: i.product_id, quantity: i.quantity }).collect()
            } else {
                Vec::new()
            };
            StaleOrderCancellation { order_id: o.id, restorations }
        })
        .collect()
}
