mod stale_orders;

pub use stale_orders::{plan_stale_order_cancellations, StaleOrderCancellation, StockRestoration};
