use log::*;
use spg_engine::{db_types::Order, OrderFlowApi, SqliteDatabase};
use tokio::task::JoinHandle;

use crate::config::ReaperConfig;

/// Starts the stale order reaper. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval`, unpaid orders that are still pending and older than the configured threshold are cancelled, and
/// their stock goes back on the shelf. A failed sweep changes nothing and is simply retried on the next tick.
pub fn start_reaper_worker(db: SqliteDatabase, config: ReaperConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = config.interval.to_std().unwrap_or(std::time::Duration::from_secs(3600));
        let mut timer = tokio::time::interval(period);
        let api = OrderFlowApi::new(db);
        info!(
            "🕰️ Stale order reaper started. Sweeping every {} min for orders older than {} min",
            config.interval.num_minutes(),
            config.stale_order_threshold.num_minutes()
        );
        loop {
            timer.tick().await;
            debug!("🕰️ Running stale order sweep");
            match api.cancel_stale_orders(config.stale_order_threshold).await {
                Ok(cancelled) if cancelled.is_empty() => {
                    trace!("🕰️ No stale orders found");
                },
                Ok(cancelled) => {
                    info!("🕰️ {} stale orders cancelled", cancelled.len());
                    debug!("🕰️ Cancelled orders: {}", order_list(&cancelled));
                },
                Err(e) => {
                    error!("🕰️ Error running stale order sweep: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] cust_id: {} total: {}", o.id, o.customer_id, o.total_amount))
        .collect::<Vec<String>>()
        .join(", ")
}
