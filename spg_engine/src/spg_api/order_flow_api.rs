use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderStatusType},
    helpers::plan_stale_order_cancellations,
    order_objects::{MaterializeResult, OrderQueryFilter, PaymentConfirmation},
    traits::{OrderFlowError, OrderManagement},
};

/// `OrderFlowApi` is the primary API for the order lifecycle. Orders come into existence in one of two ways:
/// * a payment processor confirms a payment ([`Self::process_payment_confirmation`]), or
/// * an admin enters an order directly ([`Self::create_manual_order`]).
///
/// Either way, the order takes its stock from the catalog in the same transaction that creates it. Afterwards,
/// admins move orders through their fulfilment states, and abandoned orders are reaped by
/// [`Self::cancel_stale_orders`].
pub struct OrderFlowApi<B> {
    db: B,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Turns a verified "payment succeeded" notification into an order.
    ///
    /// Payment processors deliver notifications at least once, so this is idempotent: a second notification for the
    /// same payment intent returns [`MaterializeResult::AlreadyProcessed`] and changes nothing.
    ///
    /// The order records the amount the processor actually collected. If that differs from the total the checkout
    /// computed, a warning is logged, but the order is still created; the customer has paid.
    pub async fn process_payment_confirmation(
        &self,
        confirmation: PaymentConfirmation,
    ) -> Result<MaterializeResult, OrderFlowError> {
        let pi = confirmation.payment_intent_id.clone();
        let customer_id = confirmation.metadata.customer_id;
        if confirmation.amount_received != confirmation.metadata.total {
            warn!(
                "🔄️💳️ Payment intent {pi} collected {}, but checkout priced the cart at {}. The order will record the \
                 amount collected.",
                confirmation.amount_received, confirmation.metadata.total
            );
        }
        let result = self.db.materialize_order(confirmation).await?;
        match &result {
            MaterializeResult::Created(order) => {
                info!("🔄️📦️ Order #{} created for customer #{customer_id} from payment intent {pi}", order.id)
            },
            MaterializeResult::AlreadyProcessed(order) => {
                info!("🔄️📦️ Payment intent {pi} was already processed as order #{}. Ignoring it.", order.id)
            },
            MaterializeResult::EmptyCart => {
                warn!(
                    "🔄️📦️ Payment intent {pi} succeeded, but customer #{customer_id} has nothing in their cart. No order \
                     was created. This payment needs attention."
                )
            },
        }
        Ok(result)
    }

    /// Creates an order on behalf of a customer, without going through the payment processor.
    ///
    /// The order is rejected before anything is written if it has no items, or any item has a quantity below 1.
    pub async fn create_manual_order(&self, order: NewOrder) -> Result<Order, OrderFlowError> {
        if order.items.is_empty() {
            return Err(OrderFlowError::EmptyOrder);
        }
        if let Some(item) = order.items.iter().find(|i| i.quantity < 1) {
            return Err(OrderFlowError::InvalidQuantity { product_id: item.product_id, quantity: item.quantity });
        }
        let order = self.db.insert_manual_order(order).await?;
        debug!("🔄️📦️ Manual order #{} holds {} lines", order.id, order.items.len());
        Ok(order)
    }

    /// Moves an order to a new fulfilment status.
    ///
    /// | From \ To  | processing | shipped | delivered | cancelled |
    /// |------------|------------|---------|-----------|-----------|
    /// | pending    | Ok         | Ok      | Ok        | Ok (1)    |
    /// | processing | no-op      | Ok      | Ok        | Ok (1)    |
    /// | shipped    | Err        | no-op   | Ok        | Ok (1)    |
    /// | delivered  | Err        | Err     | no-op     | Err       |
    /// | cancelled  | Err        | Err     | Err       | no-op     |
    ///
    /// Nothing can move back to `pending`.
    ///
    /// (1) If the order still holds its stock, the stock is returned to the catalog in the same transaction.
    pub async fn update_order_status(&self, id: i64, status: OrderStatusType) -> Result<Order, OrderFlowError> {
        self.db.update_order_status(id, status, Utc::now()).await
    }

    /// Cancels every unpaid, pending order older than `threshold`, and returns their stock.
    pub async fn cancel_stale_orders(&self, threshold: Duration) -> Result<Vec<Order>, OrderFlowError> {
        self.cancel_stale_orders_at(Utc::now(), threshold).await
    }

    /// As [`Self::cancel_stale_orders`], with an explicit clock.
    pub async fn cancel_stale_orders_at(
        &self,
        now: DateTime<Utc>,
        threshold: Duration,
    ) -> Result<Vec<Order>, OrderFlowError> {
        let candidates = self.db.fetch_unpaid_pending_orders().await?;
        let plan = plan_stale_order_cancellations(now, threshold, &candidates);
        if plan.is_empty() {
            trace!("🔄️🕰️ No stale orders out of {} unpaid candidates", candidates.len());
            return Ok(Vec::new());
        }
        debug!("🔄️🕰️ {} of {} unpaid orders are stale", plan.len(), candidates.len());
        let cancelled = self.db.cancel_stale_orders(&plan, now).await?;
        if cancelled.len() < plan.len() {
            info!(
                "🔄️🕰️ {} stale orders changed state before they could be cancelled and were left alone",
                plan.len() - cancelled.len()
            );
        }
        Ok(cancelled)
    }

    pub async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderFlowError> {
        self.db.fetch_order(id).await
    }

    pub async fn orders_for_customer(&self, customer_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        let query = OrderQueryFilter::default().with_customer_id(customer_id);
        self.db.search_orders(query).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        self.db.search_orders(query).await
    }
}
