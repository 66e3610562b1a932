use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::time::error::Elapsed;

use crate::{
    db_types::{InvalidStatusTransition, NewOrder, Order, OrderStatusType},
    helpers::StaleOrderCancellation,
    order_objects::{MaterializeResult, MetadataError, OrderQueryFilter, PaymentConfirmation},
};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Insufficient stock for product {product_id}. {requested} requested, but only {available} available")]
    InsufficientStock { product_id: i64, requested: i64, available: i64 },
    #[error("The customer's cart is empty")]
    EmptyCart,
    #[error("An order must contain at least one item")]
    EmptyOrder,
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: i64, quantity: i64 },
    #[error("The requested customer {0} does not exist")]
    CustomerNotFound(i64),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
    #[error("An order for payment intent {0} already exists")]
    OrderAlreadyExists(String),
    #[error("{0}")]
    InvalidStatusTransition(#[from] InvalidStatusTransition),
    #[error("The database transaction did not complete in time and was rolled back")]
    TransactionTimeout,
    #[error("{0}")]
    InvalidMetadata(#[from] MetadataError),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}

impl From<Elapsed> for OrderFlowError {
    fn from(_: Elapsed) -> Self {
        OrderFlowError::TransactionTimeout
    }
}

/// Order storage and the atomic order-lifecycle operations.
///
/// Every method that writes more than one row does so in a single database transaction. If any step fails, nothing is
/// written. Backends bound each of these transactions by a timeout, after which the transaction is rolled back and
/// [`OrderFlowError::TransactionTimeout`] is returned.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Fetches an order, with its line items
    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderFlowError>;

    async fn fetch_order_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Order>, OrderFlowError>;

    /// Fetches orders matching the filter, oldest first, with their line items
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;

    /// Turns a confirmed payment into an order. In one transaction:
    /// * checks that no order exists for the payment intent yet. If one does, returns it as
    ///   [`MaterializeResult::AlreadyProcessed`].
    /// * reads the customer's cart, skipping lines whose product has been deleted. If nothing is left, returns
    ///   [`MaterializeResult::EmptyCart`].
    /// * creates the order (`paid`, `pending`) with line items copied from the current products
    /// * takes each line's quantity from stock, failing if any product has too little
    /// * empties the cart
    async fn materialize_order(&self, confirmation: PaymentConfirmation) -> Result<MaterializeResult, OrderFlowError>;

    /// Inserts an order entered by an admin. The stock for every item is taken in the same transaction as the insert.
    async fn insert_manual_order(&self, order: NewOrder) -> Result<Order, OrderFlowError>;

    /// Moves the order to `status`, if that is a legal transition from its current status. The timestamp that goes with
    /// the new status is set only if it is not already set. Cancelling an order that still holds stock returns that
    /// stock to the catalog.
    ///
    /// Requesting the status the order already has is not an error; the order is returned unchanged.
    async fn update_order_status(
        &self,
        id: i64,
        status: OrderStatusType,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderFlowError>;

    /// Fetches every order that is both unpaid and unfulfilled. These are the candidates for reaping.
    async fn fetch_unpaid_pending_orders(&self) -> Result<Vec<Order>, OrderFlowError>;

    /// Applies a reaping plan in a single transaction. Each order is cancelled only if it is still unpaid and pending
    /// at the time of the update; orders that moved on in the meantime are skipped. Returns the cancelled orders.
    async fn cancel_stale_orders(
        &self,
        plan: &[StaleOrderCancellation],
        now: DateTime<Utc>,
    ) -> Result<Vec<Order>, OrderFlowError>;
}
