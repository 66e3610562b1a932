//! `SqliteDatabase` is a concrete implementation of a storefront payment gateway backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`] module.
//!
//! Multi-statement operations run inside `self.pool.begin()` transactions, wrapped in a `tokio::time::timeout`. If the
//! timeout fires, the future holding the transaction is dropped, and sqlx rolls the transaction back.
use std::{fmt::Debug, time::Duration};

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{SqliteConnection, SqlitePool};
use tokio::time::timeout;

use super::db::{
    carts,
    customers,
    db_url,
    is_foreign_key_violation,
    is_unique_violation,
    new_pool,
    orders,
    orders::OrderRecord,
    products,
    reviews,
};
use crate::{
    db_types::{
        Cart,
        Customer,
        NewCustomer,
        NewOrder,
        NewProduct,
        NewReview,
        Order,
        OrderStatusType,
        PaymentStatus,
        Product,
        Review,
        StatusTransition,
        UpdateReview,
    },
    helpers::{StaleOrderCancellation, StockRestoration},
    order_objects::{MaterializeResult, OrderQueryFilter, PaymentConfirmation},
    traits::{
        CartApiError,
        CartManagement,
        CatalogError,
        CatalogManagement,
        CustomerApiError,
        CustomerManagement,
        OrderFlowError,
        OrderManagement,
        ReviewApiError,
        ReviewManagement,
    },
};

pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    tx_timeout: Duration,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

fn map_order_insert_error(e: sqlx::Error, customer_id: i64, payment_intent_id: Option<&str>) -> OrderFlowError {
    match payment_intent_id {
        Some(pi) if is_unique_violation(&e) => OrderFlowError::OrderAlreadyExists(pi.to_string()),
        _ if is_foreign_key_violation(&e) => OrderFlowError::CustomerNotFound(customer_id),
        _ => e.into(),
    }
}

async fn restore_stock(restorations: &[StockRestoration], conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    for r in restorations {
        products::increment_stock(r.product_id, r.quantity, &mut *conn).await?;
    }
    Ok(())
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(id, &mut conn).await?;
        Ok(product)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        products::insert_product(product, &mut conn).await
    }

    async fn set_stock(&self, id: i64, stock: i64) -> Result<Product, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        products::set_stock(id, stock, &mut conn).await
    }

    async fn delete_product(&self, id: i64) -> Result<(), CatalogError> {
        let mut conn = self.pool.acquire().await?;
        products::delete_product(id, &mut conn).await
    }
}

impl CustomerManagement for SqliteDatabase {
    async fn fetch_customer(&self, id: i64) -> Result<Option<Customer>, CustomerApiError> {
        let mut conn = self.pool.acquire().await?;
        let customer = customers::fetch_customer(id, &mut conn).await?;
        Ok(customer)
    }

    async fn fetch_customer_by_identity(&self, identity_id: &str) -> Result<Option<Customer>, CustomerApiError> {
        let mut conn = self.pool.acquire().await?;
        let customer = customers::fetch_customer_by_identity(identity_id, &mut conn).await?;
        Ok(customer)
    }

    async fn fetch_or_create_customer(&self, customer: NewCustomer) -> Result<Customer, CustomerApiError> {
        let mut conn = self.pool.acquire().await?;
        // Most requests come from returning customers whose details have not changed. Skip the write for those.
        if let Some(existing) = customers::fetch_customer_by_identity(&customer.identity_id, &mut conn).await? {
            let email_unchanged = customer.email.is_empty() || customer.email == existing.email;
            let name_unchanged = customer.name.is_none() || customer.name == existing.name;
            if email_unchanged && name_unchanged {
                return Ok(existing);
            }
        }
        let customer = customers::upsert_customer(customer, &mut conn).await?;
        Ok(customer)
    }

    async fn set_payment_customer_id(&self, id: i64, payment_customer_id: &str) -> Result<Customer, CustomerApiError> {
        let mut conn = self.pool.acquire().await?;
        customers::set_payment_customer_id(id, payment_customer_id, &mut conn).await
    }
}

impl CartManagement for SqliteDatabase {
    async fn fetch_cart(&self, customer_id: i64) -> Result<Cart, CartApiError> {
        let mut conn = self.pool.acquire().await?;
        let cart = carts::fetch_cart(customer_id, &mut conn).await?;
        Ok(cart)
    }

    async fn add_item(&self, customer_id: i64, product_id: i64, quantity: i64) -> Result<Cart, CartApiError> {
        let mut tx = self.pool.begin().await?;
        let cart_id = carts::ensure_cart(customer_id, &mut tx).await?;
        if products::fetch_product(product_id, &mut tx).await?.is_none() {
            return Err(CartApiError::ProductNotFound(product_id));
        }
        carts::add_item(cart_id, product_id, quantity, &mut tx).await?;
        let cart = carts::fetch_cart_with_id(cart_id, customer_id, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn set_item_quantity(&self, customer_id: i64, product_id: i64, quantity: i64) -> Result<Cart, CartApiError> {
        let mut conn = self.pool.acquire().await?;
        let cart_id = carts::fetch_cart_id(customer_id, &mut conn).await?.ok_or(CartApiError::ItemNotInCart(product_id))?;
        carts::set_item_quantity(cart_id, product_id, quantity, &mut conn).await?;
        let cart = carts::fetch_cart_with_id(cart_id, customer_id, &mut conn).await?;
        Ok(cart)
    }

    async fn remove_item(&self, customer_id: i64, product_id: i64) -> Result<Cart, CartApiError> {
        let mut conn = self.pool.acquire().await?;
        let cart_id = carts::fetch_cart_id(customer_id, &mut conn).await?.ok_or(CartApiError::ItemNotInCart(product_id))?;
        carts::remove_item(cart_id, product_id, &mut conn).await?;
        let cart = carts::fetch_cart_with_id(cart_id, customer_id, &mut conn).await?;
        Ok(cart)
    }

    async fn clear_cart(&self, customer_id: i64) -> Result<Cart, CartApiError> {
        let mut conn = self.pool.acquire().await?;
        match carts::fetch_cart_id(customer_id, &mut conn).await? {
            Some(cart_id) => {
                carts::clear_cart_items(cart_id, &mut conn).await?;
                Ok(Cart { id: Some(cart_id), customer_id, lines: Vec::new() })
            },
            None => Ok(Cart::empty(customer_id)),
        }
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_payment_intent(payment_intent_id, &mut conn).await?;
        Ok(order)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn materialize_order(&self, confirmation: PaymentConfirmation) -> Result<MaterializeResult, OrderFlowError> {
        let pi = confirmation.payment_intent_id.clone();
        if let Some(order) = self.fetch_order_by_payment_intent(&pi).await? {
            debug!("📝️ Payment intent {pi} was already turned into order #{}", order.id);
            return Ok(MaterializeResult::AlreadyProcessed(order));
        }
        let result = timeout(self.tx_timeout, self.materialize_in_transaction(confirmation)).await?;
        match result {
            // Lost a race with a concurrent notification for the same payment intent
            Err(OrderFlowError::OrderAlreadyExists(pi)) => {
                let order = self.fetch_order_by_payment_intent(&pi).await?.ok_or(OrderFlowError::OrderAlreadyExists(pi))?;
                Ok(MaterializeResult::AlreadyProcessed(order))
            },
            other => other,
        }
    }

    async fn insert_manual_order(&self, order: NewOrder) -> Result<Order, OrderFlowError> {
        timeout(self.tx_timeout, async {
            let mut tx = self.pool.begin().await?;
            let customer_id = order.customer_id;
            let record = OrderRecord {
                customer_id,
                total_amount: order.total_amount,
                shipping_address: order.shipping_address,
                payment_status: order.payment_status,
                order_status: order.order_status,
                payment_intent_id: None,
                created_at: order.created_at,
            };
            let mut new_order =
                orders::insert_order(record, &mut tx).await.map_err(|e| map_order_insert_error(e, customer_id, None))?;
            for item in order.items {
                let product = products::decrement_stock(item.product_id, item.quantity, &mut tx).await?;
                let line = orders::insert_order_item(new_order.id, &product, item.quantity, &mut tx).await?;
                new_order.items.push(line);
            }
            tx.commit().await?;
            info!("📝️ Manual order #{} created for customer #{customer_id}", new_order.id);
            Ok(new_order)
        })
        .await?
    }

    async fn update_order_status(
        &self,
        id: i64,
        status: OrderStatusType,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderFlowError> {
        timeout(self.tx_timeout, async {
            let mut tx = self.pool.begin().await?;
            let order = orders::lock_order(id, &mut tx).await?.ok_or(OrderFlowError::OrderNotFound(id))?;
            if order.order_status.transition_to(status)? == StatusTransition::Unchanged {
                trace!("📝️ Order #{id} is already {status}. Nothing to do.");
                return Ok(order);
            }
            let from = order.order_status;
            let mut updated = orders::set_order_status(id, from, status, now, &mut tx)
                .await?
                .ok_or(OrderFlowError::OrderNotFound(id))?;
            if status == OrderStatusType::Cancelled && updated.stock_committed {
                let restorations = updated
                    .items
                    .iter()
                    .map(|i| StockRestoration { product_id: i.product_id, quantity: i.quantity })
                    .collect::<Vec<_>>();
                restore_stock(&restorations, &mut tx).await?;
                orders::release_stock_commitment(id, &mut tx).await?;
                updated.stock_committed = false;
                debug!("📝️ Stock for cancelled order #{id} returned to the catalog");
            }
            tx.commit().await?;
            info!("📝️ Order #{id} moved from {from} to {status}");
            Ok(updated)
        })
        .await?
    }

    async fn fetch_unpaid_pending_orders(&self) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_unpaid_pending_orders(&mut conn).await?;
        Ok(orders)
    }

    async fn cancel_stale_orders(
        &self,
        plan: &[StaleOrderCancellation],
        now: DateTime<Utc>,
    ) -> Result<Vec<Order>, OrderFlowError> {
        if plan.is_empty() {
            return Ok(Vec::new());
        }
        timeout(self.tx_timeout, async {
            let mut tx = self.pool.begin().await?;
            let mut cancelled = Vec::with_capacity(plan.len());
            for c in plan {
                let Some(mut order) = orders::cancel_if_unpaid_and_pending(c.order_id, now, &mut tx).await? else {
                    debug!("🕰️ Order #{} is no longer unpaid and pending. Skipping it.", c.order_id);
                    continue;
                };
                if order.stock_committed {
                    restore_stock(&c.restorations, &mut tx).await?;
                    orders::release_stock_commitment(order.id, &mut tx).await?;
                    order.stock_committed = false;
                }
                cancelled.push(order);
            }
            tx.commit().await?;
            Ok(cancelled)
        })
        .await?
    }
}

impl ReviewManagement for SqliteDatabase {
    async fn fetch_review(&self, id: i64) -> Result<Option<Review>, ReviewApiError> {
        let mut conn = self.pool.acquire().await?;
        let review = reviews::fetch_review(id, &mut conn).await?;
        Ok(review)
    }

    async fn fetch_reviews_for_product(&self, product_id: i64) -> Result<Vec<Review>, ReviewApiError> {
        let mut conn = self.pool.acquire().await?;
        let reviews = reviews::fetch_reviews_for_product(product_id, &mut conn).await?;
        Ok(reviews)
    }

    async fn insert_review(&self, review: NewReview) -> Result<(Review, Product), ReviewApiError> {
        timeout(self.tx_timeout, async {
            let mut tx = self.pool.begin().await?;
            let product_id = review.product_id;
            let review = reviews::insert_review(review, Utc::now(), &mut tx).await?;
            let product =
                products::refresh_ratings(product_id, &mut tx).await?.ok_or(ReviewApiError::ProductNotFound(product_id))?;
            tx.commit().await?;
            Ok((review, product))
        })
        .await?
    }

    async fn update_review(
        &self,
        id: i64,
        customer_id: i64,
        update: UpdateReview,
    ) -> Result<(Review, Product), ReviewApiError> {
        timeout(self.tx_timeout, async {
            let mut tx = self.pool.begin().await?;
            let review = reviews::update_review(id, customer_id, update, Utc::now(), &mut tx).await?;
            let product = products::refresh_ratings(review.product_id, &mut tx)
                .await?
                .ok_or(ReviewApiError::ProductNotFound(review.product_id))?;
            tx.commit().await?;
            Ok((review, product))
        })
        .await?
    }

    async fn delete_review(&self, id: i64, customer_id: Option<i64>) -> Result<Product, ReviewApiError> {
        timeout(self.tx_timeout, async {
            let mut tx = self.pool.begin().await?;
            let review = reviews::delete_review(id, customer_id, &mut tx).await?;
            let product = products::refresh_ratings(review.product_id, &mut tx)
                .await?
                .ok_or(ReviewApiError::ProductNotFound(review.product_id))?;
            tx.commit().await?;
            Ok(product)
        })
        .await?
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool, tx_timeout: DEFAULT_TRANSACTION_TIMEOUT })
    }

    /// Sets the upper bound on how long any one transaction may take before it is rolled back.
    pub fn with_transaction_timeout(mut self, tx_timeout: Duration) -> Self {
        self.tx_timeout = tx_timeout;
        self
    }

    /// Brings the schema up to date. Migrations that have already been applied are skipped.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn materialize_in_transaction(
        &self,
        confirmation: PaymentConfirmation,
    ) -> Result<MaterializeResult, OrderFlowError> {
        let PaymentConfirmation { payment_intent_id: pi, amount_received, metadata } = confirmation;
        let customer_id = metadata.customer_id;
        let mut tx = self.pool.begin().await?;
        let Some(cart_id) = carts::lock_cart(customer_id, &mut tx).await? else {
            info!("📝️ Customer #{customer_id} has no cart. No order will be created for payment intent {pi}");
            return Ok(MaterializeResult::EmptyCart);
        };
        // Re-check under the write lock. A notification for the same intent may have committed since the first check.
        if let Some(order) = orders::fetch_order_by_payment_intent(&pi, &mut tx).await? {
            return Ok(MaterializeResult::AlreadyProcessed(order));
        }
        let cart = carts::fetch_cart_with_id(cart_id, customer_id, &mut tx).await?;
        let lines = cart
            .lines
            .into_iter()
            .filter_map(|line| match line.product {
                Some(product) => Some((product, line.quantity)),
                None => {
                    warn!("📝️ Product #{} in cart #{cart_id} no longer exists. Skipping it.", line.product_id);
                    None
                },
            })
            .collect::<Vec<_>>();
        if lines.is_empty() {
            info!("📝️ Cart #{cart_id} is empty. No order will be created for payment intent {pi}");
            return Ok(MaterializeResult::EmptyCart);
        }
        let record = OrderRecord {
            customer_id,
            total_amount: amount_received,
            shipping_address: metadata.shipping_address,
            payment_status: PaymentStatus::Paid,
            order_status: OrderStatusType::Pending,
            payment_intent_id: Some(pi.clone()),
            created_at: Utc::now(),
        };
        let mut order = orders::insert_order(record, &mut tx)
            .await
            .map_err(|e| map_order_insert_error(e, customer_id, Some(&pi)))?;
        for (product, quantity) in lines {
            let product = products::decrement_stock(product.id, quantity, &mut tx).await?;
            let item = orders::insert_order_item(order.id, &product, quantity, &mut tx).await?;
            order.items.push(item);
        }
        carts::clear_cart_items(cart_id, &mut tx).await?;
        tx.commit().await?;
        info!("📝️ Order #{} created from payment intent {pi} ({} lines)", order.id, order.items.len());
        Ok(MaterializeResult::Created(order))
    }
}
