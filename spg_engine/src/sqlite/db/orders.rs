use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{types::Json, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Cents, Order, OrderItem, OrderStatusType, PaymentStatus, Product, ShippingAddress},
    order_objects::OrderQueryFilter,
};

/// The fields of a new order row. Line items are inserted separately with [`insert_order_item`].
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub customer_id: i64,
    pub total_amount: Cents,
    pub shipping_address: ShippingAddress,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatusType,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Inserts a new order using the given connection. This is not atomic. You can embed this call inside a transaction
/// if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// New orders always hold their stock: callers take the stock in the same transaction.
pub async fn insert_order(order: OrderRecord, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                customer_id,
                total_amount,
                shipping_address,
                payment_status,
                order_status,
                payment_intent_id,
                stock_committed,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, 1, $7, $7)
            RETURNING *;
        "#,
    )
    .bind(order.customer_id)
    .bind(order.total_amount)
    .bind(Json(order.shipping_address))
    .bind(order.payment_status)
    .bind(order.order_status)
    .bind(order.payment_intent_id)
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order #{} inserted for customer #{}", order.id, order.customer_id);
    Ok(order)
}

/// Copies the product's current name, price and image onto a new line item for the order.
pub async fn insert_order_item(
    order_id: i64,
    product: &Product,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, sqlx::Error> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, product_id, name, price, quantity, image)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(product.id)
    .bind(&product.name)
    .bind(product.price)
    .bind(quantity)
    .bind(&product.image)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

async fn with_items(order: Option<Order>, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    match order {
        Some(mut order) => {
            order.items = fetch_order_items(order.id, conn).await?;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}

/// Fetches the order with its line items
pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(&mut *conn).await?;
    with_items(order, conn).await
}

pub async fn fetch_order_by_payment_intent(
    payment_intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE payment_intent_id = $1")
        .bind(payment_intent_id)
        .fetch_optional(&mut *conn)
        .await?;
    with_items(order, conn).await
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(cid) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(cid);
    }
    if let Some(statuses) = query.order_status.filter(|s| !s.is_empty()) {
        where_clause.push("order_status IN (");
        for (i, status) in statuses.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status);
        }
        where_clause.push_unseparated(")");
    }
    if let Some(status) = query.payment_status {
        where_clause.push("payment_status = ");
        where_clause.push_bind_unseparated(status);
    }
    if let Some(since) = query.since {
        where_clause.push("unixepoch(created_at) >= unixepoch(");
        where_clause.push_bind_unseparated(since);
        where_clause.push_unseparated(")");
    }
    if let Some(until) = query.until {
        where_clause.push("unixepoch(created_at) <= unixepoch(");
        where_clause.push_bind_unseparated(until);
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY created_at ASC, id ASC");

    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(&mut *conn).await?;
    let mut result = Vec::with_capacity(orders.len());
    for mut order in orders {
        order.items = fetch_order_items(order.id, &mut *conn).await?;
        result.push(order);
    }
    trace!("📝️ Result of search_orders: {}", result.len());
    Ok(result)
}

/// A no-op write on the order row, returning the row. Used as the first statement of status-change transactions so
/// that the row cannot change between being read and being updated.
pub async fn lock_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET updated_at = updated_at WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    with_items(order, conn).await
}

/// Sets the order status, and stamps the timestamp that goes with it unless it is already set. Moving straight to
/// `delivered` stamps `shipped_at` too.
///
/// The update only applies if the order still has status `from`.
pub(crate) async fn set_order_status(
    id: i64,
    from: OrderStatusType,
    to: OrderStatusType,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let stamps = match to {
        OrderStatusType::Shipped => ", shipped_at = COALESCE(shipped_at, $1)",
        OrderStatusType::Delivered => {
            ", shipped_at = COALESCE(shipped_at, $1), delivered_at = COALESCE(delivered_at, $1)"
        },
        OrderStatusType::Cancelled => ", cancelled_at = COALESCE(cancelled_at, $1)",
        OrderStatusType::Pending | OrderStatusType::Processing => "",
    };
    let sql = format!(
        "UPDATE orders SET order_status = $2, updated_at = $1{stamps} WHERE id = $3 AND order_status = $4 RETURNING *"
    );
    let order = sqlx::query_as(&sql)
        .bind(now)
        .bind(to)
        .bind(id)
        .bind(from)
        .fetch_optional(&mut *conn)
        .await?;
    with_items(order, conn).await
}

/// Cancels the order if, and only if, it is still unpaid and pending. The `stock_committed` flag is left untouched, so
/// the returned order shows whether stock needs to be returned.
pub(crate) async fn cancel_if_unpaid_and_pending(
    id: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                order_status = 'cancelled',
                cancelled_at = COALESCE(cancelled_at, $1),
                updated_at = $1
            WHERE id = $2 AND order_status = 'pending' AND payment_status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(now)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    with_items(order, conn).await
}

/// Marks the order's stock as handed back. Returns `false` if the flag was already clear, i.e. the stock had already
/// been returned.
pub(crate) async fn release_stock_commitment(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET stock_committed = 0 WHERE id = $1 AND stock_committed = 1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn fetch_unpaid_pending_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let query = OrderQueryFilter::default()
        .with_order_status(OrderStatusType::Pending)
        .with_payment_status(PaymentStatus::Pending);
    search_orders(query, conn).await
}
