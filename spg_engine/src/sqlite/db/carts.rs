use std::collections::HashMap;

use log::{debug, trace};
use sqlx::SqliteConnection;

use super::products;
use crate::{
    db_types::{Cart, CartItem, CartLine},
    traits::{CartApiError, MAX_LINE_QUANTITY},
};

/// Returns the id of the customer's cart, creating the cart if necessary.
pub async fn ensure_cart(customer_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO carts (customer_id) VALUES ($1)
            ON CONFLICT (customer_id) DO UPDATE SET updated_at = CURRENT_TIMESTAMP
            RETURNING id;
        "#,
    )
    .bind(customer_id)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn fetch_cart_id(customer_id: i64, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let id = sqlx::query_scalar("SELECT id FROM carts WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_optional(conn)
        .await?;
    Ok(id)
}

/// Touches the customer's cart row and returns its id.
///
/// This is the first statement of the order materialization transaction. Being a write, it takes the database write
/// lock, which serializes materializations (and anything else that writes) from here until the transaction ends.
pub async fn lock_cart(customer_id: i64, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let id = sqlx::query_scalar("UPDATE carts SET updated_at = CURRENT_TIMESTAMP WHERE customer_id = $1 RETURNING id")
        .bind(customer_id)
        .fetch_optional(conn)
        .await?;
    Ok(id)
}

pub async fn fetch_cart_items(cart_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM cart_items WHERE cart_id = $1 ORDER BY id")
        .bind(cart_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Reads the cart and resolves each line against the catalog.
pub async fn fetch_cart(customer_id: i64, conn: &mut SqliteConnection) -> Result<Cart, sqlx::Error> {
    let Some(cart_id) = fetch_cart_id(customer_id, &mut *conn).await? else {
        return Ok(Cart::empty(customer_id));
    };
    fetch_cart_with_id(cart_id, customer_id, conn).await
}

pub async fn fetch_cart_with_id(
    cart_id: i64,
    customer_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Cart, sqlx::Error> {
    let items = fetch_cart_items(cart_id, &mut *conn).await?;
    let ids = items.iter().map(|i| i.product_id).collect::<Vec<_>>();
    let mut products =
        products::fetch_products_by_id(&ids, conn).await?.into_iter().map(|p| (p.id, p)).collect::<HashMap<_, _>>();
    let lines = items
        .into_iter()
        .map(|i| CartLine { product_id: i.product_id, quantity: i.quantity, product: products.remove(&i.product_id) })
        .collect();
    trace!("🛒️ Fetched cart #{cart_id} for customer #{customer_id}");
    Ok(Cart { id: Some(cart_id), customer_id, lines })
}

/// Adds the quantity to the cart line for the product, creating the line if needed. The line may not grow beyond
/// [`MAX_LINE_QUANTITY`].
pub async fn add_item(
    cart_id: i64,
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), CartApiError> {
    if quantity < 1 {
        return Err(CartApiError::InvalidQuantity(quantity));
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(CartApiError::QuantityTooLarge { quantity, max: MAX_LINE_QUANTITY });
    }
    let result = sqlx::query(
        r#"
            INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = cart_items.quantity + excluded.quantity
            WHERE cart_items.quantity + excluded.quantity <= $4;
        "#,
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(quantity)
    .bind(MAX_LINE_QUANTITY)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(CartApiError::QuantityTooLarge { quantity, max: MAX_LINE_QUANTITY });
    }
    debug!("🛒️ {quantity} of product #{product_id} added to cart #{cart_id}");
    Ok(())
}

pub async fn set_item_quantity(
    cart_id: i64,
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), CartApiError> {
    if quantity < 1 {
        return Err(CartApiError::InvalidQuantity(quantity));
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(CartApiError::QuantityTooLarge { quantity, max: MAX_LINE_QUANTITY });
    }
    let result = sqlx::query("UPDATE cart_items SET quantity = $1 WHERE cart_id = $2 AND product_id = $3")
        .bind(quantity)
        .bind(cart_id)
        .bind(product_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(CartApiError::ItemNotInCart(product_id));
    }
    Ok(())
}

pub async fn remove_item(cart_id: i64, product_id: i64, conn: &mut SqliteConnection) -> Result<(), CartApiError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
        .bind(cart_id)
        .bind(product_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(CartApiError::ItemNotInCart(product_id));
    }
    debug!("🛒️ Product #{product_id} removed from cart #{cart_id}");
    Ok(())
}

/// Deletes every line in the cart, returning the number of lines removed.
pub async fn clear_cart_items(cart_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(conn).await?;
    debug!("🛒️ Cart #{cart_id} emptied ({} lines)", result.rows_affected());
    Ok(result.rows_affected())
}
