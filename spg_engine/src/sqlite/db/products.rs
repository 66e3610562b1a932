use log::{debug, trace, warn};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewProduct, Product},
    traits::{CatalogError, OrderFlowError},
};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, CatalogError> {
    if product.stock < 0 {
        return Err(CatalogError::InvalidProduct(format!("Stock cannot be negative ({})", product.stock)));
    }
    if product.price.value() < 0 {
        return Err(CatalogError::InvalidProduct(format!("Price cannot be negative ({})", product.price)));
    }
    let product: Product = sqlx::query_as(
        r#"
            INSERT INTO products (name, description, price, stock, image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(product.name)
    .bind(product.description)
    .bind(product.price)
    .bind(product.stock)
    .bind(product.image)
    .fetch_one(conn)
    .await?;
    debug!("🛒️ Product #{} [{}] added to the catalog", product.id, product.name);
    Ok(product)
}

pub async fn fetch_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

/// Fetches the products with the given ids. Ids that do not exist are silently skipped.
pub async fn fetch_products_by_id(ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM products WHERE id IN (");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    builder.push(")");
    trace!("🛒️ Executing query: {}", builder.sql());
    let products = builder.build_query_as::<Product>().fetch_all(conn).await?;
    Ok(products)
}

pub async fn set_stock(id: i64, stock: i64, conn: &mut SqliteConnection) -> Result<Product, CatalogError> {
    if stock < 0 {
        return Err(CatalogError::InvalidProduct(format!("Stock cannot be negative ({stock})")));
    }
    let product: Option<Product> =
        sqlx::query_as("UPDATE products SET stock = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(stock)
            .bind(id)
            .fetch_optional(conn)
            .await?;
    product.ok_or(CatalogError::ProductNotFound(id))
}

pub async fn delete_product(id: i64, conn: &mut SqliteConnection) -> Result<(), CatalogError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(CatalogError::ProductNotFound(id));
    }
    debug!("🛒️ Product #{id} removed from the catalog");
    Ok(())
}

/// Takes `quantity` items of the product out of stock, if and only if there are at least that many in stock.
///
/// The check and the decrement are a single statement, so concurrent callers can never take the stock below zero.
/// If nothing was updated, the product is re-read to report whether it is missing or merely short.
pub async fn decrement_stock(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, OrderFlowError> {
    if quantity < 1 {
        return Err(OrderFlowError::InvalidQuantity { product_id, quantity });
    }
    let product: Option<Product> = sqlx::query_as(
        r#"
            UPDATE products SET stock = stock - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND stock >= $1
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;
    match product {
        Some(p) => {
            trace!("🛒️ {quantity} of product #{product_id} taken from stock. {} left", p.stock);
            Ok(p)
        },
        None => match fetch_product(product_id, conn).await? {
            Some(p) => {
                debug!("🛒️ Cannot take {quantity} of product #{product_id} from stock. Only {} left", p.stock);
                Err(OrderFlowError::InsufficientStock { product_id, requested: quantity, available: p.stock })
            },
            None => Err(OrderFlowError::ProductNotFound(product_id)),
        },
    }
}

/// Returns `quantity` items of the product to stock. Returns `false` if the product no longer exists, in which case
/// there is nothing to return the stock to.
pub async fn increment_stock(product_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE products SET stock = stock + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
            .bind(quantity)
            .bind(product_id)
            .execute(conn)
            .await?;
    if result.rows_affected() == 0 {
        warn!("🛒️ Product #{product_id} no longer exists. {quantity} items could not be returned to stock.");
        return Ok(false);
    }
    trace!("🛒️ {quantity} of product #{product_id} returned to stock");
    Ok(true)
}

/// Recalculates the rating aggregates for the product from its reviews.
pub async fn refresh_ratings(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as(
        r#"
            UPDATE products SET
                ratings_quantity = (SELECT COUNT(*) FROM reviews WHERE product_id = $1),
                ratings_average = COALESCE((SELECT ROUND(AVG(rating), 1) FROM reviews WHERE product_id = $1), 0),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING *;
        "#,
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}
