use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Customer, NewCustomer},
    traits::CustomerApiError,
};

pub async fn fetch_customer(id: i64, conn: &mut SqliteConnection) -> Result<Option<Customer>, sqlx::Error> {
    let customer = sqlx::query_as("SELECT * FROM customers WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(customer)
}

pub async fn fetch_customer_by_identity(
    identity_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Customer>, sqlx::Error> {
    let customer = sqlx::query_as("SELECT * FROM customers WHERE identity_id = $1")
        .bind(identity_id)
        .fetch_optional(conn)
        .await?;
    Ok(customer)
}

/// Inserts the customer, or refreshes the email of an existing customer with the same identity id. Idempotent, and
/// safe against two first requests from the same principal arriving at once.
pub async fn upsert_customer(customer: NewCustomer, conn: &mut SqliteConnection) -> Result<Customer, sqlx::Error> {
    let customer: Customer = sqlx::query_as(
        r#"
            INSERT INTO customers (identity_id, email, name) VALUES ($1, $2, $3)
            ON CONFLICT (identity_id) DO UPDATE SET
                email = CASE WHEN excluded.email <> '' THEN excluded.email ELSE customers.email END,
                name = COALESCE(excluded.name, customers.name),
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(customer.identity_id)
    .bind(customer.email)
    .bind(customer.name)
    .fetch_one(conn)
    .await?;
    debug!("👤️ Customer #{} is linked to identity {}", customer.id, customer.identity_id);
    Ok(customer)
}

/// Stores the payment processor's customer reference, unless one is already stored.
pub async fn set_payment_customer_id(
    id: i64,
    payment_customer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Customer, CustomerApiError> {
    let customer: Option<Customer> = sqlx::query_as(
        r#"
            UPDATE customers SET
                payment_customer_id = COALESCE(payment_customer_id, $1),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING *;
        "#,
    )
    .bind(payment_customer_id)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    customer.ok_or(CustomerApiError::CustomerNotFound(id))
}
