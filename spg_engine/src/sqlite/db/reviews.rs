use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use super::{is_foreign_key_violation, is_unique_violation};
use crate::{
    db_types::{NewReview, Review, UpdateReview},
    traits::ReviewApiError,
};

pub async fn fetch_review(id: i64, conn: &mut SqliteConnection) -> Result<Option<Review>, sqlx::Error> {
    let review = sqlx::query_as("SELECT * FROM reviews WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(review)
}

pub async fn fetch_reviews_for_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Review>, sqlx::Error> {
    let reviews = sqlx::query_as("SELECT * FROM reviews WHERE product_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(product_id)
        .fetch_all(conn)
        .await?;
    Ok(reviews)
}

/// Inserts the review if the referenced order belongs to the reviewer, has been delivered, and contains the product.
/// The eligibility check and the insert are one statement.
pub async fn insert_review(
    review: NewReview,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Review, ReviewApiError> {
    let product_id = review.product_id;
    let result: Result<Option<Review>, sqlx::Error> = sqlx::query_as(
        r#"
            INSERT INTO reviews (product_id, customer_id, order_id, rating, comment, created_at, updated_at)
            SELECT $1, $2, $3, $4, $5, $6, $6
            WHERE EXISTS (
                SELECT 1 FROM orders o JOIN order_items i ON i.order_id = o.id
                WHERE o.id = $3 AND o.customer_id = $2 AND o.order_status = 'delivered' AND i.product_id = $1
            )
            RETURNING *;
        "#,
    )
    .bind(review.product_id)
    .bind(review.customer_id)
    .bind(review.order_id)
    .bind(review.rating)
    .bind(review.comment)
    .bind(now)
    .fetch_optional(conn)
    .await;
    match result {
        Ok(Some(review)) => {
            debug!("⭐️ Review #{} for product #{product_id} saved", review.id);
            Ok(review)
        },
        Ok(None) => Err(ReviewApiError::OrderNotEligible),
        Err(e) if is_unique_violation(&e) => Err(ReviewApiError::AlreadyReviewed(product_id)),
        Err(e) if is_foreign_key_violation(&e) => Err(ReviewApiError::ProductNotFound(product_id)),
        Err(e) => Err(e.into()),
    }
}

pub async fn update_review(
    id: i64,
    customer_id: i64,
    update: UpdateReview,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Review, ReviewApiError> {
    let review: Option<Review> = sqlx::query_as(
        r#"
            UPDATE reviews SET
                rating = COALESCE($1, rating),
                comment = COALESCE($2, comment),
                updated_at = $3
            WHERE id = $4 AND customer_id = $5
            RETURNING *;
        "#,
    )
    .bind(update.rating)
    .bind(update.comment)
    .bind(now)
    .bind(id)
    .bind(customer_id)
    .fetch_optional(conn)
    .await?;
    review.ok_or(ReviewApiError::ReviewNotFound(id))
}

/// Deletes the review, restricted to the given author if `customer_id` is set.
pub async fn delete_review(
    id: i64,
    customer_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Review, ReviewApiError> {
    let review: Option<Review> =
        sqlx::query_as("DELETE FROM reviews WHERE id = $1 AND ($2 IS NULL OR customer_id = $2) RETURNING *")
            .bind(id)
            .bind(customer_id)
            .fetch_optional(conn)
            .await?;
    let review = review.ok_or(ReviewApiError::ReviewNotFound(id))?;
    debug!("⭐️ Review #{id} for product #{} deleted", review.product_id);
    Ok(review)
}
