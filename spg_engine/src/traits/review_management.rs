use thiserror::Error;
use tokio::time::error::Elapsed;

use crate::db_types::{NewReview, Product, Review, UpdateReview};

#[derive(Debug, Clone, Error)]
pub enum ReviewApiError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested review {0} does not exist")]
    ReviewNotFound(i64),
    #[error("The requested product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Only delivered orders can be reviewed, by the customer that placed them, for products in the order")]
    OrderNotEligible,
    #[error("The customer has already reviewed product {0}")]
    AlreadyReviewed(i64),
    #[error("A rating must be between 1 and 5, but was {0}")]
    InvalidRating(i64),
    #[error("The review update would result in a no-op")]
    ReviewModificationNoOp,
    #[error("The database transaction did not complete in time and was rolled back")]
    TransactionTimeout,
}

impl From<sqlx::Error> for ReviewApiError {
    fn from(e: sqlx::Error) -> Self {
        ReviewApiError::DatabaseError(e.to_string())
    }
}

impl From<Elapsed> for ReviewApiError {
    fn from(_: Elapsed) -> Self {
        ReviewApiError::TransactionTimeout
    }
}

/// Review storage. Every change to a review recalculates the reviewed product's `ratings_average` (rounded to one
/// decimal place) and `ratings_quantity` in the same transaction, and returns the product as it is afterwards.
#[allow(async_fn_in_trait)]
pub trait ReviewManagement {
    async fn fetch_review(&self, id: i64) -> Result<Option<Review>, ReviewApiError>;

    async fn fetch_reviews_for_product(&self, product_id: i64) -> Result<Vec<Review>, ReviewApiError>;

    /// Stores a new review. The order must belong to the reviewer, be delivered, and contain the product. A customer
    /// can review a product once.
    async fn insert_review(&self, review: NewReview) -> Result<(Review, Product), ReviewApiError>;

    /// Changes the rating and/or comment of one of the customer's own reviews.
    async fn update_review(
        &self,
        id: i64,
        customer_id: i64,
        update: UpdateReview,
    ) -> Result<(Review, Product), ReviewApiError>;

    /// Deletes a review. With `customer_id` set, only that customer's review can be deleted; `None` deletes any review
    /// (admin moderation).
    async fn delete_review(&self, id: i64, customer_id: Option<i64>) -> Result<Product, ReviewApiError>;
}
