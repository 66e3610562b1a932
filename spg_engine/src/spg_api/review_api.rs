use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewReview, Product, Review, UpdateReview},
    traits::{ReviewApiError, ReviewManagement},
};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

pub struct ReviewApi<B> {
    db: B,
}

impl<B> Debug for ReviewApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReviewApi")
    }
}

fn check_rating(rating: i64) -> Result<(), ReviewApiError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(ReviewApiError::InvalidRating(rating))
    }
}

impl<B> ReviewApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> ReviewApi<B>
where B: ReviewManagement
{
    pub async fn reviews_for_product(&self, product_id: i64) -> Result<Vec<Review>, ReviewApiError> {
        self.db.fetch_reviews_for_product(product_id).await
    }

    pub async fn fetch_review(&self, id: i64) -> Result<Option<Review>, ReviewApiError> {
        self.db.fetch_review(id).await
    }

    /// Stores a review and returns it with the product's refreshed rating aggregates.
    pub async fn create_review(&self, review: NewReview) -> Result<(Review, Product), ReviewApiError> {
        check_rating(review.rating)?;
        let (review, product) = self.db.insert_review(review).await?;
        info!(
            "⭐️ Customer #{} rated product #{} {}/5. The product now averages {} over {} reviews",
            review.customer_id, review.product_id, review.rating, product.ratings_average, product.ratings_quantity
        );
        Ok((review, product))
    }

    pub async fn update_review(
        &self,
        id: i64,
        customer_id: i64,
        update: UpdateReview,
    ) -> Result<(Review, Product), ReviewApiError> {
        if update.is_empty() {
            return Err(ReviewApiError::ReviewModificationNoOp);
        }
        if let Some(rating) = update.rating {
            check_rating(rating)?;
        }
        let result = self.db.update_review(id, customer_id, update).await?;
        debug!("⭐️ Review #{id} updated by customer #{customer_id}");
        Ok(result)
    }

    /// Deletes a review. Pass `None` as `customer_id` to delete any customer's review.
    pub async fn delete_review(&self, id: i64, customer_id: Option<i64>) -> Result<Product, ReviewApiError> {
        let product = self.db.delete_review(id, customer_id).await?;
        info!("⭐️ Review #{id} deleted. Product #{} now has {} reviews", product.id, product.ratings_quantity);
        Ok(product)
    }
}
