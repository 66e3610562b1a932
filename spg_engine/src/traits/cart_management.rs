use thiserror::Error;

use crate::db_types::Cart;

#[derive(Debug, Clone, Error)]
pub enum CartApiError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Product {0} is not in the cart")]
    ItemNotInCart(i64),
    #[error("Quantity must be at least 1, but was {0}")]
    InvalidQuantity(i64),
    #[error("A cart line may hold at most {max} of a product, but {quantity} were requested")]
    QuantityTooLarge { quantity: i64, max: i64 },
}

/// The most of any one product a cart line can hold
pub const MAX_LINE_QUANTITY: i64 = 10_000;

impl From<sqlx::Error> for CartApiError {
    fn from(e: sqlx::Error) -> Self {
        CartApiError::DatabaseError(e.to_string())
    }
}

/// Each customer has exactly one cart, created on the first `add_item`. All methods return the cart as it is after the
/// change, with every line resolved against the catalog.
#[allow(async_fn_in_trait)]
pub trait CartManagement {
    /// Fetches the customer's cart. A customer without a cart gets an empty one; nothing is written.
    async fn fetch_cart(&self, customer_id: i64) -> Result<Cart, CartApiError>;

    /// Adds `quantity` of the product. If the product is already in the cart, the quantities are added together.
    async fn add_item(&self, customer_id: i64, product_id: i64, quantity: i64) -> Result<Cart, CartApiError>;

    /// Sets the quantity of a product that is already in the cart.
    async fn set_item_quantity(&self, customer_id: i64, product_id: i64, quantity: i64)
        -> Result<Cart, CartApiError>;

    async fn remove_item(&self, customer_id: i64, product_id: i64) -> Result<Cart, CartApiError>;

    /// Removes every item from the cart. The cart itself is kept.
    async fn clear_cart(&self, customer_id: i64) -> Result<Cart, CartApiError>;
}
