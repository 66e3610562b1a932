use thiserror::Error;

use crate::traits::{CartApiError, CustomerApiError, PaymentProcessorError};

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("The cart is empty")]
    EmptyCart,
    #[error("The requested product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Insufficient stock for product {product_id}. {requested} requested, but only {available} available")]
    InsufficientStock { product_id: i64, requested: i64, available: i64 },
    #[error("The shipping address is missing these fields: {0}")]
    InvalidShippingAddress(String),
    #[error("{0}")]
    PaymentProcessor(#[from] PaymentProcessorError),
    #[error("{0}")]
    CustomerError(#[from] CustomerApiError),
    #[error("{0}")]
    CartError(#[from] CartApiError),
}
