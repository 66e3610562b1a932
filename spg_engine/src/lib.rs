//! Storefront Payment Gateway engine
//!
//! The engine holds the order lifecycle of a small storefront: carts, checkout against a third-party payment
//! processor, turning confirmed payments into orders, manual orders, fulfilment status changes, reaping of abandoned
//! orders and product reviews. It knows nothing about HTTP; the server crate wraps it.
//!
//! The library is divided into two main sections:
//! 1. Storage. The backend contracts are the traits in [`mod@traits`]. [`SqliteDatabase`] implements all of them. You
//!    should never need to access the database directly. The exception is the data types used in the database. These
//!    are defined in the [`mod@db_types`] module and are public.
//! 2. The public API ([`CartApi`], [`CheckoutApi`], [`CustomerApi`], [`OrderFlowApi`] and [`ReviewApi`]). Each is
//!    generic over the backend traits it needs.
//!
//! Stock is only ever taken with a conditional update in the same transaction as the order it belongs to, so the
//! catalog can never be oversold, and a payment notification that arrives twice creates exactly one order.
#[cfg(feature = "sqlite")]
mod sqlite;

pub mod db_types;
pub mod helpers;
mod spg_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use spg_api::{
    cart_api::CartApi,
    checkout_api::CheckoutApi,
    checkout_objects,
    customer_api::CustomerApi,
    errors::CheckoutError,
    order_flow_api::OrderFlowApi,
    order_objects,
    review_api::ReviewApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db::db_url, SqliteDatabase, DEFAULT_TRANSACTION_TIMEOUT};
pub use traits::{
    CartApiError,
    CartManagement,
    CatalogError,
    CatalogManagement,
    CheckoutDatabase,
    CustomerApiError,
    CustomerManagement,
    OrderFlowError,
    OrderManagement,
    PaymentProcessor,
    PaymentProcessorError,
    MAX_LINE_QUANTITY,
    ReviewApiError,
    ReviewManagement,
};
