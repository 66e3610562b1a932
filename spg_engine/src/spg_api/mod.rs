//! # Storefront payment gateway public API
//!
//! The `spg_api` module exposes the programmatic API for the storefront payment gateway.
//! The API is modular, so that clients of the API can pick and choose the functionality they want.
//!
//! * [`cart_api`] manages the customer's single cart.
//! * [`checkout_api`] prices a cart and opens a payment intent with the payment processor.
//! * [`customer_api`] maps identity-provider principals to customer records.
//! * [`order_flow_api`] is the primary API for the order lifecycle: turning confirmed payments into orders, manual
//!   orders, status changes and reaping abandoned orders.
//! * [`review_api`] manages product reviews and, through the backend, the product rating aggregates.
//!
//! The other submodules in this module are support types.
//!
//! # API usage
//!
//! The pattern for using all the APIs is the same. An API instance is created by supplying a database backend that
//! implements the specific backend traits required by the API.
//!
//! For example, to list a customer's orders:
//!
//! ```rust,ignore
//! use spg_engine::{OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements OrderManagement
//! let api = OrderFlowApi::new(db);
//! let orders = api.orders_for_customer(customer_id).await?;
//! ```

pub mod cart_api;
pub mod checkout_api;
pub mod checkout_objects;
pub mod customer_api;
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod review_api;
