//! # Backend contracts
//!
//! The traits in this module define what a storage backend must provide for the storefront payment gateway to run on
//! it. The public APIs re-exported at the crate root (`CartApi`, `OrderFlowApi` and friends) are generic over these
//! traits, so a backend only implements the ones for the APIs it needs to serve.
//!
//! * [`CatalogManagement`] reads and seeds products. Catalog editing proper lives elsewhere.
//! * [`CustomerManagement`] maps identity-provider principals to customer records.
//! * [`CartManagement`] keeps one cart per customer.
//! * [`OrderManagement`] is the core. It creates orders from payment confirmations and admin requests, moves them
//!   through their fulfilment states and cancels abandoned ones. Every multi-row change is atomic.
//! * [`ReviewManagement`] stores reviews and keeps the product rating aggregates in step with them.
//! * [`PaymentProcessor`] is not a storage trait. It is the outbound port to the third-party payment processor.
mod cart_management;
mod catalog_management;
mod customer_management;
mod order_management;
mod payment_processor;
mod review_management;

pub use cart_management::{CartApiError, CartManagement, MAX_LINE_QUANTITY};
pub use catalog_management::{CatalogError, CatalogManagement};
pub use customer_management::{CustomerApiError, CustomerManagement};
pub use order_management::{OrderFlowError, OrderManagement};
pub use payment_processor::{PaymentProcessor, PaymentProcessorError};
pub use review_management::{ReviewApiError, ReviewManagement};

/// The storage a checkout needs: the cart to price, and the customer record to attach the processor reference to.
pub trait CheckoutDatabase: CartManagement + CustomerManagement {}

impl<T> CheckoutDatabase for T where T: CartManagement + CustomerManagement {}
