mod api;
mod config;
mod error;

mod data_objects;
pub mod webhook;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{EventData, PaymentIntent, StripeCustomer, WebhookEvent, PAYMENT_INTENT_SUCCEEDED};
pub use error::{StripeApiError, WebhookSignatureError};
