use std::collections::HashMap;

use thiserror::Error;

use crate::{db_types::Cents, spg_api::checkout_objects::PaymentIntentCreated};

#[derive(Debug, Clone, Error)]
pub enum PaymentProcessorError {
    #[error("The payment processor could not be reached or refused the request. {0}")]
    RequestFailed(String),
    #[error("The payment processor sent a response we do not understand. {0}")]
    InvalidResponse(String),
}

/// The outbound port to the third-party payment processor.
#[allow(async_fn_in_trait)]
pub trait PaymentProcessor {
    /// Creates the processor-side customer record and returns its reference.
    async fn create_customer(
        &self,
        email: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<String, PaymentProcessorError>;

    /// Creates a payment intent for `amount` in the store currency. `metadata` is returned verbatim in the payment
    /// notifications for this intent.
    async fn create_payment_intent(
        &self,
        amount: Cents,
        customer_ref: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<PaymentIntentCreated, PaymentProcessorError>;
}
