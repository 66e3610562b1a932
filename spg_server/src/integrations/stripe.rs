//! Glue between the payment processor client in `stripe_tools` and the engine.
//!
//! * [`StripeProcessor`] implements the engine's [`PaymentProcessor`] port on top of [`StripeApi`].
//! * [`WebhookVerifier`] checks the signature on incoming payment notifications.
//! * [`confirmation_from_event`] turns a verified notification into a [`PaymentConfirmation`] for the order
//!   materializer.
use std::collections::HashMap;

use chrono::Utc;
use log::*;
use spg_common::Secret;
use spg_engine::{
    checkout_objects::PaymentIntentCreated,
    db_types::Cents,
    order_objects::{MetadataError, PaymentConfirmation},
    PaymentProcessor,
    PaymentProcessorError,
};
use stripe_tools::{webhook::construct_event, StripeApi, StripeApiError, StripeConfig, WebhookEvent, WebhookSignatureError};
use thiserror::Error;

use crate::errors::ServerError;

//----------------------------------------------   StripeProcessor  ----------------------------------------------------
#[derive(Debug, Clone)]
pub struct StripeProcessor {
    api: StripeApi,
}

impl StripeProcessor {
    pub fn new(api: StripeApi) -> Self {
        Self { api }
    }

    pub fn from_config(config: StripeConfig) -> Result<Self, ServerError> {
        let api = StripeApi::new(config).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self::new(api))
    }
}

fn processor_error(e: StripeApiError) -> PaymentProcessorError {
    match e {
        StripeApiError::JsonError(s) => PaymentProcessorError::InvalidResponse(s),
        e => PaymentProcessorError::RequestFailed(e.to_string()),
    }
}

impl PaymentProcessor for StripeProcessor {
    async fn create_customer(
        &self,
        email: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<String, PaymentProcessorError> {
        let customer = self.api.create_customer(email, metadata).await.map_err(processor_error)?;
        Ok(customer.id)
    }

    async fn create_payment_intent(
        &self,
        amount: Cents,
        customer_ref: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<PaymentIntentCreated, PaymentProcessorError> {
        let intent = self.api.create_payment_intent(amount, customer_ref, metadata).await.map_err(processor_error)?;
        let client_secret = intent.client_secret.ok_or_else(|| {
            PaymentProcessorError::InvalidResponse(format!("Payment intent {} has no client secret", intent.id))
        })?;
        Ok(PaymentIntentCreated { id: intent.id, client_secret })
    }
}

//----------------------------------------------   WebhookVerifier  ----------------------------------------------------
/// Holds the webhook signing secret. Kept apart from [`StripeProcessor`] so that the webhook route does not need the
/// API key.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: Secret<String>,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    pub fn new(secret: Secret<String>, tolerance_secs: i64) -> Self {
        Self { secret, tolerance_secs }
    }

    pub fn from_config(config: &StripeConfig) -> Self {
        Self::new(config.webhook_secret.clone(), config.webhook_tolerance_secs)
    }

    /// Verifies the signature header against the raw body and parses the event.
    pub fn verify(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent, WebhookSignatureError> {
        let now = Utc::now().timestamp();
        construct_event(payload, signature, self.secret.reveal(), self.tolerance_secs, now)
    }
}

//----------------------------------------------   Event conversion  ---------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum PaymentEventError {
    #[error("The event does not contain a payment intent. {0}")]
    MalformedPaymentIntent(String),
    #[error("The payment intent metadata is unusable. {0}")]
    InvalidMetadata(#[from] MetadataError),
}

/// Returns the payment confirmation carried by a `payment_intent.succeeded` event, or `None` for any other event type.
pub fn confirmation_from_event(event: &WebhookEvent) -> Result<Option<PaymentConfirmation>, PaymentEventError> {
    if !event.is_payment_intent_succeeded() {
        trace!("💳️ Event {} is a {} event. Nothing to do.", event.id, event.event_type);
        return Ok(None);
    }
    let intent = event.payment_intent().map_err(|e| PaymentEventError::MalformedPaymentIntent(e.to_string()))?;
    let amount = intent.amount_in_cents();
    let confirmation = PaymentConfirmation::from_raw_metadata(intent.id, amount, &intent.metadata)?;
    Ok(Some(confirmation))
}
