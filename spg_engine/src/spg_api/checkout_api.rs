use std::{collections::HashMap, fmt::Debug};

use log::*;

use crate::{
    db_types::{Customer, ShippingAddress},
    spg_api::{
        checkout_objects::{CheckoutResult, Pricing},
        errors::CheckoutError,
        order_objects::CheckoutMetadata,
    },
    traits::{CartManagement, CustomerManagement, PaymentProcessor},
};

/// `CheckoutApi` opens payment intents for carts. It never writes orders or touches stock; the order is created when
/// the payment processor confirms the payment (see [`crate::OrderFlowApi::process_payment_confirmation`]).
pub struct CheckoutApi<B, P> {
    db: B,
    processor: P,
    pricing: Pricing,
}

impl<B, P> Debug for CheckoutApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({:?})", self.pricing)
    }
}

impl<B, P> CheckoutApi<B, P> {
    pub fn new(db: B, processor: P, pricing: Pricing) -> Self {
        Self { db, processor, pricing }
    }

    pub fn pricing(&self) -> &Pricing {
        &self.pricing
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, P> CheckoutApi<B, P>
where
    B: CartManagement + CustomerManagement,
    P: PaymentProcessor,
{
    /// Prices the customer's cart and creates a payment intent for the total.
    ///
    /// The intent carries the customer id, the total and the shipping address as metadata. That is everything needed
    /// to create the order when the payment notification arrives.
    pub async fn create_payment_intent(
        &self,
        customer: &Customer,
        shipping_address: ShippingAddress,
    ) -> Result<CheckoutResult, CheckoutError> {
        let missing = shipping_address.missing_fields();
        if !missing.is_empty() {
            return Err(CheckoutError::InvalidShippingAddress(missing.join(", ")));
        }
        let cart = self.db.fetch_cart(customer.id).await?;
        let summary = self.pricing.price_cart(&cart)?;
        let customer_ref = self.payment_customer_ref(customer).await?;
        let metadata = CheckoutMetadata::new(customer.id, summary.total, shipping_address).to_metadata();
        let intent = self.processor.create_payment_intent(summary.total, &customer_ref, &metadata).await?;
        info!("💳️ Payment intent {} created for customer #{} for {}", intent.id, customer.id, summary.total);
        Ok(CheckoutResult { client_secret: intent.client_secret, payment_intent_id: intent.id, summary })
    }

    /// Returns the payment processor's reference for the customer, creating and storing it on first use.
    async fn payment_customer_ref(&self, customer: &Customer) -> Result<String, CheckoutError> {
        if let Some(reference) = &customer.payment_customer_id {
            return Ok(reference.clone());
        }
        let metadata = HashMap::from([
            ("customer_id".to_string(), customer.id.to_string()),
            ("identity_id".to_string(), customer.identity_id.clone()),
        ]);
        let reference = self.processor.create_customer(&customer.email, &metadata).await?;
        debug!("💳️ Payment processor customer {reference} created for customer #{}", customer.id);
        let updated = self.db.set_payment_customer_id(customer.id, &reference).await?;
        // A concurrent checkout may have stored a reference first. Use whichever one was kept.
        Ok(updated.payment_customer_id.unwrap_or(reference))
    }
}
