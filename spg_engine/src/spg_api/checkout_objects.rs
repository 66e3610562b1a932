use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Cart, Cents},
    spg_api::errors::CheckoutError,
};

/// Store-wide pricing rules applied at checkout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    /// Flat shipping fee added to every order
    pub shipping_fee: Cents,
    /// Sales tax in basis points (825 = 8.25%), applied to the subtotal only
    pub tax_rate_bps: u32,
}

impl Pricing {
    pub fn new(shipping_fee: Cents, tax_rate_bps: u32) -> Self {
        Self { shipping_fee, tax_rate_bps }
    }

    /// Validates every line against the catalog and prices the cart.
    ///
    /// Fails on the first line that refers to a deleted product, or that asks for more than is in stock. Stock is not
    /// reserved here; it is only taken when the payment succeeds.
    pub fn price_cart(&self, cart: &Cart) -> Result<CheckoutSummary, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let mut lines = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let product = line.product.as_ref().ok_or(CheckoutError::ProductNotFound(line.product_id))?;
            if product.stock < line.quantity {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    requested: line.quantity,
                    available: product.stock,
                });
            }
            lines.push(PricedLine {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.price,
                quantity: line.quantity,
                line_total: product.price * line.quantity,
            });
        }
        let subtotal = lines.iter().map(|l| l.line_total).sum::<Cents>();
        let tax = subtotal.apply_basis_points(self.tax_rate_bps);
        let shipping = self.shipping_fee;
        let total = subtotal + shipping + tax;
        Ok(CheckoutSummary { lines, subtotal, shipping, tax, total })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedLine {
    pub product_id: i64,
    pub name: String,
    pub unit_price: Cents,
    pub quantity: i64,
    pub line_total: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSummary {
    pub lines: Vec<PricedLine>,
    pub subtotal: Cents,
    pub shipping: Cents,
    pub tax: Cents,
    pub total: Cents,
}

/// What the payment processor hands back when an intent is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentCreated {
    pub id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResult {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub summary: CheckoutSummary,
}
