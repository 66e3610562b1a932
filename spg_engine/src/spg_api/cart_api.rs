use std::fmt::Debug;

use log::*;

use crate::{
    db_types::Cart,
    traits::{CartApiError, CartManagement, MAX_LINE_QUANTITY},
};

/// `CartApi` manages the customer's cart. Stock is not checked or reserved here; that happens at checkout, and
/// stock is only taken once a payment succeeds.
pub struct CartApi<B> {
    db: B,
}

impl<B> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi")
    }
}

impl<B> CartApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

fn check_quantity(quantity: i64) -> Result<(), CartApiError> {
    if quantity < 1 {
        return Err(CartApiError::InvalidQuantity(quantity));
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(CartApiError::QuantityTooLarge { quantity, max: MAX_LINE_QUANTITY });
    }
    Ok(())
}

impl<B> CartApi<B>
where B: CartManagement
{
    pub async fn cart(&self, customer_id: i64) -> Result<Cart, CartApiError> {
        self.db.fetch_cart(customer_id).await
    }

    /// Adds `quantity` of a product to the cart, creating the cart on the first call.
    pub async fn add_item(&self, customer_id: i64, product_id: i64, quantity: i64) -> Result<Cart, CartApiError> {
        check_quantity(quantity)?;
        let cart = self.db.add_item(customer_id, product_id, quantity).await?;
        debug!("🛒️ Customer #{customer_id} added {quantity} of product #{product_id} to their cart");
        Ok(cart)
    }

    pub async fn update_item(&self, customer_id: i64, product_id: i64, quantity: i64) -> Result<Cart, CartApiError> {
        check_quantity(quantity)?;
        self.db.set_item_quantity(customer_id, product_id, quantity).await
    }

    pub async fn remove_item(&self, customer_id: i64, product_id: i64) -> Result<Cart, CartApiError> {
        let cart = self.db.remove_item(customer_id, product_id).await?;
        debug!("🛒️ Customer #{customer_id} removed product #{product_id} from their cart");
        Ok(cart)
    }

    pub async fn clear_cart(&self, customer_id: i64) -> Result<Cart, CartApiError> {
        self.db.clear_cart(customer_id).await
    }
}
