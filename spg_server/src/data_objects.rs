use std::fmt::Display;

use serde::{Deserialize, Serialize};
use spg_engine::db_types::{
    Cents,
    NewOrder,
    NewOrderItem,
    OrderStatusType,
    PaymentStatus,
    Product,
    Review,
    ShippingAddress,
};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//----------------------------------------------   Cart  ----------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCartItem {
    pub product_id: i64,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCartItem {
    pub quantity: i64,
}

//----------------------------------------------   Checkout  ----------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntentRequest {
    pub shipping_address: ShippingAddress,
}

//----------------------------------------------   Orders  ----------------------------------------------------
/// An admin's request to enter an order directly. Statuses default to `pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualOrderRequest {
    pub customer_id: i64,
    pub items: Vec<NewOrderItem>,
    pub shipping_address: ShippingAddress,
    pub total_amount: Cents,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub order_status: Option<OrderStatusType>,
}

impl From<ManualOrderRequest> for NewOrder {
    fn from(req: ManualOrderRequest) -> Self {
        let mut order = NewOrder::new(req.customer_id, req.items, req.shipping_address, req.total_amount);
        if let Some(status) = req.payment_status {
            order = order.with_payment_status(status);
        }
        if let Some(status) = req.order_status {
            order = order.with_order_status(status);
        }
        order
    }
}

/// The status arrives as a plain string, so that unknown values can be answered with a helpful 400.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: String,
}

impl OrderStatusUpdate {
    pub fn status(&self) -> Result<OrderStatusType, ServerError> {
        self.status.trim().to_ascii_lowercase().parse::<OrderStatusType>().map_err(|e| {
            ServerError::InvalidStatus(format!(
                "{e}. Use one of pending, processing, shipped, delivered or cancelled."
            ))
        })
    }
}

//----------------------------------------------   Reviews  ----------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub product_id: i64,
    pub order_id: i64,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A review, with the product's rating aggregates as they are after the change
#[derive(Debug, Clone, Serialize)]
pub struct ReviewResult {
    pub review: Review,
    pub product: Product,
}
