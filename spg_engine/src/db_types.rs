use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
pub use spg_common::Cents;
pub use sqlx::types::Json;
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------        Role         ---------------------------------------------------------
/// Roles are asserted by the identity provider. They are not stored in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------       Product       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Cents,
    pub stock: i64,
    pub image: String,
    pub ratings_average: f64,
    pub ratings_quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Cents,
    pub stock: i64,
    #[serde(default)]
    pub image: String,
}

impl NewProduct {
    pub fn new<S: Into<String>>(name: S, price: Cents, stock: i64) -> Self {
        Self { name: name.into(), description: String::default(), price, stock, image: String::default() }
    }

    pub fn with_image<S: Into<String>>(mut self, image: S) -> Self {
        self.image = image.into();
        self
    }
}

//--------------------------------------       Customer      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Customer {
    pub id: i64,
    /// The principal id assigned by the identity provider
    pub identity_id: String,
    pub email: String,
    pub name: Option<String>,
    /// The payment processor's customer reference. Created lazily on the first checkout.
    pub payment_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub identity_id: String,
    pub email: String,
    pub name: Option<String>,
}

impl NewCustomer {
    pub fn new<S: Into<String>>(identity_id: S, email: S) -> Self {
        Self { identity_id: identity_id.into(), email: email.into(), name: None }
    }
}

//--------------------------------------         Cart        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

/// A cart line, resolved against the catalog. `product` is `None` when the product has been deleted since it was added
/// to the cart.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i64,
    pub product: Option<Product>,
}

impl CartLine {
    pub fn is_available(&self) -> bool {
        self.product.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Cart {
    /// `None` if the customer has never added anything to a cart
    pub id: Option<i64>,
    pub customer_id: i64,
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn empty(customer_id: i64) -> Self {
        Self { id: None, customer_id, lines: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

//--------------------------------------   ShippingAddress   ---------------------------------------------------------
/// Shipping addresses are copied onto every order, so later edits to a customer's address book never rewrite history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ShippingAddress {
    /// Returns the names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("full_name", &self.full_name),
            ("line1", &self.line1),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect()
    }
}

//--------------------------------------    PaymentStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
/// The fulfilment status of an order.
///
/// Orders move forward only: `pending → processing → shipped → delivered`, where steps may be skipped. `cancelled` can
/// be reached from any state that is not terminal. `delivered` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order exists, but nothing has been done to fulfil it yet
    Pending,
    /// The order is being picked and packed
    Processing,
    /// The order has left the warehouse
    Shipped,
    /// The customer has received the order
    Delivered,
    /// The order was cancelled by an admin, or abandoned and reaped
    Cancelled,
}

/// The outcome of a valid status change request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    /// The order is already in the requested state. Nothing needs to be written.
    Unchanged,
    Advance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("An order cannot move from {from} to {to}")]
pub struct InvalidStatusTransition {
    pub from: OrderStatusType,
    pub to: OrderStatusType,
}

impl OrderStatusType {
    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Shipped => 2,
            Self::Delivered => 3,
            Self::Cancelled => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    pub fn transition_to(&self, next: OrderStatusType) -> Result<StatusTransition, InvalidStatusTransition> {
        let err = InvalidStatusTransition { from: *self, to: next };
        match (self, next) {
            (a, b) if *a == b => Ok(StatusTransition::Unchanged),
            (a, _) if a.is_terminal() => Err(err),
            (_, Self::Cancelled) => Ok(StatusTransition::Advance),
            (a, b) if b.rank() > a.rank() => Ok(StatusTransition::Advance),
            _ => Err(err),
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::Processing => write!(f, "processing"),
            OrderStatusType::Shipped => write!(f, "shipped"),
            OrderStatusType::Delivered => write!(f, "delivered"),
            OrderStatusType::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------       OrderItem     ---------------------------------------------------------
/// A line item on an order. Name, price and image are copied from the product when the order is created.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub name: String,
    pub price: Cents,
    pub quantity: i64,
    pub image: String,
}

impl OrderItem {
    pub fn line_total(&self) -> Cents {
        self.price * self.quantity
    }
}

//--------------------------------------         Order       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub total_amount: Cents,
    pub shipping_address: Json<ShippingAddress>,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatusType,
    /// The idempotency key for orders created from payment notifications
    pub payment_intent_id: Option<String>,
    /// True while the order holds stock that was taken from the catalog
    pub stock_committed: bool,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
}

impl Order {
    pub fn contains_product(&self, product_id: i64) -> bool {
        self.items.iter().any(|i| i.product_id == product_id)
    }

    pub fn is_unpaid_and_pending(&self) -> bool {
        self.payment_status == PaymentStatus::Pending && self.order_status == OrderStatusType::Pending
    }
}

//--------------------------------------       NewOrder      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i64,
}

impl NewOrderItem {
    pub fn new(product_id: i64, quantity: i64) -> Self {
        Self { product_id, quantity }
    }
}

/// An order entered directly by an admin, bypassing the payment processor.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: i64,
    pub items: Vec<NewOrderItem>,
    pub shipping_address: ShippingAddress,
    pub total_amount: Cents,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatusType,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(customer_id: i64, items: Vec<NewOrderItem>, shipping_address: ShippingAddress, total: Cents) -> Self {
        Self {
            customer_id,
            items,
            shipping_address,
            total_amount: total,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatusType::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = status;
        self
    }

    pub fn with_order_status(mut self, status: OrderStatusType) -> Self {
        self.order_status = status;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

//--------------------------------------        Review       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Review {
    pub id: i64,
    pub product_id: i64,
    pub customer_id: i64,
    pub order_id: i64,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub product_id: i64,
    pub customer_id: i64,
    pub order_id: i64,
    pub rating: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReview {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

impl UpdateReview {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.comment.is_none()
    }
}
