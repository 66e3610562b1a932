use std::{collections::HashMap, fmt::Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{Cents, Order, OrderStatusType, PaymentStatus, ShippingAddress};

//--------------------------------------   OrderQueryFilter   --------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub customer_id: Option<i64>,
    pub order_status: Option<Vec<OrderStatusType>>,
    pub payment_status: Option<PaymentStatus>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_customer_id(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_order_status(mut self, status: OrderStatusType) -> Self {
        self.order_status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none() &&
            self.order_status.as_ref().map(|s| s.is_empty()).unwrap_or(true) &&
            self.payment_status.is_none() &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(cid) = &self.customer_id {
            write!(f, "customer_id: {cid}. ")?;
        }
        if let Some(statuses) = &self.order_status {
            let s = statuses.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(",");
            write!(f, "order_status: [{s}]. ")?;
        }
        if let Some(status) = &self.payment_status {
            write!(f, "payment_status: {status}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since: {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until: {until}. ")?;
        }
        Ok(())
    }
}

//--------------------------------------   CheckoutMetadata   --------------------------------------------------------
pub const METADATA_VERSION: u32 = 1;
pub const KEY_VERSION: &str = "spg_version";
pub const KEY_CUSTOMER_ID: &str = "customer_id";
pub const KEY_TOTAL: &str = "total";
pub const KEY_SHIPPING_ADDRESS: &str = "shipping_address";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("Payment metadata is missing the '{0}' field")]
    MissingField(&'static str),
    #[error("Payment metadata version '{0}' is not supported")]
    UnsupportedVersion(String),
    #[error("Payment metadata field '{field}' is invalid. {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// The context a checkout hands to the payment processor, so that the asynchronous payment notification can be
/// turned into an order without any other state.
///
/// The processor only stores flat string maps, so the fields are flattened into one. The map carries a version tag,
/// and [`CheckoutMetadata::try_from`] rejects anything it does not recognise instead of guessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutMetadata {
    pub customer_id: i64,
    pub total: Cents,
    pub shipping_address: ShippingAddress,
}

impl CheckoutMetadata {
    pub fn new(customer_id: i64, total: Cents, shipping_address: ShippingAddress) -> Self {
        Self { customer_id, total, shipping_address }
    }

    pub fn to_metadata(&self) -> HashMap<String, String> {
        let address = serde_json::to_string(&self.shipping_address).unwrap_or_default();
        HashMap::from([
            (KEY_VERSION.to_string(), METADATA_VERSION.to_string()),
            (KEY_CUSTOMER_ID.to_string(), self.customer_id.to_string()),
            (KEY_TOTAL.to_string(), self.total.value().to_string()),
            (KEY_SHIPPING_ADDRESS.to_string(), address),
        ])
    }
}

fn required<'a>(map: &'a HashMap<String, String>, key: &'static str) -> Result<&'a str, MetadataError> {
    map.get(key).map(|s| s.as_str()).filter(|s| !s.trim().is_empty()).ok_or(MetadataError::MissingField(key))
}

impl TryFrom<&HashMap<String, String>> for CheckoutMetadata {
    type Error = MetadataError;

    fn try_from(map: &HashMap<String, String>) -> Result<Self, Self::Error> {
        let version = required(map, KEY_VERSION)?;
        if version.trim() != METADATA_VERSION.to_string() {
            return Err(MetadataError::UnsupportedVersion(version.to_string()));
        }
        let customer_id = required(map, KEY_CUSTOMER_ID)?
            .trim()
            .parse::<i64>()
            .map_err(|e| MetadataError::InvalidField { field: KEY_CUSTOMER_ID, reason: e.to_string() })?;
        let total = required(map, KEY_TOTAL)?
            .parse::<Cents>()
            .map_err(|e| MetadataError::InvalidField { field: KEY_TOTAL, reason: e.to_string() })?;
        if !total.is_positive() {
            return Err(MetadataError::InvalidField { field: KEY_TOTAL, reason: format!("{total} is not positive") });
        }
        let shipping_address = serde_json::from_str::<ShippingAddress>(required(map, KEY_SHIPPING_ADDRESS)?)
            .map_err(|e| MetadataError::InvalidField { field: KEY_SHIPPING_ADDRESS, reason: e.to_string() })?;
        Ok(Self { customer_id, total, shipping_address })
    }
}

//--------------------------------------  PaymentConfirmation  -------------------------------------------------------
/// A verified "payment succeeded" notification from the payment processor.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub payment_intent_id: String,
    /// The amount the processor actually collected
    pub amount_received: Cents,
    pub metadata: CheckoutMetadata,
}

impl PaymentConfirmation {
    pub fn new(payment_intent_id: String, amount_received: Cents, metadata: CheckoutMetadata) -> Self {
        Self { payment_intent_id, amount_received, metadata }
    }

    pub fn from_raw_metadata(
        payment_intent_id: String,
        amount_received: Cents,
        metadata: &HashMap<String, String>,
    ) -> Result<Self, MetadataError> {
        let metadata = CheckoutMetadata::try_from(metadata)?;
        Ok(Self { payment_intent_id, amount_received, metadata })
    }
}

//--------------------------------------   MaterializeResult   -------------------------------------------------------
#[derive(Debug, Clone)]
pub enum MaterializeResult {
    /// A new order was created, stock was taken and the cart was emptied
    Created(Order),
    /// An order for this payment intent already exists. Nothing was changed.
    AlreadyProcessed(Order),
    /// The cart was empty (or every product in it has been deleted). Nothing was changed.
    EmptyCart,
}

impl MaterializeResult {
    pub fn order(&self) -> Option<&Order> {
        match self {
            Self::Created(o) | Self::AlreadyProcessed(o) => Some(o),
            Self::EmptyCart => None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}
