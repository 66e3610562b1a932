use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use spg_common::Cents;

pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Only present on the response to the creating call (and to secret-key holders).
    #[serde(default)]
    pub client_secret: Option<String>,
    /// The amount in the currency's minor unit
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    pub fn amount_in_cents(&self) -> Cents {
        Cents::from(self.amount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// The envelope of every webhook notification. The `data.object` payload depends on the event type, so it is kept as
/// raw JSON and converted on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    pub data: EventData,
}

impl WebhookEvent {
    pub fn is_payment_intent_succeeded(&self) -> bool {
        self.event_type == PAYMENT_INTENT_SUCCEEDED
    }

    pub fn payment_intent(&self) -> Result<PaymentIntent, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}
