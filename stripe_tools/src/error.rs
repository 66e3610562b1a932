use thiserror::Error;

#[derive(Debug, Error)]
pub enum StripeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Invalid currency amount: {0}")]
    InvalidCurrencyAmount(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookSignatureError {
    #[error("The signature header is missing or empty")]
    MissingHeader,
    #[error("The signature header does not contain a timestamp")]
    MissingTimestamp,
    #[error("The signature header does not contain any v1 signatures")]
    MissingSignature,
    #[error("The signature timestamp is not a valid unix time: {0}")]
    InvalidTimestamp(String),
    #[error("The signature timestamp {timestamp} is outside the tolerance window ({tolerance}s) of {now}")]
    TimestampOutsideTolerance { timestamp: i64, now: i64, tolerance: i64 },
    #[error("No signature in the header matches the payload")]
    SignatureMismatch,
    #[error("The webhook secret cannot be used as an HMAC key")]
    InvalidSecret,
    #[error("The payload is not a valid webhook event: {0}")]
    InvalidPayload(String),
}
