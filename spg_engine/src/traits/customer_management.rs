use thiserror::Error;

use crate::db_types::{Customer, NewCustomer};

#[derive(Debug, Clone, Error)]
pub enum CustomerApiError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested customer {0} does not exist")]
    CustomerNotFound(i64),
}

impl From<sqlx::Error> for CustomerApiError {
    fn from(e: sqlx::Error) -> Self {
        CustomerApiError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait CustomerManagement {
    async fn fetch_customer(&self, id: i64) -> Result<Option<Customer>, CustomerApiError>;

    async fn fetch_customer_by_identity(&self, identity_id: &str) -> Result<Option<Customer>, CustomerApiError>;

    /// Returns the customer record for the identity provider principal, creating it if this is the principal's first
    /// visit. An existing record's email is refreshed if the identity provider now reports a different one.
    async fn fetch_or_create_customer(&self, customer: NewCustomer) -> Result<Customer, CustomerApiError>;

    /// Records the payment processor's reference for the customer. If one was already recorded (e.g. by a concurrent
    /// checkout), the existing value is kept and returned in the customer record.
    async fn set_payment_customer_id(&self, id: i64, payment_customer_id: &str) -> Result<Customer, CustomerApiError>;
}
