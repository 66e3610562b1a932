use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Customer, NewCustomer},
    traits::{CustomerApiError, CustomerManagement},
};

pub struct CustomerApi<B> {
    db: B,
}

impl<B> Debug for CustomerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CustomerApi")
    }
}

impl<B> CustomerApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> CustomerApi<B>
where B: CustomerManagement
{
    /// Returns the customer record for an authenticated principal, creating it on the principal's first request.
    pub async fn customer_for_principal(
        &self,
        identity_id: &str,
        email: Option<&str>,
        name: Option<&str>,
    ) -> Result<Customer, CustomerApiError> {
        let new_customer = NewCustomer {
            identity_id: identity_id.to_string(),
            email: email.unwrap_or_default().to_string(),
            name: name.map(String::from),
        };
        let customer = self.db.fetch_or_create_customer(new_customer).await?;
        trace!("👤️ Principal {identity_id} is customer #{}", customer.id);
        Ok(customer)
    }

    pub async fn fetch_customer(&self, id: i64) -> Result<Option<Customer>, CustomerApiError> {
        self.db.fetch_customer(id).await
    }
}
