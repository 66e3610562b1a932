use std::{collections::HashMap, sync::Arc};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize};
use spg_common::Cents;

use crate::{config::StripeConfig, PaymentIntent, StripeApiError, StripeCustomer};

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl std::fmt::Debug for StripeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StripeApi ({})", self.config.api_base)
    }
}

/// Stripe encodes nested parameters with brackets, e.g. `metadata[order_ref]=42`.
fn metadata_params(metadata: &HashMap<String, String>) -> Vec<(String, String)> {
    let mut params = metadata.iter().map(|(k, v)| (format!("metadata[{k}]"), v.clone())).collect::<Vec<_>>();
    params.sort();
    params
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let val = HeaderValue::from_str(&format!("Bearer {}", config.api_key.reveal()))
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base.trim_end_matches('/'))
    }

    /// Sends a form-encoded request, which is the only body encoding the REST API accepts.
    pub async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {method} {url}");
        let mut req = self.client.request(method.clone(), url);
        if !form.is_empty() {
            req = if method == Method::GET { req.query(form) } else { req.form(form) };
        }
        let response = req.send().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            #[derive(Deserialize)]
            struct ErrorBody {
                message: Option<String>,
            }
            #[derive(Deserialize)]
            struct ErrorResponse {
                error: ErrorBody,
            }
            let status = response.status().as_u16();
            let text = response.text().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
            let message = serde_json::from_str::<ErrorResponse>(&text).ok().and_then(|e| e.error.message).unwrap_or(text);
            Err(StripeApiError::QueryError { status, message })
        }
    }

    pub async fn create_customer(
        &self,
        email: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<StripeCustomer, StripeApiError> {
        let mut form = vec![("email".to_string(), email.to_string())];
        form.extend(metadata_params(metadata));
        debug!("Creating payment customer for {email}");
        let customer = self.rest_query::<StripeCustomer>(Method::POST, "/customers", &form).await?;
        info!("Created payment customer {} for {email}", customer.id);
        Ok(customer)
    }

    pub async fn create_payment_intent(
        &self,
        amount: Cents,
        customer: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<PaymentIntent, StripeApiError> {
        if !amount.is_positive() {
            return Err(StripeApiError::InvalidCurrencyAmount(format!("{amount} is not a chargeable amount")));
        }
        let mut form = vec![
            ("amount".to_string(), amount.value().to_string()),
            ("currency".to_string(), self.config.currency.clone()),
            ("customer".to_string(), customer.to_string()),
            ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
        ];
        form.extend(metadata_params(metadata));
        debug!("Creating payment intent for {amount} ({customer})");
        let intent = self.rest_query::<PaymentIntent>(Method::POST, "/payment_intents", &form).await?;
        info!("Created payment intent {} for {amount}", intent.id);
        Ok(intent)
    }
}
