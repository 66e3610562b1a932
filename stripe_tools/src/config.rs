use log::*;
use spg_common::{Secret, DEFAULT_CURRENCY_CODE};

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
/// Stripe's own libraries reject events signed more than five minutes ago.
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub api_base: String,
    pub api_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    pub currency: String,
    pub webhook_tolerance_secs: i64,
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_base = std::env::var("SPG_STRIPE_API_BASE").unwrap_or_else(|_| {
            debug!("SPG_STRIPE_API_BASE not set, using {DEFAULT_STRIPE_API_BASE}");
            DEFAULT_STRIPE_API_BASE.to_string()
        });
        let api_key = Secret::new(std::env::var("SPG_STRIPE_API_KEY").unwrap_or_else(|_| {
            warn!("SPG_STRIPE_API_KEY not set, using (probably useless) default");
            "sk_test_000000000000".to_string()
        }));
        let webhook_secret = Secret::new(std::env::var("SPG_STRIPE_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("SPG_STRIPE_WEBHOOK_SECRET not set, using (probably useless) default");
            "whsec_000000000000".to_string()
        }));
        let currency = std::env::var("SPG_STRIPE_CURRENCY").map(|s| s.to_ascii_lowercase()).unwrap_or_else(|_| {
            debug!("SPG_STRIPE_CURRENCY not set, using {DEFAULT_CURRENCY_CODE}");
            DEFAULT_CURRENCY_CODE.to_string()
        });
        let webhook_tolerance_secs = std::env::var("SPG_STRIPE_WEBHOOK_TOLERANCE_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("Invalid value for SPG_STRIPE_WEBHOOK_TOLERANCE_SECS: {s}. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_WEBHOOK_TOLERANCE_SECS);
        Self { api_base, api_key, webhook_secret, currency, webhook_tolerance_secs }
    }
}
