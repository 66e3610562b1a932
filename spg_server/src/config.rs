use std::{env, io::Write, str::FromStr, time::Duration as StdDuration};

use chrono::Duration;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde_json::json;
use spg_common::{parse_boolean_flag, Cents, Secret};
use spg_engine::{checkout_objects::Pricing, DEFAULT_TRANSACTION_TIMEOUT};
use stripe_tools::StripeConfig;
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_SPG_HOST: &str = "127.0.0.1";
const DEFAULT_SPG_PORT: u16 = 8370;
const DEFAULT_MAX_DB_CONNECTIONS: u32 = 25;
const DEFAULT_REAPER_INTERVAL: Duration = Duration::hours(1);
const DEFAULT_STALE_ORDER_THRESHOLD: Duration = Duration::hours(1);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_db_connections: u32,
    /// Database transactions that take longer than this are rolled back
    pub tx_timeout: StdDuration,
    pub auth: AuthConfig,
    /// Shipping and tax applied at checkout
    pub pricing: Pricing,
    pub reaper: ReaperConfig,
    /// Payment processor credentials and webhook settings
    pub stripe_config: StripeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SPG_HOST.to_string(),
            port: DEFAULT_SPG_PORT,
            database_url: String::default(),
            max_db_connections: DEFAULT_MAX_DB_CONNECTIONS,
            tx_timeout: DEFAULT_TRANSACTION_TIMEOUT,
            auth: AuthConfig::default(),
            pricing: Pricing::default(),
            reaper: ReaperConfig::default(),
            stripe_config: StripeConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SPG_HOST").ok().unwrap_or_else(|| DEFAULT_SPG_HOST.into());
        let port = env::var("SPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SPG_PORT. {e} Using the default, {DEFAULT_SPG_PORT}, instead."
                    );
                    DEFAULT_SPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SPG_PORT);
        let database_url = env::var("SPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SPG_DATABASE_URL is not set. Please set it to the URL for the SPG database.");
            String::default()
        });
        let max_db_connections = env_or_default("SPG_MAX_DB_CONNECTIONS", DEFAULT_MAX_DB_CONNECTIONS);
        let tx_timeout = env_or_default("SPG_TX_TIMEOUT_SECS", DEFAULT_TRANSACTION_TIMEOUT.as_secs());
        let tx_timeout = StdDuration::from_secs(tx_timeout.max(1));
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let pricing = configure_pricing();
        let reaper = ReaperConfig::from_env_or_default();
        let stripe_config = StripeConfig::new_from_env_or_default();
        Self { host, port, database_url, max_db_connections, tx_timeout, auth, pricing, reaper, stripe_config }
    }
}

/// Reads and parses an environment variable, logging (and falling back to `default`) when it is missing or invalid.
fn env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {name}: {s}. {e}. Using the default value of {default}.");
            default
        }),
        Err(_) => {
            info!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
    }
}

fn configure_pricing() -> Pricing {
    let shipping_fee = env_or_default("SPG_SHIPPING_FEE_CENTS", 0i64);
    let shipping_fee = if shipping_fee < 0 {
        warn!("🪛️ SPG_SHIPPING_FEE_CENTS cannot be negative. Shipping will be free.");
        0
    } else {
        shipping_fee
    };
    let tax_rate_bps = env_or_default("SPG_TAX_RATE_BPS", 0u32);
    let pricing = Pricing::new(Cents::from(shipping_fee), tax_rate_bps);
    info!("🪛️ Checkout pricing: shipping {} and tax at {tax_rate_bps} basis points", pricing.shipping_fee);
    pricing
}

//-------------------------------------------------  ReaperConfig  ----------------------------------------------------
#[derive(Clone, Debug)]
pub struct ReaperConfig {
    pub enabled: bool,
    /// Time between sweeps
    pub interval: Duration,
    /// Unpaid, pending orders at least this old are cancelled
    pub stale_order_threshold: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self { enabled: true, interval: DEFAULT_REAPER_INTERVAL, stale_order_threshold: DEFAULT_STALE_ORDER_THRESHOLD }
    }
}

impl ReaperConfig {
    pub fn from_env_or_default() -> Self {
        let enabled = parse_boolean_flag(env::var("SPG_REAPER_ENABLED").ok(), true);
        if !enabled {
            warn!("🪛️ The stale order reaper is disabled. Abandoned orders will hold on to their stock.");
        }
        let interval = env_or_default("SPG_REAPER_INTERVAL_MINS", DEFAULT_REAPER_INTERVAL.num_minutes());
        let interval = if interval < 1 {
            warn!("🪛️ SPG_REAPER_INTERVAL_MINS must be at least 1. Using 1 minute.");
            Duration::minutes(1)
        } else {
            Duration::minutes(interval)
        };
        let threshold =
            env_or_default("SPG_STALE_ORDER_THRESHOLD_MINS", DEFAULT_STALE_ORDER_THRESHOLD.num_minutes()).max(0);
        Self { enabled, interval, stale_order_threshold: Duration::minutes(threshold) }
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret shared with the identity provider. Tokens signed with anything else are rejected.
    pub jwt_secret: Secret<String>,
    /// When set, tokens must carry a matching `iss` claim
    pub issuer: Option<String>,
    /// When set, tokens must carry a matching `aud` claim
    pub audience: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. No identity provider \
             tokens will be accepted. DO NOT operate on production like this. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        match &mut tmpfile {
            Some((f, p)) => {
                let key_data = json!({ "jwt_secret": secret }).to_string();
                match writeln!(f, "{key_data}") {
                    Ok(()) => warn!(
                        "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, \
                         you are doing it wrong! Set the SPG_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                        p.to_str().unwrap_or("???")
                    ),
                    Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
                }
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret. ");
            },
        }
        Self { jwt_secret: Secret::new(secret), issuer: None, audience: None }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self { jwt_secret: Secret::new(secret.into()), issuer: None, audience: None }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("SPG_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [SPG_JWT_SECRET]")))?;
        if secret.trim().len() < 16 {
            return Err(ServerError::ConfigurationError(
                "SPG_JWT_SECRET is too short. Use at least 16 characters.".to_string(),
            ));
        }
        let issuer = env::var("SPG_JWT_ISSUER").ok().filter(|s| !s.trim().is_empty());
        let audience = env::var("SPG_JWT_AUDIENCE").ok().filter(|s| !s.trim().is_empty());
        if issuer.is_none() {
            info!("🪛️ SPG_JWT_ISSUER is not set. Tokens from any issuer signed with the shared secret are accepted.");
        }
        Ok(Self { jwt_secret: Secret::new(secret), issuer, audience })
    }
}
