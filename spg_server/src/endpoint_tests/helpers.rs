use actix_web::{
    body::MessageBody,
    http::{Method, StatusCode},
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use log::debug;
use serde_json::Value;
use spg_engine::db_types::{Customer, Role};

use crate::{
    auth::{JwtClaims, TokenValidator},
    config::AuthConfig,
    middleware::IdentityMiddlewareFactory,
};

// Test-only secret for issuing tokens. DO NOT re-use it anywhere.
const TEST_JWT_SECRET: &str = "endpoint-tests-only-9f3b2c1d7e";

pub const CUSTOMER_IDENTITY: &str = "auth0|customer-1";
pub const ADMIN_IDENTITY: &str = "auth0|admin-1";

pub fn get_auth_config() -> AuthConfig {
    AuthConfig::new(TEST_JWT_SECRET)
}

pub fn issue_token(sub: &str, role: Role, expiry: DateTime<Utc>) -> String {
    let claims = JwtClaims {
        sub: sub.to_string(),
        email: Some(format!("{}@example.com", sub.replace('|', "."))),
        name: None,
        role,
        exp: expiry.timestamp().max(0) as u64,
        iss: None,
        aud: None,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()))
        .expect("Failed to sign token")
}

pub fn customer_token() -> String {
    issue_token(CUSTOMER_IDENTITY, Role::Customer, Utc::now() + chrono::Duration::days(1))
}

pub fn admin_token() -> String {
    issue_token(ADMIN_IDENTITY, Role::Admin, Utc::now() + chrono::Duration::days(1))
}

/// The customer record the mocks hand back for the principal in a token
pub fn customer(id: i64, identity_id: &str) -> Customer {
    Customer {
        id,
        identity_id: identity_id.to_string(),
        email: format!("{}@example.com", identity_id.replace('|', ".")),
        name: None,
        payment_customer_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub async fn get_request(
    token: &str,
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    send_request(Method::GET, token, path, None, configure).await
}

/// Calls an authenticated route. Errors raised by the middleware (bad tokens, missing roles) come back as `Err`, while
/// handler errors are rendered into a response as usual.
pub async fn send_request(
    method: Method,
    token: &str,
    path: &str,
    body: Option<Value>,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::default().method(method).uri(path);
    if !token.is_empty() {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    if let Some(body) = body {
        req = req.set_json(body);
    }
    let req = req.to_request();
    let validator = TokenValidator::new(&get_auth_config());
    let app = App::new().wrap(IdentityMiddlewareFactory::new(validator)).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

/// Calls a route that sits outside the authenticated scope, with the given raw body and headers.
pub async fn post_raw(
    path: &str,
    headers: Vec<(&'static str, String)>,
    body: Vec<u8>,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::post().uri(path);
    for header in headers {
        req = req.insert_header(header);
    }
    let req = req.set_payload(body).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}
