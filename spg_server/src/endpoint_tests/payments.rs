use std::collections::HashMap;

use actix_web::{
    http::{Method, StatusCode},
    web,
    web::ServiceConfig,
};
use chrono::Utc;
use serde_json::{json, Value};
use spg_common::Secret;
use spg_engine::{
    checkout_objects::{PaymentIntentCreated, Pricing},
    db_types::{Cart, CartLine, Cents, Json, Order, OrderStatusType, PaymentStatus, Product, ShippingAddress},
    order_objects::{CheckoutMetadata, MaterializeResult, KEY_VERSION},
    CheckoutApi,
    CustomerApi,
    OrderFlowApi,
    OrderFlowError,
};
use stripe_tools::webhook::{sign_payload, SIGNATURE_HEADER};

use super::helpers::{customer, customer_token, post_raw, send_request};
use crate::{
    endpoint_tests::mocks::{MockCheckoutDb, MockOrderManager, MockProcessor},
    integrations::stripe::WebhookVerifier,
    payment_routes::{CreatePaymentIntentRoute, PaymentWebhookRoute},
};

const WEBHOOK_SECRET: &str = "whsec_endpoint_tests";

//----------------------------------------------   Payment intents  ----------------------------------------------------
#[actix_web::test]
async fn create_payment_intent_no_token() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "shipping_address": address() });
    let err = send_request(Method::POST, "", "/payment-intent", Some(body), configure_rejected_checkout)
        .await
        .expect_err("Expected error");
    assert_eq!(err, "Authentication Error. No bearer token was provided.");
}

#[actix_web::test]
async fn create_payment_intent() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "shipping_address": address() });
    let (status, body) = send_request(Method::POST, &customer_token(), "/payment-intent", Some(body), configure_checkout)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["client_secret"], "pi_123_secret_abc");
    assert_eq!(result["payment_intent_id"], "pi_123");
    assert_eq!(result["summary"]["subtotal"], 4_448);
    assert_eq!(result["summary"]["tax"], 367);
    assert_eq!(result["summary"]["shipping"], 500);
    assert_eq!(result["summary"]["total"], 5_315);
}

#[actix_web::test]
async fn create_payment_intent_incomplete_address() {
    let _ = env_logger::try_init().ok();
    let mut address = address();
    address.city = String::new();
    let body = json!({ "shipping_address": address });
    let (status, body) =
        send_request(Method::POST, &customer_token(), "/payment-intent", Some(body), configure_rejected_checkout)
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("The shipping address is missing these fields: city"), "{body}");
}

fn configure_checkout(cfg: &mut ServiceConfig) {
    checkout_services(cfg, 1);
}

// Requests that are turned away before the processor is contacted
fn configure_rejected_checkout(cfg: &mut ServiceConfig) {
    checkout_services(cfg, 0);
}

fn checkout_services(cfg: &mut ServiceConfig, processor_calls: usize) {
    let mut customers = MockCheckoutDb::new();
    customers.expect_fetch_or_create_customer().returning(|c| Ok(customer(1, &c.identity_id)));
    let mut db = MockCheckoutDb::new();
    db.expect_fetch_cart().returning(|id| {
        Ok(Cart {
            id: Some(1),
            customer_id: id,
            lines: vec![
                CartLine { product_id: 1, quantity: 2, product: Some(product(1, 1_999)) },
                CartLine { product_id: 2, quantity: 1, product: Some(product(2, 450)) },
            ],
        })
    });
    db.expect_set_payment_customer_id().times(processor_calls).returning(|id, reference| {
        let mut customer = customer(id, "auth0|customer-1");
        customer.payment_customer_id = Some(reference.to_string());
        Ok(customer)
    });
    let mut processor = MockProcessor::new();
    processor.expect_create_customer().times(processor_calls).returning(|_, _| Ok("cus_123".to_string()));
    processor
        .expect_create_payment_intent()
        .times(processor_calls)
        .withf(|amount, customer_ref, metadata| {
            *amount == Cents::from(5_315) &&
                customer_ref.to_string() == "cus_123" &&
                metadata.get("customer_id").map(String::as_str) == Some("1")
        })
        .returning(|_, _, _| {
            Ok(PaymentIntentCreated { id: "pi_123".to_string(), client_secret: "pi_123_secret_abc".to_string() })
        });
    let pricing = Pricing::new(Cents::from(500), 825);
    cfg.service(CreatePaymentIntentRoute::<MockCheckoutDb, MockProcessor>::new())
        .app_data(web::Data::new(CustomerApi::new(customers)))
        .app_data(web::Data::new(CheckoutApi::new(db, processor, pricing)));
}

//----------------------------------------------   Webhook  ----------------------------------------------------
#[actix_web::test]
async fn webhook_without_signature() {
    let _ = env_logger::try_init().ok();
    let payload = event("payment_intent.succeeded", "pi_created", metadata());
    let (status, body) = post_raw("/payment-webhook", vec![], payload, configure_webhook).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Missing Stripe-Signature header"), "{body}");
}

#[actix_web::test]
async fn webhook_with_bad_signature() {
    let _ = env_logger::try_init().ok();
    let payload = event("payment_intent.succeeded", "pi_created", metadata());
    let header = sign_payload(&payload, "whsec_someone_else", Utc::now().timestamp()).unwrap();
    let (status, _) = post_raw("/payment-webhook", vec![(SIGNATURE_HEADER, header)], payload, configure_webhook)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn webhook_creates_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = signed_webhook(event("payment_intent.succeeded", "pi_created", metadata())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"Order 10 created."}"#);
}

#[actix_web::test]
async fn webhook_is_idempotent() {
    let _ = env_logger::try_init().ok();
    let (status, body) = signed_webhook(event("payment_intent.succeeded", "pi_duplicate", metadata())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"Order already exists."}"#);
}

#[actix_web::test]
async fn webhook_with_empty_cart() {
    let _ = env_logger::try_init().ok();
    let (status, body) = signed_webhook(event("payment_intent.succeeded", "pi_empty", metadata())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":false,"message":"The cart is empty. No order was created."}"#);
}

#[actix_web::test]
async fn webhook_reports_failures_with_200() {
    let _ = env_logger::try_init().ok();
    let (status, body) = signed_webhook(event("payment_intent.succeeded", "pi_out_of_stock", metadata())).await;
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["success"], false);
    assert!(result["message"].as_str().unwrap().starts_with("Insufficient stock for product 1"));
}

#[actix_web::test]
async fn webhook_acknowledges_signed_garbage() {
    let _ = env_logger::try_init().ok();
    let (status, body) = signed_webhook(b"not an event".to_vec()).await;
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["success"], false);
    assert!(result["message"].as_str().unwrap().starts_with("Unreadable payment notification."), "{body}");
}

#[actix_web::test]
async fn webhook_ignores_other_events() {
    let _ = env_logger::try_init().ok();
    let (status, body) = signed_webhook(event("payment_intent.payment_failed", "pi_created", metadata())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"Event type payment_intent.payment_failed ignored."}"#);
}

#[actix_web::test]
async fn webhook_with_bad_metadata() {
    let _ = env_logger::try_init().ok();
    let mut meta = metadata();
    meta.remove(KEY_VERSION);
    let (status, body) = signed_webhook(event("payment_intent.succeeded", "pi_created", meta)).await;
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["success"], false);
}

async fn signed_webhook(payload: Vec<u8>) -> (StatusCode, String) {
    let header = sign_payload(&payload, WEBHOOK_SECRET, Utc::now().timestamp()).unwrap();
    post_raw("/payment-webhook", vec![(SIGNATURE_HEADER, header)], payload, configure_webhook)
        .await
        .expect("Request failed")
}

fn configure_webhook(cfg: &mut ServiceConfig) {
    let mut orders = MockOrderManager::new();
    orders.expect_materialize_order().returning(|confirmation| match confirmation.payment_intent_id.as_str() {
        "pi_created" => Ok(MaterializeResult::Created(order(10, &confirmation.payment_intent_id))),
        "pi_duplicate" => Ok(MaterializeResult::AlreadyProcessed(order(9, &confirmation.payment_intent_id))),
        "pi_empty" => Ok(MaterializeResult::EmptyCart),
        _ => Err(OrderFlowError::InsufficientStock { product_id: 1, requested: 2, available: 1 }),
    });
    let verifier = WebhookVerifier::new(Secret::new(WEBHOOK_SECRET.to_string()), 300);
    cfg.service(PaymentWebhookRoute::<MockOrderManager>::new())
        .app_data(web::Data::new(verifier))
        .app_data(web::Data::new(OrderFlowApi::new(orders)));
}

fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Ada Lovelace".into(),
        line1: "12 St James's Square".into(),
        city: "London".into(),
        postal_code: "SW1Y 4JH".into(),
        country: "GB".into(),
        ..Default::default()
    }
}

fn metadata() -> HashMap<String, String> {
    CheckoutMetadata::new(1, Cents::from(5_315), address()).to_metadata()
}

fn event(event_type: &str, intent_id: &str, metadata: HashMap<String, String>) -> Vec<u8> {
    json!({
        "id": "evt_1",
        "type": event_type,
        "created": 1_700_000_000,
        "data": { "object": {
            "id": intent_id,
            "amount": 5_315,
            "amount_received": 5_315,
            "currency": "usd",
            "status": "succeeded",
            "metadata": metadata,
        }}
    })
    .to_string()
    .into_bytes()
}

fn product(id: i64, price: i64) -> Product {
    Product {
        id,
        name: format!("Product {id}"),
        description: String::new(),
        price: Cents::from(price),
        stock: 10,
        image: String::new(),
        ratings_average: 0.0,
        ratings_quantity: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn order(id: i64, intent_id: &str) -> Order {
    Order {
        id,
        customer_id: 1,
        total_amount: Cents::from(5_315),
        shipping_address: Json(address()),
        payment_status: PaymentStatus::Paid,
        order_status: OrderStatusType::Pending,
        payment_intent_id: Some(intent_id.to_string()),
        stock_committed: true,
        shipped_at: None,
        delivered_at: None,
        cancelled_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        items: vec![],
    }
}
