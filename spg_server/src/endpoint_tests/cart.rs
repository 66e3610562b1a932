use actix_web::{
    http::{Method, StatusCode},
    web,
    web::ServiceConfig,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use spg_engine::{
    db_types::{Cart, CartLine, Cents, Product, Role},
    CartApi,
    CartApiError,
    CustomerApi,
};

use super::helpers::{customer, customer_token, get_request, issue_token, send_request, CUSTOMER_IDENTITY};
use crate::{
    endpoint_tests::mocks::{MockCartManager, MockCustomerManager},
    routes::{AddCartItemRoute, ClearCartRoute, MyCartRoute, UpdateCartItemRoute},
};

#[actix_web::test]
async fn fetch_cart_no_token() {
    let _ = env_logger::try_init().ok();
    let err = get_request("", "/cart", configure).await.expect_err("Expected error");
    assert_eq!(err, "Authentication Error. No bearer token was provided.");
}

#[actix_web::test]
async fn fetch_cart_expired_token() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(CUSTOMER_IDENTITY, Role::Customer, Utc::now() - Duration::days(1));
    let err = get_request(&token, "/cart", configure).await.expect_err("Expected error");
    assert!(err.starts_with("Authentication Error. Access token is invalid."), "{err}");
}

#[actix_web::test]
async fn fetch_cart_wrong_secret() {
    let _ = env_logger::try_init().ok();
    let mut token = customer_token();
    token.replace_range(token.len() - 10..token.len() - 5, "AAAAA");
    let err = get_request(&token, "/cart", configure).await.expect_err("Expected error");
    assert!(err.starts_with("Authentication Error."), "{err}");
}

#[actix_web::test]
async fn fetch_my_cart() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&customer_token(), "/cart", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let cart: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(cart["customer_id"], 1);
    assert_eq!(cart["lines"][0]["product_id"], 5);
    assert_eq!(cart["lines"][0]["quantity"], 2);
    assert_eq!(cart["lines"][0]["product"]["price"], 1_250);
    // deleted products stay in the cart, flagged by a missing product
    assert_eq!(cart["lines"][1]["product"], Value::Null);
}

#[actix_web::test]
async fn add_item_defaults_to_one() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "product_id": 5 });
    let (status, body) = send_request(Method::POST, &customer_token(), "/cart/items", Some(body), configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let cart: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(cart["lines"][0]["quantity"], 1);
}

#[actix_web::test]
async fn add_item_zero_quantity() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "product_id": 5, "quantity": 0 });
    let (status, body) = send_request(Method::POST, &customer_token(), "/cart/items", Some(body), configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Quantity must be at least 1, but was 0"), "{body}");
}

#[actix_web::test]
async fn add_item_huge_quantity() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "product_id": 5, "quantity": i64::MAX });
    let (status, body) = send_request(Method::POST, &customer_token(), "/cart/items", Some(body), configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("A cart line may hold at most 10000 of a product"), "{body}");
}

#[actix_web::test]
async fn update_item_not_in_cart() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "quantity": 3 });
    let (status, body) = send_request(Method::PATCH, &customer_token(), "/cart/items/99", Some(body), configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. Product 99 is not in the cart"}"#);
}

#[actix_web::test]
async fn clear_my_cart() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        send_request(Method::DELETE, &customer_token(), "/cart", None, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let cart: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(cart["lines"].as_array().map(|l| l.len()), Some(0));
}

fn configure(cfg: &mut ServiceConfig) {
    let mut customers = MockCustomerManager::new();
    customers.expect_fetch_or_create_customer().returning(|c| Ok(customer(1, &c.identity_id)));
    let mut carts = MockCartManager::new();
    carts.expect_fetch_cart().returning(|id| Ok(cart_response(id)));
    carts.expect_add_item().withf(|c, p, q| *c == 1 && *p == 5 && *q == 1).returning(|c, p, q| {
        let mut cart = Cart::empty(c);
        cart.id = Some(1);
        cart.lines.push(CartLine { product_id: p, quantity: q, product: Some(product(p)) });
        Ok(cart)
    });
    carts.expect_set_item_quantity().returning(|_, p, _| Err(CartApiError::ItemNotInCart(p)));
    carts.expect_clear_cart().returning(|c| Ok(Cart { id: Some(1), ..Cart::empty(c) }));
    cfg.service(MyCartRoute::<MockCustomerManager, MockCartManager>::new())
        .service(AddCartItemRoute::<MockCustomerManager, MockCartManager>::new())
        .service(UpdateCartItemRoute::<MockCustomerManager, MockCartManager>::new())
        .service(ClearCartRoute::<MockCustomerManager, MockCartManager>::new())
        .app_data(web::Data::new(CustomerApi::new(customers)))
        .app_data(web::Data::new(CartApi::new(carts)));
}

fn product(id: i64) -> Product {
    Product {
        id,
        name: format!("Widget {id}"),
        description: String::new(),
        price: Cents::from(1_250),
        stock: 10,
        image: String::new(),
        ratings_average: 0.0,
        ratings_quantity: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// Mock response to `fetch_cart`
fn cart_response(customer_id: i64) -> Cart {
    Cart {
        id: Some(1),
        customer_id,
        lines: vec![
            CartLine { product_id: 5, quantity: 2, product: Some(product(5)) },
            CartLine { product_id: 6, quantity: 1, product: None },
        ],
    }
}
