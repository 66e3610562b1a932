use actix_web::{
    http::{Method, StatusCode},
    web,
    web::ServiceConfig,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use spg_engine::{
    db_types::{Cents, Json, Order, OrderItem, OrderStatusType, PaymentStatus, ShippingAddress},
    CustomerApi,
    OrderFlowApi,
    OrderFlowError,
};

use super::helpers::{admin_token, customer, customer_token, get_request, send_request, CUSTOMER_IDENTITY};
use crate::{
    endpoint_tests::mocks::{MockCustomerManager, MockOrderManager},
    routes::{ManualOrderRoute, MyOrdersRoute, OrderByIdRoute, OrdersSearchRoute, UpdateOrderStatusRoute},
};

#[actix_web::test]
async fn fetch_my_orders_no_token() {
    let _ = env_logger::try_init().ok();
    let err = get_request("", "/orders", configure).await.expect_err("Expected error");
    assert_eq!(err, "Authentication Error. No bearer token was provided.");
}

#[actix_web::test]
async fn fetch_my_orders() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&customer_token(), "/orders", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let orders: Value = serde_json::from_str(&body).unwrap();
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], 10);
    assert_eq!(orders[0]["total_amount"], 4_500);
    assert_eq!(orders[0]["order_status"], "processing");
    assert_eq!(orders[0]["shipping_address"]["city"], "London");
    assert_eq!(orders[0]["items"][0]["name"], "Widget");
}

#[actix_web::test]
async fn fetch_own_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&customer_token(), "/orders/10", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let order: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(order["customer_id"], 1);
}

#[actix_web::test]
async fn try_fetch_another_customers_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&customer_token(), "/orders/20", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. Order 20"}"#);
}

#[actix_web::test]
async fn fetch_another_customers_order_as_admin() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&admin_token(), "/orders/20", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let order: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(order["customer_id"], 3);
}

#[actix_web::test]
async fn fetch_missing_order() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request(&admin_token(), "/orders/999", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn manual_order_requires_admin() {
    let _ = env_logger::try_init().ok();
    let err = send_request(Method::POST, &customer_token(), "/orders/manual", Some(manual_order_body(2)), configure)
        .await
        .expect_err("Customers cannot create manual orders");
    assert_eq!(err, "Authentication Error. Insufficient Permissions. Requires admin");
}

#[actix_web::test]
async fn manual_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        send_request(Method::POST, &admin_token(), "/orders/manual", Some(manual_order_body(2)), configure)
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let order: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(order["id"], 30);
    assert_eq!(order["customer_id"], 3);
    assert_eq!(order["payment_status"], "paid");
    assert_eq!(order["order_status"], "pending");
    assert_eq!(order["stock_committed"], true);
}

#[actix_web::test]
async fn manual_order_zero_quantity() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        send_request(Method::POST, &admin_token(), "/orders/manual", Some(manual_order_body(0)), configure)
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid quantity 0 for product 5"), "{body}");
}

#[actix_web::test]
async fn update_status() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "status": "Shipped" });
    let (status, body) = send_request(Method::PATCH, &admin_token(), "/orders/10/status", Some(body), configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let order: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(order["order_status"], "shipped");
    assert!(order["shipped_at"].is_string());
}

#[actix_web::test]
async fn update_status_unknown_value() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "status": "lost" });
    let (status, body) = send_request(Method::PATCH, &admin_token(), "/orders/10/status", Some(body), configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid order status: lost"), "{body}");
}

#[actix_web::test]
async fn update_status_backwards() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "status": "pending" });
    let (status, body) = send_request(Method::PATCH, &admin_token(), "/orders/10/status", Some(body), configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid order status. An order cannot move from processing to pending"}"#);
}

#[actix_web::test]
async fn update_status_as_customer() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "status": "cancelled" });
    let err = send_request(Method::PATCH, &customer_token(), "/orders/10/status", Some(body), configure)
        .await
        .expect_err("Customers cannot change order status");
    assert_eq!(err, "Authentication Error. Insufficient Permissions. Requires admin");
}

#[actix_web::test]
async fn search_orders() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "order_status": ["pending", "processing"] });
    let (status, body) = send_request(Method::POST, &admin_token(), "/orders/search", Some(body), configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let orders: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.as_array().map(|o| o.len()), Some(2));
}

#[actix_web::test]
async fn search_orders_unknown_field() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "colour": "red" });
    let (status, _) = send_request(Method::POST, &admin_token(), "/orders/search", Some(body), configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn configure(cfg: &mut ServiceConfig) {
    let mut customers = MockCustomerManager::new();
    customers.expect_fetch_or_create_customer().returning(|c| {
        let id = if c.identity_id == CUSTOMER_IDENTITY { 1 } else { 2 };
        Ok(customer(id, &c.identity_id))
    });
    let mut orders = MockOrderManager::new();
    orders.expect_search_orders().returning(|query| {
        let all = vec![order(10, 1, OrderStatusType::Processing), order(20, 3, OrderStatusType::Pending)];
        let found = all
            .into_iter()
            .filter(|o| query.customer_id.map(|id| id == o.customer_id).unwrap_or(true))
            .filter(|o| query.order_status.as_ref().map(|s| s.contains(&o.order_status)).unwrap_or(true))
            .collect();
        Ok(found)
    });
    orders.expect_fetch_order().returning(|id| match id {
        10 => Ok(Some(order(10, 1, OrderStatusType::Processing))),
        20 => Ok(Some(order(20, 3, OrderStatusType::Pending))),
        _ => Ok(None),
    });
    orders.expect_insert_manual_order().returning(|new_order| {
        let mut order = order(30, new_order.customer_id, new_order.order_status);
        order.payment_status = new_order.payment_status;
        order.total_amount = new_order.total_amount;
        Ok(order)
    });
    orders.expect_update_order_status().returning(|id, status, now| {
        let mut order = order(id, 1, OrderStatusType::Processing);
        order.order_status.transition_to(status)?;
        order.order_status = status;
        if status == OrderStatusType::Shipped {
            order.shipped_at = Some(now);
        }
        Ok::<_, OrderFlowError>(order)
    });
    cfg.service(MyOrdersRoute::<MockCustomerManager, MockOrderManager>::new())
        .service(ManualOrderRoute::<MockOrderManager>::new())
        .service(OrdersSearchRoute::<MockOrderManager>::new())
        .service(OrderByIdRoute::<MockCustomerManager, MockOrderManager>::new())
        .service(UpdateOrderStatusRoute::<MockOrderManager>::new())
        .app_data(web::Data::new(CustomerApi::new(customers)))
        .app_data(web::Data::new(OrderFlowApi::new(orders)));
}

fn manual_order_body(quantity: i64) -> Value {
    json!({
        "customer_id": 3,
        "items": [{ "product_id": 5, "quantity": quantity }],
        "shipping_address": address(),
        "total_amount": 4_500,
        "payment_status": "paid"
    })
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

// Mock order as the backend would return it
fn order(id: i64, customer_id: i64, status: OrderStatusType) -> Order {
    let created_at = Utc.with_ymd_and_hms(2024, 6, 12, 13, 30, 0).unwrap();
    Order {
        id,
        customer_id,
        total_amount: Cents::from(4_500),
        shipping_address: Json(address()),
        payment_status: PaymentStatus::Paid,
        order_status: status,
        payment_intent_id: Some(format!("pi_{id}")),
        stock_committed: true,
        shipped_at: None,
        delivered_at: None,
        cancelled_at: None,
        created_at,
        updated_at: created_at,
        items: vec![OrderItem {
            id: 1,
            order_id: id,
            product_id: 5,
            name: "Widget".into(),
            price: Cents::from(2_250),
            quantity: 2,
            image: String::new(),
        }],
    }
}
