use actix_web::{
    http::{Method, StatusCode},
    web,
    web::ServiceConfig,
};
use chrono::Utc;
use serde_json::{json, Value};
use spg_engine::{
    db_types::{Cents, Product, Review},
    CustomerApi,
    ReviewApi,
    ReviewApiError,
};

use super::helpers::{admin_token, customer, customer_token, get_request, send_request, CUSTOMER_IDENTITY};
use crate::{
    endpoint_tests::mocks::{MockCustomerManager, MockReviewManager},
    routes::{CreateReviewRoute, DeleteReviewRoute, ProductReviewsRoute, UpdateReviewRoute},
};

#[actix_web::test]
async fn product_reviews() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&customer_token(), "/products/5/reviews", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let reviews: Value = serde_json::from_str(&body).unwrap();
    let reviews = reviews.as_array().unwrap();
    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[0]["rating"], 4);
    assert_eq!(reviews[1]["comment"], Value::Null);
}

#[actix_web::test]
async fn create_review() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "product_id": 5, "order_id": 10, "rating": 5, "comment": "Sturdy" });
    let (status, body) =
        send_request(Method::POST, &customer_token(), "/reviews", Some(body), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["review"]["customer_id"], 1);
    assert_eq!(result["review"]["rating"], 5);
    assert_eq!(result["product"]["ratings_quantity"], 3);
    assert_eq!(result["product"]["ratings_average"], 4.3);
}

#[actix_web::test]
async fn create_review_out_of_range() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "product_id": 5, "order_id": 10, "rating": 6 });
    let (status, body) =
        send_request(Method::POST, &customer_token(), "/reviews", Some(body), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("A rating must be between 1 and 5, but was 6"), "{body}");
}

#[actix_web::test]
async fn create_review_for_undelivered_order() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "product_id": 5, "order_id": 11, "rating": 3 });
    let (status, body) =
        send_request(Method::POST, &customer_token(), "/reviews", Some(body), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Only delivered orders can be reviewed"), "{body}");
}

#[actix_web::test]
async fn review_product_twice() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "product_id": 6, "order_id": 10, "rating": 3 });
    let (status, _) =
        send_request(Method::POST, &customer_token(), "/reviews", Some(body), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn empty_review_update() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_request(Method::PATCH, &customer_token(), "/reviews/1", Some(json!({})), configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("The review update would result in a no-op"), "{body}");
}

#[actix_web::test]
async fn update_someone_elses_review() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "rating": 1 });
    let (status, _) = send_request(Method::PATCH, &customer_token(), "/reviews/2", Some(body), configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn delete_own_review() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        send_request(Method::DELETE, &customer_token(), "/reviews/1", None, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"Review 1 deleted"}"#);
}

#[actix_web::test]
async fn delete_someone_elses_review() {
    let _ = env_logger::try_init().ok();
    let (status, _) =
        send_request(Method::DELETE, &customer_token(), "/reviews/2", None, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn admin_deletes_any_review() {
    let _ = env_logger::try_init().ok();
    let (status, _) =
        send_request(Method::DELETE, &admin_token(), "/reviews/2", None, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
}

fn configure(cfg: &mut ServiceConfig) {
    let mut customers = MockCustomerManager::new();
    customers.expect_fetch_or_create_customer().returning(|c| {
        let id = if c.identity_id == CUSTOMER_IDENTITY { 1 } else { 2 };
        Ok(customer(id, &c.identity_id))
    });
    let mut reviews = MockReviewManager::new();
    reviews
        .expect_fetch_reviews_for_product()
        .returning(|product_id| Ok(vec![review(1, product_id, 1, 4, Some("Nice")), review(2, product_id, 3, 5, None)]));
    reviews.expect_insert_review().returning(|r| match (r.order_id, r.product_id) {
        (11, _) => Err(ReviewApiError::OrderNotEligible),
        (_, 6) => Err(ReviewApiError::AlreadyReviewed(6)),
        _ => {
            let review = review(7, r.product_id, r.customer_id, r.rating, r.comment.as_deref());
            Ok((review, product(r.product_id, 4.3, 3)))
        },
    });
    reviews.expect_update_review().returning(|id, customer_id, update| {
        if id != 1 || customer_id != 1 {
            return Err(ReviewApiError::ReviewNotFound(id));
        }
        let review = review(id, 5, customer_id, update.rating.unwrap_or(4), update.comment.as_deref());
        Ok((review, product(5, 4.0, 2)))
    });
    // Customers may only delete review 1. Admins (no customer id) may delete any.
    reviews.expect_delete_review().returning(|id, customer_id| match customer_id {
        Some(1) if id != 1 => Err(ReviewApiError::ReviewNotFound(id)),
        _ => Ok(product(5, 5.0, 1)),
    });
    cfg.service(ProductReviewsRoute::<MockReviewManager>::new())
        .service(CreateReviewRoute::<MockCustomerManager, MockReviewManager>::new())
        .service(UpdateReviewRoute::<MockCustomerManager, MockReviewManager>::new())
        .service(DeleteReviewRoute::<MockCustomerManager, MockReviewManager>::new())
        .app_data(web::Data::new(CustomerApi::new(customers)))
        .app_data(web::Data::new(ReviewApi::new(reviews)));
}

fn review(id: i64, product_id: i64, customer_id: i64, rating: i64, comment: Option<&str>) -> Review {
    Review {
        id,
        product_id,
        customer_id,
        order_id: 10,
        rating,
        comment: comment.map(String::from),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn product(id: i64, ratings_average: f64, ratings_quantity: i64) -> Product {
    Product {
        id,
        name: format!("Widget {id}"),
        description: String::new(),
        price: Cents::from(1_250),
        stock: 10,
        image: String::new(),
        ratings_average,
        ratings_quantity,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
