use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mockall::mock;
use spg_engine::{
    checkout_objects::PaymentIntentCreated,
    db_types::{Cart, Cents, Customer, NewCustomer, NewOrder, NewReview, Order, OrderStatusType, Product, Review, UpdateReview},
    helpers::StaleOrderCancellation,
    order_objects::{MaterializeResult, OrderQueryFilter, PaymentConfirmation},
    traits::{
        CartApiError,
        CartManagement,
        CustomerApiError,
        CustomerManagement,
        OrderFlowError,
        OrderManagement,
        PaymentProcessor,
        PaymentProcessorError,
        ReviewApiError,
        ReviewManagement,
    },
};

mock! {
    pub CustomerManager {}
    impl CustomerManagement for CustomerManager {
        async fn fetch_customer(&self, id: i64) -> Result<Option<Customer>, CustomerApiError>;
        async fn fetch_customer_by_identity(&self, identity_id: &str) -> Result<Option<Customer>, CustomerApiError>;
        async fn fetch_or_create_customer(&self, customer: NewCustomer) -> Result<Customer, CustomerApiError>;
        async fn set_payment_customer_id(&self, id: i64, payment_customer_id: &str) -> Result<Customer, CustomerApiError>;
    }
}

mock! {
    pub CartManager {}
    impl CartManagement for CartManager {
        async fn fetch_cart(&self, customer_id: i64) -> Result<Cart, CartApiError>;
        async fn add_item(&self, customer_id: i64, product_id: i64, quantity: i64) -> Result<Cart, CartApiError>;
        async fn set_item_quantity(&self, customer_id: i64, product_id: i64, quantity: i64) -> Result<Cart, CartApiError>;
        async fn remove_item(&self, customer_id: i64, product_id: i64) -> Result<Cart, CartApiError>;
        async fn clear_cart(&self, customer_id: i64) -> Result<Cart, CartApiError>;
    }
}

// Checkout needs cart and customer storage from the same backend
mock! {
    pub CheckoutDb {}
    impl CartManagement for CheckoutDb {
        async fn fetch_cart(&self, customer_id: i64) -> Result<Cart, CartApiError>;
        async fn add_item(&self, customer_id: i64, product_id: i64, quantity: i64) -> Result<Cart, CartApiError>;
        async fn set_item_quantity(&self, customer_id: i64, product_id: i64, quantity: i64) -> Result<Cart, CartApiError>;
        async fn remove_item(&self, customer_id: i64, product_id: i64) -> Result<Cart, CartApiError>;
        async fn clear_cart(&self, customer_id: i64) -> Result<Cart, CartApiError>;
    }
    impl CustomerManagement for CheckoutDb {
        async fn fetch_customer(&self, id: i64) -> Result<Option<Customer>, CustomerApiError>;
        async fn fetch_customer_by_identity(&self, identity_id: &str) -> Result<Option<Customer>, CustomerApiError>;
        async fn fetch_or_create_customer(&self, customer: NewCustomer) -> Result<Customer, CustomerApiError>;
        async fn set_payment_customer_id(&self, id: i64, payment_customer_id: &str) -> Result<Customer, CustomerApiError>;
    }
}

mock! {
    pub OrderManager {}
    impl OrderManagement for OrderManager {
        async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderFlowError>;
        async fn fetch_order_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Order>, OrderFlowError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;
        async fn materialize_order(&self, confirmation: PaymentConfirmation) -> Result<MaterializeResult, OrderFlowError>;
        async fn insert_manual_order(&self, order: NewOrder) -> Result<Order, OrderFlowError>;
        async fn update_order_status(&self, id: i64, status: OrderStatusType, now: DateTime<Utc>) -> Result<Order, OrderFlowError>;
        async fn fetch_unpaid_pending_orders(&self) -> Result<Vec<Order>, OrderFlowError>;
        async fn cancel_stale_orders(&self, plan: &[StaleOrderCancellation], now: DateTime<Utc>) -> Result<Vec<Order>, OrderFlowError>;
    }
}

mock! {
    pub ReviewManager {}
    impl ReviewManagement for ReviewManager {
        async fn fetch_review(&self, id: i64) -> Result<Option<Review>, ReviewApiError>;
        async fn fetch_reviews_for_product(&self, product_id: i64) -> Result<Vec<Review>, ReviewApiError>;
        async fn insert_review(&self, review: NewReview) -> Result<(Review, Product), ReviewApiError>;
        async fn update_review(&self, id: i64, customer_id: i64, update: UpdateReview) -> Result<(Review, Product), ReviewApiError>;
        async fn delete_review(&self, id: i64, customer_id: Option<i64>) -> Result<Product, ReviewApiError>;
    }
}

mock! {
    pub Processor {}
    impl PaymentProcessor for Processor {
        async fn create_customer(&self, email: &str, metadata: &HashMap<String, String>) -> Result<String, PaymentProcessorError>;
        async fn create_payment_intent(&self, amount: Cents, customer_ref: &str, metadata: &HashMap<String, String>) -> Result<PaymentIntentCreated, PaymentProcessorError>;
    }
}
