#![allow(dead_code)]
use spg_engine::{
    db_types::{Cents, Customer, NewCustomer, NewOrder, NewOrderItem, NewProduct, Product, ShippingAddress},
    order_objects::{CheckoutMetadata, PaymentConfirmation},
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path},
    CatalogManagement,
    CustomerManagement,
    SqliteDatabase,
};

pub struct TestStore {
    pub url: String,
    pub db: SqliteDatabase,
}

impl TestStore {
    pub async fn new() -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        Self { url, db }
    }

    pub async fn teardown(self) {
        self.db.close().await;
        drop_database(&self.url).await;
    }

    pub async fn product(&self, name: &str, price: i64, stock: i64) -> Product {
        let product = NewProduct::new(name, Cents::from(price), stock).with_image(format!("https://img.test/{name}.png"));
        self.db.insert_product(product).await.expect("Error inserting product")
    }

    pub async fn customer(&self, identity: &str) -> Customer {
        let customer = NewCustomer::new(identity.to_string(), format!("{identity}@example.com"));
        self.db.fetch_or_create_customer(customer).await.expect("Error creating customer")
    }

    pub async fn stock(&self, product_id: i64) -> i64 {
        self.db.fetch_product(product_id).await.expect("Error fetching product").expect("Product not found").stock
    }
}

pub fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Ada Lovelace".into(),
        line1: "12 St James's Square".into(),
        city: "London".into(),
        postal_code: "SW1Y 4JH".into(),
        country: "GB".into(),
        ..Default::default()
    }
}

pub fn confirmation(payment_intent_id: &str, customer_id: i64, total: i64) -> PaymentConfirmation {
    let metadata = CheckoutMetadata::new(customer_id, Cents::from(total), address());
    PaymentConfirmation::new(payment_intent_id.to_string(), Cents::from(total), metadata)
}

pub fn manual_order(customer_id: i64, items: &[(i64, i64)]) -> NewOrder {
    let items = items.iter().map(|&(product_id, quantity)| NewOrderItem::new(product_id, quantity)).collect();
    NewOrder::new(customer_id, items, address(), Cents::from(1_000))
}
