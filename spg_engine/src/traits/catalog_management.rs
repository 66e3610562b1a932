use thiserror::Error;

use crate::db_types::{NewProduct, Product};

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Invalid product. {0}")]
    InvalidProduct(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        CatalogError::DatabaseError(e.to_string())
    }
}

/// Read access to the product catalog, plus the minimum of write access needed to seed it and to take products off
/// sale.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogError>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;

    /// Overwrites the stock level. This is an inventory correction, not a sale; sales go through the order flow.
    async fn set_stock(&self, id: i64, stock: i64) -> Result<Product, CatalogError>;

    /// Removes a product from the catalog. Carts and past orders that refer to it are left as they are.
    async fn delete_product(&self, id: i64) -> Result<(), CatalogError>;
}
