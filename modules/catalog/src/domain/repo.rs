use async_trait::async_trait;

use super::error::DomainError;
use super::models::{Category, Inventory, Product, ProductListItem};

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// All categories ordered by id.
    async fn list_categories(&self) -> Result<Vec<Category>, DomainError>;

    async fn find_category(&self, id: i32) -> Result<Option<Category>, DomainError>;

    /// Products ordered by id, joined with category name and stock quantity.
    async fn list_products(
        &self,
        category_id: Option<i32>,
    ) -> Result<Vec<ProductListItem>, DomainError>;

    async fn find_product(&self, id: i32) -> Result<Option<Product>, DomainError>;

    async fn find_inventory(&self, product_id: i32) -> Result<Option<Inventory>, DomainError>;
}
