use std::sync::Arc;

use super::error::DomainError;
use super::models::{Category, ProductDetail, ProductListItem};
use super::repo::CatalogRepository;

/// Catalog use cases. Without a repository every call fails with
/// [`DomainError::DatabaseNotConfigured`].
#[derive(Clone)]
pub struct CatalogService {
    repo: Option<Arc<dyn CatalogRepository>>,
}

impl CatalogService {
    #[must_use]
    pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
        Self { repo: Some(repo) }
    }

    #[must_use]
    pub fn unconfigured() -> Self {
        Self { repo: None }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.repo.is_some()
    }

    fn repo(&self) -> Result<&dyn CatalogRepository, DomainError> {
        self.repo.as_deref().ok_or(DomainError::DatabaseNotConfigured)
    }

    /// # Errors
    /// Fails when the database is missing or the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        self.repo()?.list_categories().await
    }

    /// # Errors
    /// [`DomainError::NotFound`] when no category has this id.
    pub async fn get_category(&self, id: i32) -> Result<Category, DomainError> {
        self.repo()?
            .find_category(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", id))
    }

    /// # Errors
    /// Fails when the database is missing or the query fails.
    pub async fn list_products(
        &self,
        category_id: Option<i32>,
    ) -> Result<Vec<ProductListItem>, DomainError> {
        self.repo()?.list_products(category_id).await
    }

    /// Product with its category and inventory loaded.
    ///
    /// # Errors
    /// [`DomainError::NotFound`] when no product has this id.
    pub async fn get_product(&self, id: i32) -> Result<ProductDetail, DomainError> {
        let repo = self.repo()?;
        let product = repo
            .find_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", id))?;
        let category = repo.find_category(product.category_id).await?;
        let inventory = repo.find_inventory(product.id).await?;

        Ok(ProductDetail {
            product,
            category,
            inventory,
        })
    }
}
