use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use super::error::DomainError;
use super::models::{Category, Inventory, Product, ProductListItem};
use super::repo::CatalogRepository;

/// Vec-backed repository for service and route tests.
#[derive(Default)]
pub(crate) struct InMemoryCatalog {
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
    pub inventory: Vec<Inventory>,
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 2, hour, 0, 0)
        .single()
        .unwrap_or_default()
}

fn product(id: i32, name: &str, cents: i64, category_id: i32) -> Product {
    Product {
        id,
        name: name.to_owned(),
        description: None,
        price: Decimal::new(cents, 2),
        image_url: None,
        category_id,
        created_at: at(9),
        updated_at: at(10),
    }
}

impl InMemoryCatalog {
    /// Two categories, three products; product 3 has no stock record.
    pub(crate) fn sample() -> Self {
        Self {
            categories: vec![
                Category {
                    id: 1,
                    name: "Premium Data".to_owned(),
                    description: Some("Artisanal data sets".to_owned()),
                    created_at: at(8),
                },
                Category {
                    id: 2,
                    name: "Industrial Bricks".to_owned(),
                    description: None,
                    created_at: at(8),
                },
            ],
            products: vec![
                product(1, "Premium JSON Blob", 4999, 1),
                product(2, "Industrial Cinder Block", 349, 2),
                product(3, "Delta Lake Subscription", 9999, 1),
            ],
            inventory: vec![
                Inventory {
                    id: 1,
                    product_id: 1,
                    quantity: 1000,
                    updated_at: at(11),
                },
                Inventory {
                    id: 2,
                    product_id: 2,
                    quantity: 25000,
                    updated_at: at(11),
                },
            ],
        }
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        let mut out = self.categories.clone();
        out.sort_by_key(|c| c.id);
        Ok(out)
    }

    async fn find_category(&self, id: i32) -> Result<Option<Category>, DomainError> {
        Ok(self.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn list_products(
        &self,
        category_id: Option<i32>,
    ) -> Result<Vec<ProductListItem>, DomainError> {
        let mut out: Vec<_> = self
            .products
            .iter()
            .filter(|p| category_id.is_none_or(|id| p.category_id == id))
            .map(|p| ProductListItem {
                id: p.id,
                name: p.name.clone(),
                description: p.description.clone(),
                price: p.price,
                image_url: p.image_url.clone(),
                category_id: p.category_id,
                category_name: self
                    .categories
                    .iter()
                    .find(|c| c.id == p.category_id)
                    .map(|c| c.name.clone()),
                quantity: self
                    .inventory
                    .iter()
                    .find(|i| i.product_id == p.id)
                    .map(|i| i.quantity),
            })
            .collect();
        out.sort_by_key(|p| p.id);
        Ok(out)
    }

    async fn find_product(&self, id: i32) -> Result<Option<Product>, DomainError> {
        Ok(self.products.iter().find(|p| p.id == id).cloned())
    }

    async fn find_inventory(&self, product_id: i32) -> Result<Option<Inventory>, DomainError> {
        Ok(self
            .inventory
            .iter()
            .find(|i| i.product_id == product_id)
            .cloned())
    }
}
