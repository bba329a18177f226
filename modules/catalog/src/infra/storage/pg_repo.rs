use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lakebase_db::Db;
use rust_decimal::Decimal;

use crate::domain::error::DomainError;
use crate::domain::models::{Category, Inventory, Product, ProductListItem};
use crate::domain::repo::CatalogRepository;

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(r: CategoryRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: Option<String>,
    price: Decimal,
    image_url: Option<String>,
    category_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            price: r.price,
            image_url: r.image_url,
            category_id: r.category_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct InventoryRow {
    id: i32,
    product_id: i32,
    quantity: i32,
    updated_at: DateTime<Utc>,
}

impl From<InventoryRow> for Inventory {
    fn from(r: InventoryRow) -> Self {
        Self {
            id: r.id,
            product_id: r.product_id,
            quantity: r.quantity,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductListRow {
    id: i32,
    name: String,
    description: Option<String>,
    price: Decimal,
    image_url: Option<String>,
    category_id: i32,
    category_name: Option<String>,
    quantity: Option<i32>,
}

impl From<ProductListRow> for ProductListItem {
    fn from(r: ProductListRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            price: r.price,
            image_url: r.image_url,
            category_id: r.category_id,
            category_name: r.category_name,
            quantity: r.quantity,
        }
    }
}

const LIST_PRODUCTS: &str = "\
SELECT p.id, p.name, p.description, p.price, p.image_url, p.category_id, \
       c.name AS category_name, i.quantity \
FROM products p \
JOIN categories c ON c.id = p.category_id \
LEFT JOIN inventory i ON i.product_id = p.id \
WHERE $1::int4 IS NULL OR p.category_id = $1 \
ORDER BY p.id";

/// Catalog queries over the shared pool. Each call checks out one connection.
pub struct PgCatalogRepository {
    db: Db,
}

impl PgCatalogRepository {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        let mut conn = self.db.conn().await?;
        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT id, name, description, created_at FROM categories ORDER BY id",
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_category(&self, id: i32) -> Result<Option<Category>, DomainError> {
        let mut conn = self.db.conn().await?;
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, name, description, created_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_products(
        &self,
        category_id: Option<i32>,
    ) -> Result<Vec<ProductListItem>, DomainError> {
        let mut conn = self.db.conn().await?;
        let rows: Vec<ProductListRow> = sqlx::query_as(LIST_PRODUCTS)
            .bind(category_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_product(&self, id: i32) -> Result<Option<Product>, DomainError> {
        let mut conn = self.db.conn().await?;
        let row: Option<ProductRow> = sqlx::query_as(
            "SELECT id, name, description, price, image_url, category_id, created_at, updated_at \
             FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_inventory(&self, product_id: i32) -> Result<Option<Inventory>, DomainError> {
        let mut conn = self.db.conn().await?;
        let row: Option<InventoryRow> = sqlx::query_as(
            "SELECT id, product_id, quantity, updated_at FROM inventory WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.map(Into::into))
    }
}
