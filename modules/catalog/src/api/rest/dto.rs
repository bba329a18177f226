use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::models::{Category, Inventory, ProductDetail, ProductListItem};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VersionDto {
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryDto {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InventoryDto {
    pub id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

/// Full product record with nested category and inventory.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductDto {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "49.99")]
    pub price: Decimal,
    pub image_url: Option<String>,
    pub category_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category: Option<CategoryDto>,
    pub inventory: Option<InventoryDto>,
}

/// Product list item without nested objects.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductListDto {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "49.99")]
    pub price: Decimal,
    pub image_url: Option<String>,
    pub category_id: i32,
    pub category_name: Option<String>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductsQuery {
    /// Only return products in this category.
    pub category_id: Option<i32>,
}

impl From<Category> for CategoryDto {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            created_at: c.created_at,
        }
    }
}

impl From<Inventory> for InventoryDto {
    fn from(i: Inventory) -> Self {
        Self {
            id: i.id,
            product_id: i.product_id,
            quantity: i.quantity,
            updated_at: i.updated_at,
        }
    }
}

impl From<ProductDetail> for ProductDto {
    fn from(d: ProductDetail) -> Self {
        let p = d.product;
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price,
            image_url: p.image_url,
            category_id: p.category_id,
            created_at: p.created_at,
            updated_at: p.updated_at,
            category: d.category.map(Into::into),
            inventory: d.inventory.map(Into::into),
        }
    }
}

impl From<ProductListItem> for ProductListDto {
    fn from(p: ProductListItem) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price,
            image_url: p.image_url,
            category_id: p.category_id,
            category_name: p.category_name,
            quantity: p.quantity,
        }
    }
}
