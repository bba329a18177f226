use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Json, Router};
use utoipa::OpenApi;

use super::dto::{CategoryDto, InventoryDto, ProductDto, ProductListDto, VersionDto};
use super::handlers;
use super::problem::Problem;
use crate::domain::service::CatalogService;

/// Version string reported by `GET /api/version`.
#[derive(Debug, Clone, Copy)]
pub struct ApiVersion(pub &'static str);

#[derive(OpenApi)]
#[openapi(
    info(title = "Brickstore API", description = "Product catalog backed by Lakebase Postgres"),
    paths(
        handlers::version,
        handlers::list_categories,
        handlers::get_category,
        handlers::list_products,
        handlers::get_product,
    ),
    components(schemas(
        VersionDto,
        CategoryDto,
        InventoryDto,
        ProductDto,
        ProductListDto,
        Problem
    )),
    tags((name = "Catalog", description = "Categories, products and stock"))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Catalog routes, mounted under `/api`.
pub fn router(service: Arc<CatalogService>, version: &'static str) -> Router {
    let api = Router::new()
        .route("/version", get(handlers::version))
        .route("/categories", get(handlers::list_categories))
        .route("/categories/{id}", get(handlers::get_category))
        .route("/products", get(handlers::list_products))
        .route("/products/{id}", get(handlers::get_product))
        .route("/openapi.json", get(openapi_json))
        .layer(Extension(service))
        .layer(Extension(ApiVersion(version)));

    Router::new().nest("/api", api)
}
