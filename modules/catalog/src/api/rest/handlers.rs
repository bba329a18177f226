use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, Path, Query};
use tracing::debug;

use super::dto::{CategoryDto, ProductDto, ProductListDto, ProductsQuery, VersionDto};
use super::problem::{ApiResult, Problem};
use super::routes::ApiVersion;
use crate::domain::service::CatalogService;

#[utoipa::path(
    get,
    path = "/api/version",
    tag = "Catalog",
    operation_id = "version",
    responses((status = 200, description = "Application version", body = VersionDto))
)]
pub async fn version(Extension(version): Extension<ApiVersion>) -> Json<VersionDto> {
    Json(VersionDto {
        version: version.0.to_owned(),
    })
}

#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "Catalog",
    operation_id = "getCategories",
    responses(
        (status = 200, description = "All categories", body = [CategoryDto]),
        (status = 503, description = "Database not configured", body = Problem, content_type = "application/problem+json"),
        (status = 500, description = "Internal error", body = Problem, content_type = "application/problem+json")
    )
)]
#[tracing::instrument(skip(svc))]
pub async fn list_categories(
    Extension(svc): Extension<Arc<CatalogService>>,
) -> ApiResult<Json<Vec<CategoryDto>>> {
    let categories = svc.list_categories().await?;
    debug!(count = categories.len(), "listed categories");
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    tag = "Catalog",
    operation_id = "getCategory",
    params(("id" = i32, Path, description = "Category id")),
    responses(
        (status = 200, description = "The category", body = CategoryDto),
        (status = 404, description = "Category not found", body = Problem, content_type = "application/problem+json"),
        (status = 503, description = "Database not configured", body = Problem, content_type = "application/problem+json")
    )
)]
#[tracing::instrument(skip(svc))]
pub async fn get_category(
    Extension(svc): Extension<Arc<CatalogService>>,
    Path(id): Path<i32>,
) -> ApiResult<Json<CategoryDto>> {
    Ok(Json(svc.get_category(id).await?.into()))
}

#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Catalog",
    operation_id = "getProducts",
    params(ProductsQuery),
    responses(
        (status = 200, description = "Products ordered by id", body = [ProductListDto]),
        (status = 503, description = "Database not configured", body = Problem, content_type = "application/problem+json")
    )
)]
#[tracing::instrument(skip(svc))]
pub async fn list_products(
    Extension(svc): Extension<Arc<CatalogService>>,
    Query(query): Query<ProductsQuery>,
) -> ApiResult<Json<Vec<ProductListDto>>> {
    let products = svc.list_products(query.category_id).await?;
    debug!(count = products.len(), "listed products");
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Catalog",
    operation_id = "getProduct",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product with category and inventory", body = ProductDto),
        (status = 404, description = "Product not found", body = Problem, content_type = "application/problem+json"),
        (status = 503, description = "Database not configured", body = Problem, content_type = "application/problem+json")
    )
)]
#[tracing::instrument(skip(svc))]
pub async fn get_product(
    Extension(svc): Extension<Arc<CatalogService>>,
    Path(id): Path<i32>,
) -> ApiResult<Json<ProductDto>> {
    Ok(Json(svc.get_product(id).await?.into()))
}
