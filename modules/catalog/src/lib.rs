//! Product catalog: categories, products and their stock levels.
//!
//! Read-only REST API over the Lakebase Postgres database. When no database
//! is configured the routes stay mounted and answer `503`.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod domain;
pub mod infra;

pub use api::rest::routes::{ApiDoc, router};
pub use domain::service::CatalogService;
pub use infra::storage::pg_repo::PgCatalogRepository;
