//! Postgres access for Lakebase.
//!
//! The pool opens connections through a [`PreConnectInterceptor`] chain, which
//! is where delegated database tokens are injected. Idle connections are
//! reused as-is.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod db;
pub mod error;
pub mod interceptor;
pub mod manager;
pub mod migrations;
pub mod params;
pub mod pool;

pub use config::{DbConnConfig, PoolConfig};
pub use db::{Db, DbConn, build_db};
pub use error::DbError;
pub use interceptor::{PreConnectInterceptor, TokenPasswordInterceptor};
pub use manager::{ManageConnection, PgConnectionManager};
pub use migrations::{MIGRATOR, run_migrations};
pub use params::ConnectParams;
pub use pool::{Pool, PoolState, PooledConnection};
