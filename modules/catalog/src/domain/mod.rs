pub mod error;
pub mod models;
pub mod repo;
pub mod service;

#[cfg(test)]
pub(crate) mod memory_repo;
