//! Lakebase database credentials.
//!
//! - [`CredentialResolver`] produces a (principal, secret) pair, either from
//!   static configuration or by minting a short-lived token through an
//!   [`IdentityProvider`].
//! - [`TokenCache`] keeps the one delegated token per process and refreshes it
//!   lazily when a new database connection is about to be opened.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod provider;
pub mod resolver;

pub use cache::{CachedToken, DEFAULT_TOKEN_TTL, PROVIDER_TOKEN_LIFETIME, TokenCache};
pub use clock::{Clock, SystemClock};
pub use config::{AuthMode, CredentialSettings, normalize_host};
pub use error::{AuthError, ProviderError};
pub use provider::{DatabaseCredential, DatabricksIdentityProvider, IdentityProvider, ProviderSession};
pub use resolver::{Credential, CredentialResolver};
pub use secrecy::{ExposeSecret, SecretString};
