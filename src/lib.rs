//! Bearer-token authentication and Permify-backed authorization for axum.
//!
//! - [`middleware::auth::access`] verifies the request's JWT against the
//!   issuer's published key set and publishes the claims.
//! - [`middleware::auth::permission`] asks the policy engine whether the
//!   authenticated subject may act on the entity named by a route parameter.
pub mod api;
pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;

pub use error::{AuthError, AuthFailure};
