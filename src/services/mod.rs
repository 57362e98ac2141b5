pub mod auth;
pub mod cache;
pub mod jwks;
pub mod policy;
