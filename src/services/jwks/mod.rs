pub mod cache;
pub mod fetcher;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use cache::{ExternalCacheOptions, KeySetCache, KeySetOptions};
pub use fetcher::{HttpKeySetFetcher, KeySetFetcher};
pub use types::{KeyReference, KeyResolver, KeySetError, PublicKey};
