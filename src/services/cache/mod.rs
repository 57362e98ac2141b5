pub mod client;
pub mod valkey;

pub use client::{CacheError, CacheResult, ReadThroughCache};
pub use valkey::ValkeyClient;
