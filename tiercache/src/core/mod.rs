pub mod error;
pub mod types;

pub use error::{CacheError, Result};
pub use types::{CacheKey, CacheValue, Fetched, LevelInfo, unique_keys};
