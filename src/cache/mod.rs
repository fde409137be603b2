// Gateway module for cache - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod content_cache;
mod types;

// Public re-exports - the ONLY way to access cache functionality
pub use content_cache::ContentAddressedCache;
pub use types::CacheStats;
