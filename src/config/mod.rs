//! Configuration
//!
//! Explicit pipeline configuration and the figment-based loader.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    CacheSettings, CircuitBreakerSettings, Config, GenerationSettings, ProviderSettings,
    RateLimitSettings,
};
