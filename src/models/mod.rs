pub mod filter_config;
pub mod offer;

// Re-exports for convenience
pub use filter_config::*;
pub use offer::*;
