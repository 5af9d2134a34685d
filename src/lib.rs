/*!
 * Refresh Cache Library
 * Self-refreshing cached values backed by a background Tokio task
 */

pub mod cache;

// Re-exports
pub use cache::{CachedValue, RefreshConfig};
