//! Token-bucket rate limiting state and the per-client registry.

mod bucket;
mod registry;

pub use bucket::TokenBucket;
pub use registry::{LimiterRegistry, SharedBucket};
