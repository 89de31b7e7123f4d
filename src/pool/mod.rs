//! Shared state coordinated across workers
//!
//! # Components
//!
//! - `EndpointPool`: per-site set of candidate base URLs, shrinking as endpoints are pruned
//! - `RequestCounter`: process-scoped counter tagging outgoing URLs
//! - `IdentityRotator`: random User-Agent selection per request

mod counter;
mod endpoint_pool;
mod identity;

// Re-export main types
pub use counter::RequestCounter;
pub use endpoint_pool::EndpointPool;
pub use identity::{IdentityRotator, DEFAULT_USER_AGENTS};
