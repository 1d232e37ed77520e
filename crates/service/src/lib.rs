//! Storefront service layer.
//! - Paging math, the bounded pager and phone/price formatting.
//! - Listing cache with per-collection invalidation driven by mutations.
//! - Entity, auth and session services over the backend platform traits.

pub mod auth;
pub mod backend;
pub mod errors;
pub mod format;
pub mod listing;
pub mod notify;
pub mod pager;
pub mod pagination;
pub mod query_cache;
pub mod services;
pub mod storefront;
#[cfg(test)]
pub mod test_support;

pub use errors::{RemoteError, ServiceError};
pub use storefront::Storefront;
