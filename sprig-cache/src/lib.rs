//! Sprig Cache - Tree Navigation Cache
//!
//! Browses a remote hierarchy cheaply: lightweight node summaries are fetched
//! eagerly, full entity payloads lazily, and concurrent requests for the same
//! children page share one network call.
//!
//! ```ignore
//! let scope = Arc::new(ActiveScope::new(Some(ScopeId(1))));
//! let cache = TreeCache::new(gateway, Arc::clone(&scope), notifier, CacheConfig::default());
//!
//! cache.fetch_root_hierarchy().await?;
//! let page = cache.fetch_children(&NodeId::from("bundle-4")).await?;
//! let assets = cache.batch_get_assets(&[AssetId(5), AssetId(2)]).await?;
//! ```

pub mod batch;
pub mod config;
pub mod gateway;
mod hydration;
mod in_flight;
pub mod notifications;
pub mod scope;
pub mod stats;
pub mod store;

pub use batch::reconcile;
pub use config::{CacheConfig, DEFAULT_CHILDREN_PAGE_LIMIT, MAX_CHILDREN_PAGE_LIMIT};
pub use gateway::TreeGateway;
pub use notifications::{
    Notification, NotificationAction, NotificationLevel, NotificationLog, NotificationSink,
};
pub use scope::{ActiveScope, ScopeProvider};
pub use stats::CacheStats;
pub use store::{CacheSizes, TreeCache, TreeCounts};
