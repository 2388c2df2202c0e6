//! Tuning knobs for the tree cache.

use std::time::Duration;

/// Page size the service uses when the client does not ask for one.
pub const DEFAULT_CHILDREN_PAGE_LIMIT: u32 = 100;

/// Largest page the service accepts.
pub const MAX_CHILDREN_PAGE_LIMIT: u32 = 500;

/// Configuration for the tree cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Children requested per node; only this one page is ever cached.
    pub children_page_limit: u32,
    /// Upper bound a caller waits after joining someone else's in-flight
    /// children fetch. `None` waits for settlement.
    pub join_timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            children_page_limit: DEFAULT_CHILDREN_PAGE_LIMIT,
            join_timeout: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the children page limit, clamped to `1..=MAX_CHILDREN_PAGE_LIMIT`.
    pub fn with_children_page_limit(mut self, limit: u32) -> Self {
        self.children_page_limit = limit.clamp(1, MAX_CHILDREN_PAGE_LIMIT);
        self
    }

    /// Bound how long joiners wait on an in-flight children fetch.
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::new();
        assert_eq!(config.children_page_limit, 100);
        assert!(config.join_timeout.is_none());
    }

    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::new()
            .with_children_page_limit(250)
            .with_join_timeout(Duration::from_millis(1500));

        assert_eq!(config.children_page_limit, 250);
        assert_eq!(config.join_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_page_limit_is_clamped() {
        assert_eq!(CacheConfig::new().with_children_page_limit(0).children_page_limit, 1);
        assert_eq!(
            CacheConfig::new().with_children_page_limit(10_000).children_page_limit,
            MAX_CHILDREN_PAGE_LIMIT
        );
    }
}
