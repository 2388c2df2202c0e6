//! Shared harness for tree cache integration tests.

#![allow(dead_code)]

use sprig_cache::{ActiveScope, CacheConfig, TreeCache};
use sprig_core::ScopeId;
use sprig_test_utils::{MockGateway, RecordingSink};
use std::sync::Arc;

pub type TestCache = TreeCache<Arc<MockGateway>, Arc<ActiveScope>>;

pub struct Harness {
    pub cache: TestCache,
    pub gateway: Arc<MockGateway>,
    pub scope: Arc<ActiveScope>,
    pub sink: Arc<RecordingSink>,
}

pub fn harness(gateway: MockGateway, scope: Option<ScopeId>) -> Harness {
    harness_with_config(gateway, scope, CacheConfig::default())
}

pub fn harness_with_config(
    gateway: MockGateway,
    scope: Option<ScopeId>,
    config: CacheConfig,
) -> Harness {
    let gateway = Arc::new(gateway);
    let scope = Arc::new(ActiveScope::new(scope));
    let sink = RecordingSink::new();
    let cache = TreeCache::new(
        Arc::clone(&gateway),
        Arc::clone(&scope),
        sink.clone(),
        config,
    );
    Harness {
        cache,
        gateway,
        scope,
        sink,
    }
}
