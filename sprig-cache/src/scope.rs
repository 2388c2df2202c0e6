//! Active scope source.

use sprig_core::ScopeId;
use std::sync::Arc;
use tokio::sync::watch;

/// Supplies the currently active scope, if any.
pub trait ScopeProvider: Send + Sync {
    fn active_scope(&self) -> Option<ScopeId>;
}

impl<P: ScopeProvider + ?Sized> ScopeProvider for Arc<P> {
    fn active_scope(&self) -> Option<ScopeId> {
        (**self).active_scope()
    }
}

/// A fixed scope, for callers that never switch collections.
impl ScopeProvider for Option<ScopeId> {
    fn active_scope(&self) -> Option<ScopeId> {
        *self
    }
}

/// Mutable scope holder backed by a watch channel so listeners can react to
/// scope switches (see `TreeCache::spawn_scope_listener`).
#[derive(Debug)]
pub struct ActiveScope {
    tx: watch::Sender<Option<ScopeId>>,
}

impl ActiveScope {
    pub fn new(initial: Option<ScopeId>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Switch scope. Returns `true` if the value actually changed; listeners
    /// are only woken on a change.
    pub fn set(&self, scope: Option<ScopeId>) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == scope {
                false
            } else {
                *current = scope;
                true
            }
        })
    }

    pub fn clear(&self) -> bool {
        self.set(None)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ScopeId>> {
        self.tx.subscribe()
    }
}

impl Default for ActiveScope {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ScopeProvider for ActiveScope {
    fn active_scope(&self) -> Option<ScopeId> {
        *self.tx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reports_changes_only() {
        let scope = ActiveScope::new(Some(ScopeId(1)));
        assert!(!scope.set(Some(ScopeId(1))));
        assert!(scope.set(Some(ScopeId(2))));
        assert_eq!(scope.active_scope(), Some(ScopeId(2)));
        assert!(scope.clear());
        assert_eq!(scope.active_scope(), None);
    }

    #[test]
    fn test_subscriber_sees_switch() {
        let scope = ActiveScope::default();
        let mut rx = scope.subscribe();
        assert!(!rx.has_changed().unwrap());
        scope.set(Some(ScopeId(9)));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Some(ScopeId(9)));
    }

    #[test]
    fn test_fixed_scope_provider() {
        let fixed = Some(ScopeId(4));
        assert_eq!(fixed.active_scope(), Some(ScopeId(4)));
        let none: Option<ScopeId> = None;
        assert_eq!(none.active_scope(), None);
    }
}
