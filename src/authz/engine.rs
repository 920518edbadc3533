use std::sync::Arc;

use parking_lot::RwLock;

use crate::authz::store::RuleStore;

/// Answers `is_granted` questions against an immutable [`RuleStore`] snapshot.
#[derive(Debug, Clone)]
pub struct Authorizer {
    store: Arc<RuleStore>,
}

impl Authorizer {
    pub fn new(store: impl Into<Arc<RuleStore>>) -> Self {
        Self {
            store: store.into(),
        }
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    /// Decide whether `role` may exercise `privilege` on `resource`.
    ///
    /// Empty strings count as unset. With neither resource nor privilege the
    /// answer is always `true`; an unregistered resource is always `false`.
    /// Everything else is delegated to [`RuleStore::is_allowed`].
    pub fn is_granted(
        &self,
        role: Option<&str>,
        resource: Option<&str>,
        privilege: Option<&str>,
    ) -> bool {
        let resource = resource.filter(|r| !r.is_empty());
        let privilege = privilege.filter(|p| !p.is_empty());

        let granted = match (resource, privilege) {
            (None, None) => true,
            (Some(r), _) if !self.store.has_resource(r) => false,
            _ => match role.filter(|r| !r.is_empty()) {
                Some(role) => self.store.is_allowed(role, resource, privilege),
                None => false,
            },
        };

        tracing::debug!(
            role = ?role,
            resource = ?resource,
            privilege = ?privilege,
            granted,
            "Authorization decision"
        );
        granted
    }
}

/// An [`Authorizer`] whose store can be replaced while queries are running.
///
/// Readers clone the current `Arc` and evaluate outside the lock, so a swap
/// never waits on an in-flight decision.
#[derive(Debug)]
pub struct SharedAuthorizer {
    current: RwLock<Arc<RuleStore>>,
}

impl SharedAuthorizer {
    pub fn new(store: impl Into<Arc<RuleStore>>) -> Self {
        Self {
            current: RwLock::new(store.into()),
        }
    }

    /// An authorizer bound to the store that is current right now.
    pub fn snapshot(&self) -> Authorizer {
        Authorizer {
            store: Arc::clone(&self.current.read()),
        }
    }

    pub fn is_granted(
        &self,
        role: Option<&str>,
        resource: Option<&str>,
        privilege: Option<&str>,
    ) -> bool {
        self.snapshot().is_granted(role, resource, privilege)
    }

    /// Publish a freshly built store. Returns the one it replaced.
    pub fn replace(&self, store: impl Into<Arc<RuleStore>>) -> Arc<RuleStore> {
        let store = store.into();
        tracing::info!(
            roles = store.roles().count(),
            resources = store.resources().count(),
            rules = store.rule_count(),
            "Replacing authorization rules"
        );
        std::mem::replace(&mut *self.current.write(), store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::types::PrivilegeSpec;

    const NO_PARENTS: &[&str] = &[];

    fn make_store() -> RuleStore {
        let mut store = RuleStore::new();
        store.add_role("admin", NO_PARENTS).unwrap();
        store.add_role("editor", &["admin"]).unwrap();
        store.add_resource("dash", None).unwrap();
        store.add_resource("posts", None).unwrap();
        store.allow("editor", Some("posts"), &PrivilegeSpec::All).unwrap();
        store.allow("admin", None, &PrivilegeSpec::One("ping".into())).unwrap();
        store
    }

    #[test]
    fn test_no_resource_no_privilege_always_granted() {
        let authz = Authorizer::new(make_store());
        assert!(authz.is_granted(Some("admin"), None, None));
        assert!(authz.is_granted(Some("unknown"), None, None));
        assert!(authz.is_granted(None, None, None));
        assert!(authz.is_granted(Some("admin"), Some(""), Some("")));
    }

    #[test]
    fn test_unknown_resource_denied() {
        let authz = Authorizer::new(make_store());
        assert!(!authz.is_granted(Some("editor"), Some("missing"), None));
        assert!(!authz.is_granted(Some("editor"), Some("missing"), Some("read")));
    }

    #[test]
    fn test_delegates_to_store() {
        let authz = Authorizer::new(make_store());
        assert!(authz.is_granted(Some("editor"), Some("posts"), None));
        assert!(authz.is_granted(Some("editor"), Some("posts"), Some("write")));
        assert!(!authz.is_granted(Some("admin"), Some("posts"), None));
        assert!(!authz.is_granted(Some("editor"), Some("dash"), None));
    }

    #[test]
    fn test_privilege_without_resource() {
        let authz = Authorizer::new(make_store());
        assert!(authz.is_granted(Some("admin"), None, Some("ping")));
        assert!(authz.is_granted(Some("editor"), None, Some("ping")));
        assert!(!authz.is_granted(Some("admin"), None, Some("pong")));
    }

    #[test]
    fn test_missing_or_unknown_role_denied() {
        let authz = Authorizer::new(make_store());
        assert!(!authz.is_granted(None, Some("posts"), None));
        assert!(!authz.is_granted(Some(""), Some("posts"), None));
        assert!(!authz.is_granted(Some("ghost"), Some("posts"), None));
    }

    #[test]
    fn test_shared_authorizer_replace() {
        let shared = SharedAuthorizer::new(make_store());
        let before = shared.snapshot();
        assert!(!shared.is_granted(Some("admin"), Some("dash"), None));

        let mut next = make_store();
        next.allow("admin", Some("dash"), &PrivilegeSpec::All).unwrap();
        let old = shared.replace(next);

        assert_eq!(old.rule_count(), 2);
        assert!(shared.is_granted(Some("admin"), Some("dash"), None));
        // snapshots taken earlier keep answering from the old rules
        assert!(!before.is_granted(Some("admin"), Some("dash"), None));
    }

    #[test]
    fn test_concurrent_queries() {
        let authz = Authorizer::new(make_store());
        std::thread::scope(|s| {
            for _ in 0..4 {
                let authz = authz.clone();
                s.spawn(move || {
                    for _ in 0..100 {
                        assert!(authz.is_granted(Some("editor"), Some("posts"), Some("read")));
                        assert!(!authz.is_granted(Some("admin"), Some("posts"), Some("read")));
                    }
                });
            }
        });
    }
}
