use std::collections::{HashMap, HashSet, VecDeque};

use crate::authz::errors::AuthzError;
use crate::authz::types::{Effect, PrivilegeSpec};

#[derive(Debug, Clone)]
struct RoleRecord {
    name: String,
    /// Indices into `RuleStore::roles`, in declaration order.
    parents: Vec<usize>,
    /// false for stubs created because another role named this one as a parent
    declared: bool,
}

#[derive(Debug, Clone)]
struct ResourceRecord {
    name: String,
    parent: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    /// `None` matches every resource.
    resource: Option<usize>,
    /// `None` matches every privilege.
    privilege: Option<String>,
    effect: Effect,
}

/// Roles, resources and allow/deny rules for one authorization domain.
///
/// Records live in arenas indexed by name; parent links are arena indices.
/// Populated once by the builder, then shared read-only behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    roles: Vec<RoleRecord>,
    role_index: HashMap<String, usize>,
    resources: Vec<ResourceRecord>,
    resource_index: HashMap<String, usize>,
    /// Rules per role, parallel to `roles`, in registration order.
    rules: Vec<Vec<Rule>>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with the given parents. Parents not yet known are
    /// registered first as parentless stubs. A stub may later be declared
    /// explicitly, which fills in its parents.
    pub fn add_role<S: AsRef<str>>(&mut self, name: &str, parents: &[S]) -> Result<(), AuthzError> {
        if name.is_empty() {
            return Err(AuthzError::InvalidRole("role name must not be empty".into()));
        }
        for parent in parents {
            let parent = parent.as_ref();
            if parent.is_empty() {
                return Err(AuthzError::InvalidRole(format!(
                    "role `{name}` lists an empty parent name"
                )));
            }
            if parent == name {
                return Err(AuthzError::CyclicRoleInheritance(format!("{name} -> {name}")));
            }
        }

        let existing = self.role_index.get(name).copied();
        if let Some(idx) = existing {
            if self.roles[idx].declared {
                return Err(AuthzError::DuplicateRole(name.to_string()));
            }
        }

        let mut parent_ids = Vec::with_capacity(parents.len());
        for parent in parents {
            let parent = parent.as_ref();
            let id = match self.role_index.get(parent).copied() {
                Some(id) => id,
                None => {
                    tracing::debug!(role = %parent, child = %name, "Auto-registering parent role");
                    self.insert_role(parent, Vec::new(), false)
                }
            };
            if !parent_ids.contains(&id) {
                parent_ids.push(id);
            }
        }

        match existing {
            Some(idx) => {
                for &parent in &parent_ids {
                    if self.reaches(parent, idx) {
                        return Err(AuthzError::CyclicRoleInheritance(format!(
                            "{name} -> {}",
                            self.roles[parent].name
                        )));
                    }
                }
                let record = &mut self.roles[idx];
                record.parents = parent_ids;
                record.declared = true;
            }
            None => {
                self.insert_role(name, parent_ids, true);
            }
        }

        tracing::debug!(role = %name, parents = parents.len(), "Registered role");
        Ok(())
    }

    fn insert_role(&mut self, name: &str, parents: Vec<usize>, declared: bool) -> usize {
        let idx = self.roles.len();
        self.roles.push(RoleRecord {
            name: name.to_string(),
            parents,
            declared,
        });
        self.rules.push(Vec::new());
        self.role_index.insert(name.to_string(), idx);
        idx
    }

    /// Register a resource, optionally under an already registered parent.
    /// Registering the same resource again with the same parent is a no-op.
    pub fn add_resource(&mut self, name: &str, parent: Option<&str>) -> Result<(), AuthzError> {
        if name.is_empty() {
            return Err(AuthzError::InvalidResource(
                "resource name must not be empty".into(),
            ));
        }

        let parent_id = match parent {
            None => None,
            Some("") => {
                return Err(AuthzError::InvalidResource(format!(
                    "resource `{name}` has an empty parent name"
                )))
            }
            Some(p) if p == name => {
                return Err(AuthzError::InvalidResource(format!(
                    "resource `{name}` cannot be its own parent"
                )))
            }
            Some(p) => Some(
                *self
                    .resource_index
                    .get(p)
                    .ok_or_else(|| AuthzError::UnknownResource(p.to_string()))?,
            ),
        };

        if let Some(&idx) = self.resource_index.get(name) {
            let existing = self.resources[idx].parent;
            if existing == parent_id {
                tracing::debug!(resource = %name, "Resource already registered");
                return Ok(());
            }
            return Err(AuthzError::DuplicateResource {
                name: name.to_string(),
                existing: existing.map(|i| self.resources[i].name.clone()),
                requested: parent.map(str::to_string),
            });
        }

        let idx = self.resources.len();
        self.resources.push(ResourceRecord {
            name: name.to_string(),
            parent: parent_id,
        });
        self.resource_index.insert(name.to_string(), idx);
        tracing::debug!(resource = %name, parent = ?parent, "Registered resource");
        Ok(())
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.role_index.contains_key(name)
    }

    pub fn has_resource(&self, name: &str) -> bool {
        self.resource_index.contains_key(name)
    }

    /// Allow `role` the given privileges on `resource` (`None` = every resource).
    pub fn allow(
        &mut self,
        role: &str,
        resource: Option<&str>,
        privileges: &PrivilegeSpec,
    ) -> Result<(), AuthzError> {
        self.add_rule(Effect::Allow, role, resource, privileges)
    }

    /// Deny `role` the given privileges on `resource` (`None` = every resource).
    pub fn deny(
        &mut self,
        role: &str,
        resource: Option<&str>,
        privileges: &PrivilegeSpec,
    ) -> Result<(), AuthzError> {
        self.add_rule(Effect::Deny, role, resource, privileges)
    }

    fn add_rule(
        &mut self,
        effect: Effect,
        role: &str,
        resource: Option<&str>,
        privileges: &PrivilegeSpec,
    ) -> Result<(), AuthzError> {
        let role_id = *self
            .role_index
            .get(role)
            .ok_or_else(|| AuthzError::UnknownRole(role.to_string()))?;
        let resource_id = match resource {
            Some(r) => Some(
                *self
                    .resource_index
                    .get(r)
                    .ok_or_else(|| AuthzError::UnknownResource(r.to_string()))?,
            ),
            None => None,
        };

        let privileges = privileges.expand();
        if privileges.iter().any(|p| *p == Some("")) {
            return Err(AuthzError::InvalidPermission(format!(
                "empty privilege name in {effect} rule for role `{role}`"
            )));
        }
        if privileges.is_empty() {
            tracing::warn!(%role, ?resource, %effect, "Empty privilege list, no rule added");
        }

        let bucket = &mut self.rules[role_id];
        for privilege in privileges {
            bucket.push(Rule {
                resource: resource_id,
                privilege: privilege.map(str::to_string),
                effect,
            });
            tracing::debug!(%role, ?resource, ?privilege, %effect, "Registered rule");
        }
        Ok(())
    }

    /// Whether `role` may exercise `privilege` on `resource`.
    ///
    /// Unknown roles and unknown resources are denied. When nothing matches the
    /// default is deny.
    pub fn is_allowed(&self, role: &str, resource: Option<&str>, privilege: Option<&str>) -> bool {
        self.decide(role, resource, privilege)
            .map(Effect::is_allow)
            .unwrap_or(false)
    }

    /// Effect of the most specific matching rule, or `None` if no rule applies
    /// (or the role/resource is unknown).
    ///
    /// Resource specificity is the outer loop (the resource, its ancestors, then
    /// the wildcard), then privilege specificity, then role distance. Within a
    /// single role the last registered rule wins.
    ///
    /// A query without a privilege asks whether every privilege is allowed: a
    /// role that denies any single privilege at a resource level denies the
    /// whole query there, before its wildcard-privilege rule is consulted.
    pub fn decide(&self, role: &str, resource: Option<&str>, privilege: Option<&str>) -> Option<Effect> {
        let role_id = *self.role_index.get(role)?;
        let resource_chain = match resource {
            Some(r) => {
                let mut chain: Vec<Option<usize>> =
                    self.resource_lineage(*self.resource_index.get(r)?).into_iter().map(Some).collect();
                chain.push(None);
                chain
            }
            None => vec![None],
        };
        let role_order = self.role_lineage(role_id);

        let Some(privilege) = privilege else {
            for &res in &resource_chain {
                for &rid in &role_order {
                    if self.denies_any_privilege(rid, res) {
                        return Some(Effect::Deny);
                    }
                    if let Some(rule) = self.latest_rule(rid, res, None) {
                        return Some(rule.effect);
                    }
                }
            }
            return None;
        };

        for &res in &resource_chain {
            for priv_level in [Some(privilege), None] {
                for &rid in &role_order {
                    if let Some(rule) = self.latest_rule(rid, res, priv_level) {
                        return Some(rule.effect);
                    }
                }
            }
        }
        None
    }

    /// Last registered rule of `role` on exactly this resource and privilege level.
    fn latest_rule(&self, role: usize, resource: Option<usize>, privilege: Option<&str>) -> Option<&Rule> {
        self.rules[role]
            .iter()
            .rev()
            .find(|rule| rule.resource == resource && rule.privilege.as_deref() == privilege)
    }

    /// Whether the latest rule for some named privilege of `role` on `resource`
    /// is a deny.
    fn denies_any_privilege(&self, role: usize, resource: Option<usize>) -> bool {
        let mut seen = HashSet::new();
        self.rules[role]
            .iter()
            .rev()
            .filter(|rule| rule.resource == resource)
            .filter_map(|rule| rule.privilege.as_deref().map(|p| (p, rule.effect)))
            .any(|(p, effect)| seen.insert(p) && !effect.is_allow())
    }

    /// The role followed by its ancestors, breadth first. Later-declared
    /// parents are visited before earlier ones.
    fn role_lineage(&self, start: usize) -> Vec<usize> {
        let mut seen = vec![false; self.roles.len()];
        let mut order = Vec::new();
        let mut queue = VecDeque::from([start]);
        seen[start] = true;
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for &parent in self.roles[id].parents.iter().rev() {
                if !seen[parent] {
                    seen[parent] = true;
                    queue.push_back(parent);
                }
            }
        }
        order
    }

    /// The resource followed by its ancestors, nearest first.
    fn resource_lineage(&self, start: usize) -> Vec<usize> {
        let mut chain = vec![start];
        let mut current = self.resources[start].parent;
        while let Some(idx) = current {
            chain.push(idx);
            current = self.resources[idx].parent;
        }
        chain
    }

    /// Depth-first search from `from` through parent links for `target`.
    fn reaches(&self, from: usize, target: usize) -> bool {
        let mut seen = vec![false; self.roles.len()];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if std::mem::replace(&mut seen[id], true) {
                continue;
            }
            stack.extend(self.roles[id].parents.iter().copied());
        }
        false
    }

    /// Whether `role` inherits from `ancestor`, either directly
    /// (`only_parents`) or anywhere up the hierarchy.
    pub fn inherits_role(&self, role: &str, ancestor: &str, only_parents: bool) -> bool {
        let (Some(&role_id), Some(&ancestor_id)) =
            (self.role_index.get(role), self.role_index.get(ancestor))
        else {
            return false;
        };
        if role_id == ancestor_id {
            return false;
        }
        if only_parents {
            return self.roles[role_id].parents.contains(&ancestor_id);
        }
        self.reaches(role_id, ancestor_id)
    }

    /// Whether `resource` sits below `ancestor` in the resource tree.
    pub fn inherits_resource(&self, resource: &str, ancestor: &str, only_parent: bool) -> bool {
        let (Some(&res_id), Some(&ancestor_id)) =
            (self.resource_index.get(resource), self.resource_index.get(ancestor))
        else {
            return false;
        };
        if only_parent {
            return self.resources[res_id].parent == Some(ancestor_id);
        }
        self.resource_lineage(res_id)[1..].contains(&ancestor_id)
    }

    /// Direct parents of `role` in declaration order.
    pub fn parents(&self, role: &str) -> Option<Vec<&str>> {
        let idx = *self.role_index.get(role)?;
        Some(
            self.roles[idx]
                .parents
                .iter()
                .map(|&p| self.roles[p].name.as_str())
                .collect(),
        )
    }

    /// Role names in registration order (stubs included).
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(|r| r.name.as_str())
    }

    /// Resource names in registration order.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|r| r.name.as_str())
    }

    pub fn rule_count(&self) -> usize {
        self.rules.iter().map(Vec::len).sum()
    }
}
