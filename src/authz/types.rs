/// Outcome a rule imposes when it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn is_allow(self) -> bool {
        matches!(self, Effect::Allow)
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Allow => f.write_str("allow"),
            Effect::Deny => f.write_str("deny"),
        }
    }
}

/// Privileges a rule covers on each matched resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivilegeSpec {
    /// Every privilege (wildcard).
    All,
    One(String),
    List(Vec<String>),
}

impl PrivilegeSpec {
    /// One entry per rule to register; `None` is the privilege wildcard.
    /// An empty list yields nothing.
    pub fn expand(&self) -> Vec<Option<&str>> {
        match self {
            PrivilegeSpec::All => vec![None],
            PrivilegeSpec::One(p) => vec![Some(p.as_str())],
            PrivilegeSpec::List(ps) => ps.iter().map(|p| Some(p.as_str())).collect(),
        }
    }
}

/// Right-hand side of an `allow`/`deny` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSpec {
    /// A single resource, all privileges.
    Single(String),
    /// resource name -> privileges, in declaration order
    Privileges(Vec<(String, PrivilegeSpec)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleEntry {
    pub name: String,
    pub parents: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub name: String,
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionEntry {
    pub role: String,
    pub resources: ResourceSpec,
}

/// Declarative ACL document as read from one or more policy files.
///
/// `roles` and `resources` are optional here so that a missing section can be
/// reported by the builder instead of by the parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclConfig {
    pub roles: Option<Vec<RoleEntry>>,
    pub resources: Option<Vec<ResourceEntry>>,
    pub allow: Vec<PermissionEntry>,
    pub deny: Vec<PermissionEntry>,
}

impl AclConfig {
    /// Append another document's sections to this one. A section is present
    /// if either side declared it.
    pub fn merge(&mut self, other: AclConfig) {
        if let Some(roles) = other.roles {
            self.roles.get_or_insert_with(Vec::new).extend(roles);
        }
        if let Some(resources) = other.resources {
            self.resources.get_or_insert_with(Vec::new).extend(resources);
        }
        self.allow.extend(other.allow);
        self.deny.extend(other.deny);
    }
}
