use crate::authz::errors::AuthzError;
use crate::authz::types::*;
use kdl::{KdlDocument, KdlNode};

/// Parse a KDL document string into an [`AclConfig`].
///
/// ```kdl
/// roles {
///     admin
///     editor "admin"
/// }
/// resources {
///     - "admin.dashboard"
///     - "admin.posts" parent="admin.dashboard"
/// }
/// allow {
///     editor "admin.posts"
///     admin {
///         "admin.dashboard"
///         "admin.posts" "read" "write"
///     }
/// }
/// ```
pub fn parse_kdl_document(source: &str) -> Result<AclConfig, AuthzError> {
    let doc: KdlDocument = source
        .parse()
        .map_err(|e: kdl::KdlError| AuthzError::KdlParse(e.to_string()))?;

    let mut config = AclConfig::default();

    for node in doc.nodes() {
        match node.name().value() {
            "roles" => {
                let roles = config.roles.get_or_insert_with(Vec::new);
                for child in child_nodes(node) {
                    roles.push(parse_role(child)?);
                }
            }
            "resources" => {
                let resources = config.resources.get_or_insert_with(Vec::new);
                for child in child_nodes(node) {
                    resources.push(parse_resource(child)?);
                }
            }
            "allow" => {
                for child in child_nodes(node) {
                    config.allow.push(parse_permission(child)?);
                }
            }
            "deny" => {
                for child in child_nodes(node) {
                    config.deny.push(parse_permission(child)?);
                }
            }
            other => {
                tracing::warn!("ignoring unknown top-level KDL node `{other}`");
            }
        }
    }

    Ok(config)
}

fn parse_role(node: &KdlNode) -> Result<RoleEntry, AuthzError> {
    let name = node.name().value().to_string();
    if node.children().is_some() {
        return Err(AuthzError::InvalidRole(format!(
            "role `{name}` takes its parents as arguments (e.g. editor \"admin\"), not a block"
        )));
    }
    let parents = string_args(node).ok_or_else(|| {
        AuthzError::InvalidRole(format!("parents of role `{name}` must be strings"))
    })?;
    Ok(RoleEntry { name, parents })
}

fn parse_resource(node: &KdlNode) -> Result<ResourceEntry, AuthzError> {
    if node.name().value() != "-" {
        return Err(AuthzError::InvalidResource(format!(
            "unexpected node `{}` in resources (expected `- \"name\"`)",
            node.name().value()
        )));
    }
    let name = first_string_arg(node).ok_or_else(|| {
        AuthzError::InvalidResource(
            "resource entry requires a string argument (e.g. - \"admin.posts\")".into(),
        )
    })?;
    let parent = match node.get("parent") {
        None => None,
        Some(v) => Some(v.as_string().map(str::to_string).ok_or_else(|| {
            AuthzError::InvalidResource(format!("parent of resource `{name}` must be a string"))
        })?),
    };
    Ok(ResourceEntry { name, parent })
}

fn parse_permission(node: &KdlNode) -> Result<PermissionEntry, AuthzError> {
    let role = node.name().value().to_string();

    let resources = if let Some(children) = node.children() {
        let mut entries = Vec::new();
        for child in children.nodes() {
            let resource = child.name().value().to_string();
            let privileges = string_args(child).ok_or_else(|| {
                AuthzError::InvalidPermission(format!(
                    "privileges for role `{role}` on `{resource}` must be strings"
                ))
            })?;
            let spec = match privileges.len() {
                0 => PrivilegeSpec::All,
                1 => PrivilegeSpec::One(privileges.into_iter().next().unwrap_or_default()),
                _ => PrivilegeSpec::List(privileges),
            };
            entries.push((resource, spec));
        }
        ResourceSpec::Privileges(entries)
    } else {
        match string_args(node).as_deref() {
            Some([resource]) => ResourceSpec::Single(resource.clone()),
            _ => {
                return Err(AuthzError::InvalidPermission(format!(
                    "resources for role `{role}` must be defined as a string or as a mapping if you want to define privileges"
                )))
            }
        }
    };

    Ok(PermissionEntry { role, resources })
}

fn child_nodes(node: &KdlNode) -> &[KdlNode] {
    node.children().map(|c| c.nodes()).unwrap_or(&[])
}

/// Extract the first string argument from a KDL node.
fn first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// All positional arguments as strings, or `None` if any is not a string.
fn string_args(node: &KdlNode) -> Option<Vec<String>> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| e.value().as_string().map(str::to_string))
        .collect()
}
