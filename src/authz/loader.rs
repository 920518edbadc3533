use std::path::Path;

use crate::authz::errors::AuthzError;
use crate::authz::policy::parse_kdl_document;
use crate::authz::store::RuleStore;
use crate::authz::types::*;

/// Load a policy file, or every `.kdl`/`.json` file in a directory, and build
/// a [`RuleStore`] from the merged documents.
pub fn load_policies(path: &Path) -> Result<RuleStore, AuthzError> {
    let config = read_policies(path)?;
    build(&config)
}

/// Read and merge policy documents without building them.
pub fn read_policies(path: &Path) -> Result<AclConfig, AuthzError> {
    if path.is_file() {
        return read_policy_file(path);
    }
    if !path.is_dir() {
        return Err(AuthzError::InvalidPolicy(format!(
            "policy path `{}` does not exist",
            path.display()
        )));
    }

    let mut entries: Vec<_> = std::fs::read_dir(path)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_policy_file(p))
        .collect();
    entries.sort();

    let mut config = AclConfig::default();
    for entry in &entries {
        config.merge(read_policy_file(entry)?);
    }

    tracing::info!(
        files = entries.len(),
        dir = %path.display(),
        "Read policy directory"
    );

    Ok(config)
}

fn is_policy_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "kdl" || ext == "json")
        .unwrap_or(false)
}

fn read_policy_file(path: &Path) -> Result<AclConfig, AuthzError> {
    let contents = std::fs::read_to_string(path).map_err(|source| AuthzError::PolicyLoadError {
        path: path.display().to_string(),
        source,
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("kdl") => parse_kdl_document(&contents),
        Some("json") => AclConfig::from_json_str(&contents),
        _ => Err(AuthzError::InvalidPolicy(format!(
            "unsupported policy file `{}` (expected a .kdl or .json file)",
            path.display()
        ))),
    }
}

/// Build a [`RuleStore`] from a configuration document.
///
/// Roles are registered first (undeclared parents become stubs), then
/// resources, then every `allow` entry followed by every `deny` entry. The
/// first error aborts the build.
pub fn build(config: &AclConfig) -> Result<RuleStore, AuthzError> {
    let roles = config
        .roles
        .as_ref()
        .ok_or(AuthzError::MissingSection("roles"))?;
    let resources = config
        .resources
        .as_ref()
        .ok_or(AuthzError::MissingSection("resources"))?;

    let mut store = RuleStore::new();

    for role in roles {
        store.add_role(&role.name, role.parents.as_slice())?;
    }

    for resource in resources {
        store.add_resource(&resource.name, resource.parent.as_deref())?;
    }

    apply_permissions(&mut store, &config.allow, Effect::Allow)?;
    apply_permissions(&mut store, &config.deny, Effect::Deny)?;

    tracing::info!(
        roles = store.roles().count(),
        resources = store.resources().count(),
        rules = store.rule_count(),
        "Built access control list"
    );

    Ok(store)
}

fn apply_permissions(
    store: &mut RuleStore,
    entries: &[PermissionEntry],
    effect: Effect,
) -> Result<(), AuthzError> {
    for entry in entries {
        match &entry.resources {
            ResourceSpec::Single(resource) => {
                add_rule(store, effect, &entry.role, resource, &PrivilegeSpec::All)?;
            }
            ResourceSpec::Privileges(map) => {
                for (resource, privileges) in map {
                    add_rule(store, effect, &entry.role, resource, privileges)?;
                }
            }
        }
    }
    Ok(())
}

fn add_rule(
    store: &mut RuleStore,
    effect: Effect,
    role: &str,
    resource: &str,
    privileges: &PrivilegeSpec,
) -> Result<(), AuthzError> {
    match effect {
        Effect::Allow => store.allow(role, Some(resource), privileges),
        Effect::Deny => store.deny(role, Some(resource), privileges),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blog_config() -> AclConfig {
        AclConfig {
            roles: Some(vec![
                RoleEntry {
                    name: "admin".into(),
                    parents: vec![],
                },
                RoleEntry {
                    name: "editor".into(),
                    parents: vec!["admin".into()],
                },
                RoleEntry {
                    name: "contributor".into(),
                    parents: vec!["editor".into()],
                },
            ]),
            resources: Some(vec![
                ResourceEntry {
                    name: "dash".into(),
                    parent: None,
                },
                ResourceEntry {
                    name: "posts".into(),
                    parent: None,
                },
            ]),
            allow: vec![PermissionEntry {
                role: "editor".into(),
                resources: ResourceSpec::Single("posts".into()),
            }],
            deny: vec![],
        }
    }

    #[test]
    fn test_build_basic() {
        let store = build(&blog_config()).unwrap();
        assert_eq!(store.roles().count(), 3);
        assert_eq!(store.resources().count(), 2);
        assert_eq!(store.rule_count(), 1);
        assert!(store.is_allowed("editor", Some("posts"), None));
        assert!(store.is_allowed("contributor", Some("posts"), None));
        assert!(!store.is_allowed("admin", Some("posts"), None));
    }

    #[test]
    fn test_missing_roles() {
        let config = AclConfig {
            roles: None,
            ..blog_config()
        };
        let err = build(&config).unwrap_err();
        assert!(matches!(err, AuthzError::MissingSection("roles")));
    }

    #[test]
    fn test_missing_resources() {
        let config = AclConfig {
            resources: None,
            ..blog_config()
        };
        let err = build(&config).unwrap_err();
        assert!(matches!(err, AuthzError::MissingSection("resources")));
        assert!(err.to_string().contains("resources"));
    }

    #[test]
    fn test_empty_roles_and_resources() {
        let store = build(&AclConfig {
            roles: Some(vec![]),
            resources: Some(vec![]),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(store.rule_count(), 0);
    }

    #[test]
    fn test_parent_declared_only_as_parent() {
        let config = AclConfig {
            roles: Some(vec![
                RoleEntry {
                    name: "admini".into(),
                    parents: vec![],
                },
                RoleEntry {
                    name: "editor".into(),
                    parents: vec!["administrator".into()],
                },
            ]),
            resources: Some(vec![ResourceEntry {
                name: "admin.posts".into(),
                parent: None,
            }]),
            allow: vec![PermissionEntry {
                role: "administrator".into(),
                resources: ResourceSpec::Privileges(vec![(
                    "admin.posts".into(),
                    PrivilegeSpec::List(vec!["read".into()]),
                )]),
            }],
            deny: vec![],
        };
        let store = build(&config).unwrap();
        let roles: Vec<_> = store.roles().collect();
        assert_eq!(roles, vec!["admini", "administrator", "editor"]);
        assert!(store.is_allowed("editor", Some("admin.posts"), Some("read")));
        assert!(!store.is_allowed("editor", Some("admin.posts"), Some("write")));
    }

    #[test]
    fn test_unknown_role_in_rule() {
        let mut config = blog_config();
        config.allow.push(PermissionEntry {
            role: "ghost".into(),
            resources: ResourceSpec::Single("posts".into()),
        });
        let err = build(&config).unwrap_err();
        assert!(matches!(err, AuthzError::UnknownRole(r) if r == "ghost"));
    }

    #[test]
    fn test_unknown_resource_in_rule() {
        let mut config = blog_config();
        config.deny.push(PermissionEntry {
            role: "admin".into(),
            resources: ResourceSpec::Single("read".into()),
        });
        let err = build(&config).unwrap_err();
        assert!(matches!(err, AuthzError::UnknownResource(r) if r == "read"));
    }

    #[test]
    fn test_deny_applied_after_allow() {
        let mut config = blog_config();
        config.allow.push(PermissionEntry {
            role: "admin".into(),
            resources: ResourceSpec::Privileges(vec![(
                "dash".into(),
                PrivilegeSpec::One("edit".into()),
            )]),
        });
        config.deny.push(PermissionEntry {
            role: "admin".into(),
            resources: ResourceSpec::Privileges(vec![(
                "dash".into(),
                PrivilegeSpec::One("edit".into()),
            )]),
        });
        let store = build(&config).unwrap();
        assert!(!store.is_allowed("admin", Some("dash"), Some("edit")));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();

        std::fs::write(
            dir.path().join("10_roles.kdl"),
            r#"
roles {
    admin
    editor "admin"
}
resources {
    - "dash"
}
"#,
        )
        .unwrap();

        std::fs::write(
            dir.path().join("20_rules.json"),
            r#"{ "resources": ["posts"], "allow": { "editor": "posts", "admin": { "dash": "view" } } }"#,
        )
        .unwrap();

        // Also write a non-policy file that should be ignored
        std::fs::write(dir.path().join("README.md"), "not a policy").unwrap();

        let store = load_policies(dir.path()).unwrap();
        assert_eq!(store.resources().collect::<Vec<_>>(), vec!["dash", "posts"]);
        assert!(store.is_allowed("editor", Some("posts"), None));
        assert!(store.is_allowed("editor", Some("dash"), Some("view")));
        assert!(!store.is_allowed("admin", Some("posts"), None));
    }

    #[test]
    fn test_load_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acl.json");
        std::fs::write(&path, r#"{ "roles": { "guest": [] } }"#).unwrap();

        let err = load_policies(&path).unwrap_err();
        assert!(matches!(err, AuthzError::MissingSection("resources")));
    }

    #[test]
    fn test_load_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acl.yaml");
        std::fs::write(&path, "roles: {}").unwrap();

        let err = load_policies(&path).unwrap_err();
        assert!(matches!(err, AuthzError::InvalidPolicy(_)));
    }

    #[test]
    fn test_load_nonexistent_path() {
        let err = load_policies(Path::new("/nonexistent/path")).unwrap_err();
        assert!(matches!(err, AuthzError::InvalidPolicy(_)));
    }
}
