//! JSON policy documents.
//!
//! ```json
//! {
//!   "roles":     { "admin": [], "editor": ["admin"] },
//!   "resources": ["admin.dashboard", "admin.posts"],
//!   "allow":     { "editor": "admin.posts",
//!                  "admin":  { "admin.dashboard": null, "admin.posts": ["read"] } },
//!   "deny":      { "editor": { "admin.posts": "delete" } }
//! }
//! ```
//!
//! Shape errors are reported here; reference errors (unknown roles and
//! resources) are left to the builder.

use serde_json::{Map, Value};

use crate::authz::errors::AuthzError;
use crate::authz::types::*;

impl AclConfig {
    pub fn from_json_str(source: &str) -> Result<Self, AuthzError> {
        let value: Value = serde_json::from_str(source)?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &Value) -> Result<Self, AuthzError> {
        let doc = value.as_object().ok_or_else(|| {
            AuthzError::InvalidPolicy(format!(
                "policy document must be an object, found {}",
                kind(value)
            ))
        })?;

        let roles = match doc.get("roles") {
            None | Some(Value::Null) => None,
            Some(v) => Some(parse_roles(v)?),
        };
        let resources = match doc.get("resources") {
            None | Some(Value::Null) => None,
            Some(v) => Some(parse_resources(v)?),
        };
        let allow = parse_permissions(doc.get("allow"), "allow")?;
        let deny = parse_permissions(doc.get("deny"), "deny")?;

        Ok(AclConfig {
            roles,
            resources,
            allow,
            deny,
        })
    }
}

fn parse_roles(value: &Value) -> Result<Vec<RoleEntry>, AuthzError> {
    let map = value.as_object().ok_or_else(|| {
        AuthzError::InvalidRole(format!(
            "`roles` must map role names to parent lists, found {}",
            kind(value)
        ))
    })?;

    map.iter()
        .map(|(name, parents)| -> Result<RoleEntry, AuthzError> {
            let parents = match parents {
                Value::Null => Vec::new(),
                Value::Array(items) => items
                    .iter()
                    .map(|p| {
                        p.as_str().map(str::to_string).ok_or_else(|| {
                            AuthzError::InvalidRole(format!(
                                "parent of role `{name}` must be a string, found {}",
                                kind(p)
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                other => {
                    return Err(AuthzError::InvalidRole(format!(
                        "parents of role `{name}` must be a list, found {}",
                        kind(other)
                    )))
                }
            };
            Ok(RoleEntry {
                name: name.clone(),
                parents,
            })
        })
        .collect()
}

fn parse_resources(value: &Value) -> Result<Vec<ResourceEntry>, AuthzError> {
    let items = value.as_array().ok_or_else(|| {
        AuthzError::InvalidResource(format!(
            "`resources` must be a list of names, found {}",
            kind(value)
        ))
    })?;

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(|name| ResourceEntry {
                    name: name.to_string(),
                    parent: None,
                })
                .ok_or_else(|| {
                    AuthzError::InvalidResource(format!(
                        "resource names must be strings, found {}",
                        kind(item)
                    ))
                })
        })
        .collect()
}

fn parse_permissions(
    value: Option<&Value>,
    section: &str,
) -> Result<Vec<PermissionEntry>, AuthzError> {
    let map: &Map<String, Value> = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(AuthzError::InvalidPermission(format!(
                "`{section}` must map role names to resources, found {}",
                kind(other)
            )))
        }
    };

    map.iter()
        .map(|(role, spec)| -> Result<PermissionEntry, AuthzError> {
            Ok(PermissionEntry {
                role: role.clone(),
                resources: parse_resource_spec(role, spec)?,
            })
        })
        .collect()
}

fn parse_resource_spec(role: &str, value: &Value) -> Result<ResourceSpec, AuthzError> {
    match value {
        Value::String(resource) => Ok(ResourceSpec::Single(resource.clone())),
        Value::Object(map) => map
            .iter()
            .map(|(resource, privileges)| -> Result<(String, PrivilegeSpec), AuthzError> {
                Ok((resource.clone(), parse_privilege_spec(role, resource, privileges)?))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ResourceSpec::Privileges),
        other => Err(AuthzError::InvalidPermission(format!(
            "resources for role `{role}` must be defined as a string or as a mapping if you want to define privileges, found {}",
            kind(other)
        ))),
    }
}

fn parse_privilege_spec(role: &str, resource: &str, value: &Value) -> Result<PrivilegeSpec, AuthzError> {
    let invalid = |found: &Value| {
        AuthzError::InvalidPermission(format!(
            "privileges for role `{role}` on `{resource}` must be null, a string or a list of strings, found {}",
            kind(found)
        ))
    };

    match value {
        Value::Null => Ok(PrivilegeSpec::All),
        Value::String(p) => Ok(PrivilegeSpec::One(p.clone())),
        Value::Array(items) => items
            .iter()
            .map(|p| p.as_str().map(str::to_string).ok_or_else(|| invalid(p)))
            .collect::<Result<Vec<_>, _>>()
            .map(PrivilegeSpec::List),
        other => Err(invalid(other)),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
