use miette::Diagnostic;
use thiserror::Error;

/// Configuration errors raised while loading a policy or building a [`RuleStore`].
///
/// Every variant is fatal to the build; a store is never handed out half-populated.
///
/// [`RuleStore`]: crate::authz::store::RuleStore
#[derive(Debug, Error, Diagnostic)]
pub enum AuthzError {
    #[error("No ACL {0} configured")]
    #[diagnostic(
        code(aclgate::authz::missing_section),
        help("A policy must declare both a `roles` and a `resources` section, even if empty")
    )]
    MissingSection(&'static str),

    #[error("Invalid role: {0}")]
    #[diagnostic(
        code(aclgate::authz::invalid_role),
        help("Roles map a non-empty name to a list of parent role names")
    )]
    InvalidRole(String),

    #[error("Invalid resource: {0}")]
    #[diagnostic(
        code(aclgate::authz::invalid_resource),
        help("Resources are a list of non-empty resource names")
    )]
    InvalidResource(String),

    #[error("Invalid permission: {0}")]
    #[diagnostic(
        code(aclgate::authz::invalid_permission),
        help("Map each role to a resource name, or to a mapping of resource name -> null | privilege | [privileges]")
    )]
    InvalidPermission(String),

    #[error("Role `{0}` not found")]
    #[diagnostic(
        code(aclgate::authz::unknown_role),
        help("Declare the role under `roles` before referencing it in `allow` or `deny`")
    )]
    UnknownRole(String),

    #[error("Resource `{0}` not found")]
    #[diagnostic(
        code(aclgate::authz::unknown_resource),
        help("Declare the resource under `resources` before referencing it")
    )]
    UnknownResource(String),

    #[error("Role `{0}` is declared more than once")]
    #[diagnostic(code(aclgate::authz::duplicate_role))]
    DuplicateRole(String),

    #[error("Resource `{name}` is already registered with parent {existing:?}, cannot re-register with parent {requested:?}")]
    #[diagnostic(code(aclgate::authz::duplicate_resource))]
    DuplicateResource {
        name: String,
        existing: Option<String>,
        requested: Option<String>,
    },

    #[error("Cyclic role inheritance detected: {0}")]
    #[diagnostic(
        code(aclgate::authz::cyclic_roles),
        help("Check the parent lists in your role definitions for circular references")
    )]
    CyclicRoleInheritance(String),

    #[error("Failed to load policy file `{path}`")]
    #[diagnostic(
        code(aclgate::authz::policy_load),
        help("Check that the file exists and is readable")
    )]
    PolicyLoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid policy: {0}")]
    #[diagnostic(code(aclgate::authz::invalid_policy))]
    InvalidPolicy(String),

    #[error("KDL parse error: {0}")]
    #[diagnostic(
        code(aclgate::authz::kdl_parse),
        help("Check your KDL file syntax, see https://kdl.dev for the specification")
    )]
    KdlParse(String),

    #[error("JSON parse error: {0}")]
    #[diagnostic(code(aclgate::authz::json_parse))]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    #[diagnostic(code(aclgate::authz::io))]
    Io(#[from] std::io::Error),
}
