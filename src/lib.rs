//! aclgate - hierarchical role/resource access control
//!
//! Build a [`RuleStore`](authz::RuleStore) from KDL or JSON policy documents,
//! then answer `is_granted(role, resource, privilege)` through an
//! [`Authorizer`](authz::Authorizer).

pub mod authz;
pub mod errors;
pub mod settings;
