pub mod document;
pub mod engine;
pub mod errors;
pub mod loader;
pub mod policy;
pub mod store;
pub mod types;

pub use engine::{Authorizer, SharedAuthorizer};
pub use errors::AuthzError;
pub use loader::{build, load_policies};
pub use store::RuleStore;
pub use types::{AclConfig, Effect, PrivilegeSpec, ResourceSpec};
