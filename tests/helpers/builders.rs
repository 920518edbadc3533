use aclgate::authz::{build, AclConfig, Authorizer, AuthzError, RuleStore};
use serde_json::{Map, Value};

/// Builder for JSON policy documents used across the integration tests
#[derive(Clone)]
pub struct AclBuilder {
    roles: Option<Map<String, Value>>,
    resources: Option<Vec<Value>>,
    allow: Map<String, Value>,
    deny: Map<String, Value>,
}

impl AclBuilder {
    pub fn new() -> Self {
        Self {
            roles: Some(Map::new()),
            resources: Some(Vec::new()),
            allow: Map::new(),
            deny: Map::new(),
        }
    }

    pub fn role(mut self, name: &str, parents: &[&str]) -> Self {
        self.roles
            .get_or_insert_with(Map::new)
            .insert(name.to_string(), Value::from(parents.to_vec()));
        self
    }

    pub fn resource(mut self, name: &str) -> Self {
        self.resources
            .get_or_insert_with(Vec::new)
            .push(Value::from(name));
        self
    }

    pub fn without_roles(mut self) -> Self {
        self.roles = None;
        self
    }

    pub fn without_resources(mut self) -> Self {
        self.resources = None;
        self
    }

    /// `spec` is a resource name or a `{resource: privileges}` mapping
    pub fn allow(mut self, role: &str, spec: Value) -> Self {
        self.allow.insert(role.to_string(), spec);
        self
    }

    pub fn deny(mut self, role: &str, spec: Value) -> Self {
        self.deny.insert(role.to_string(), spec);
        self
    }

    pub fn to_json(&self) -> Value {
        let mut doc = Map::new();
        if let Some(roles) = &self.roles {
            doc.insert("roles".into(), Value::Object(roles.clone()));
        }
        if let Some(resources) = &self.resources {
            doc.insert("resources".into(), Value::Array(resources.clone()));
        }
        if !self.allow.is_empty() {
            doc.insert("allow".into(), Value::Object(self.allow.clone()));
        }
        if !self.deny.is_empty() {
            doc.insert("deny".into(), Value::Object(self.deny.clone()));
        }
        Value::Object(doc)
    }

    pub fn try_build(&self) -> Result<RuleStore, AuthzError> {
        let config = AclConfig::from_json_value(&self.to_json())?;
        build(&config)
    }

    pub fn authorizer(&self) -> Authorizer {
        Authorizer::new(self.try_build().expect("Failed to build test ACL"))
    }
}
