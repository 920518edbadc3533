use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub policy: Policy,
    pub log: Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// A single `.kdl`/`.json` policy file or a directory of them
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            path: PathBuf::from("policies"),
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self, AppError> {
        let mut builder = config::Config::builder()
            .set_default(
                "policy.path",
                Policy::default().path.to_string_lossy().to_string(),
            )?
            .set_default("log.filter", Log::default().filter)?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: ACLGATE__POLICY__PATH=/etc/acl, etc.
        builder = builder.add_source(config::Environment::with_prefix("ACLGATE").separator("__"));

        let cfg = builder.build()?;
        let mut s: Settings = cfg.try_deserialize()?;

        // Normalize policy path to be relative to current dir
        if s.policy.path.is_relative() {
            s.policy.path = std::env::current_dir()?.join(&s.policy.path);
        }

        Ok(s)
    }
}
