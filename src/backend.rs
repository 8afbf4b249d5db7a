use crate::error::{Result, RunnerctlError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution backend the runner hands jobs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Container-engine backend using the built-in docker executor.
    Docker,
    /// LXD containers driven through the generic custom executor and a fixed
    /// set of lifecycle scripts.
    Lxd,
}

impl BackendKind {
    /// Map a configured backend identifier to a concrete strategy. Unknown
    /// identifiers are an unsupported-backend error; the caller must go
    /// Blocked and must not attempt registration.
    pub fn select(id: &str) -> Result<Self> {
        match id {
            "docker" => Ok(Self::Docker),
            "lxd" => Ok(Self::Lxd),
            other => Err(RunnerctlError::UnsupportedBackend(other.to_string())),
        }
    }

    /// Executor type passed to the registration command.
    pub fn executor(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Lxd => "custom",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Lxd => "lxd",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
