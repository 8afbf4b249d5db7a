use crate::backend::BackendKind;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Persisted record of which backend is active and whether registration has
/// completed. Survives process restarts; cleared only on explicit teardown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_backend: Option<BackendKind>,

    #[serde(default)]
    pub registered: bool,

    /// RFC 3339 timestamp of the last successful registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<String>,
}

/// TOML-file-backed store for [`RegistrationState`]. The path is injected so
/// tests can run against a temporary tree. Reconciliation is strictly
/// sequential, so whole-file rewrites are the only synchronization needed.
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Current state; an absent file reads as the initial state.
    pub fn load(&self) -> Result<RegistrationState> {
        if !self.path.exists() {
            return Ok(RegistrationState::default());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&contents)?)
    }

    fn save(&self, state: &RegistrationState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string(state)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    pub fn set_active_backend(&self, backend: BackendKind) -> Result<()> {
        let mut state = self.load()?;
        state.active_backend = Some(backend);
        self.save(&state)
    }

    pub fn mark_registered(&self, registered: bool) -> Result<()> {
        let mut state = self.load()?;
        state.registered = registered;
        state.registered_at = registered.then(|| chrono::Utc::now().to_rfc3339());
        self.save(&state)
    }

    pub fn clear(&self) -> Result<()> {
        self.save(&RegistrationState::default())
    }
}
