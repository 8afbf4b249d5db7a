use crate::backend::BackendKind;
use crate::paths::Paths;
use crate::state::RegistrationState;
use std::fmt;
use std::path::Path;

/// Number of token characters surfaced to operators. The full token stays in
/// the config artifact on disk.
const FINGERPRINT_LEN: usize = 8;

/// User-facing status derived from persisted state and the on-disk token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ready {
        backend: Option<BackendKind>,
        fingerprint: String,
    },
    Waiting,
    Blocked(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ready {
                backend,
                fingerprint,
            } => {
                let backend = backend.map(|b| b.as_str()).unwrap_or("unknown");
                write!(f, "Ready {} ({})", backend, fingerprint)
            }
            Status::Waiting => write!(f, "Waiting: not registered"),
            Status::Blocked(reason) => write!(f, "Blocked: {}", reason),
        }
    }
}

/// First 8 characters of the token in the global config artifact, looked up
/// at `runners[0].token`. None when the artifact, the runner entry, or the
/// token is absent or empty.
pub fn token_fingerprint(config_file: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(config_file).ok()?;
    let value: toml::Value = contents.parse().ok()?;
    let token = value
        .get("runners")?
        .as_array()?
        .first()?
        .get("token")?
        .as_str()?;
    if token.is_empty() {
        return None;
    }
    Some(token.chars().take(FINGERPRINT_LEN).collect())
}

/// Derive status from state and the token artifact. Blocked is set directly
/// by the reconciliation controller, never derived here.
pub fn current(paths: &Paths, state: &RegistrationState) -> Status {
    match token_fingerprint(&paths.config_file) {
        Some(fingerprint) => Status::Ready {
            backend: state.active_backend,
            fingerprint,
        },
        None => Status::Waiting,
    }
}
