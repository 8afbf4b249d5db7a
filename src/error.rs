use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerctlError {
    #[error("Missing mandatory config: {0}")]
    MissingMandatoryConfig(String),

    #[error("Invalid tmpfs spec '{0}': expected 'path:options' with both sides non-empty")]
    InvalidTmpfsSpec(String),

    #[error("Unsupported backend '{0}'. Supported backends: docker, lxd")]
    UnsupportedBackend(String),

    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Template syntax error in {}: {}", .file.display(), .message)]
    TemplateSyntax { file: PathBuf, message: String },

    #[error("Undefined template variable '{}' in {}", .name, .file.display())]
    UndefinedVariable { file: PathBuf, name: String },

    #[error("Registration command exited with status {0}")]
    RegistrationFailed(i32),

    #[error("Registration command timed out after {0}s")]
    RegistrationTimedOut(u64),

    #[error("Already registered ({0})")]
    AlreadyRegistered(String),

    #[error("Runner CLI '{0}' not installed")]
    RunnerNotInstalled(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RunnerctlError>;
