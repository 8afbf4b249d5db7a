use crate::error::{Result, RunnerctlError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Operator-supplied configuration for the managed runner.
///
/// Loaded once per trigger from the config file. The connection settings
/// (`RUNNERCTL_COORDINATOR_URL`, `RUNNERCTL_REGISTRATION_TOKEN`,
/// `RUNNERCTL_BACKEND`) can be overridden from the environment; everything
/// else comes from the file. Unknown keys are rejected at the boundary
/// rather than deep inside the reconciliation logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// URL of the CI coordinator the runner registers with.
    #[serde(default)]
    pub coordinator_url: String,

    /// Registration token issued by the coordinator.
    #[serde(default)]
    pub registration_token: String,

    /// Execution backend: "docker" or "lxd".
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Tags advertised to the coordinator.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Accept jobs without tags.
    #[serde(default)]
    pub run_untagged: bool,

    /// Lock the runner to the current project.
    #[serde(default)]
    pub locked: bool,

    /// Maximum number of concurrent jobs. Must be positive.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Seconds between job request polls.
    #[serde(default = "default_check_interval")]
    pub check_interval: u32,

    /// Log level written into the agent's global config.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format written into the agent's global config.
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Optional error-reporting endpoint for the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentry_dsn: Option<String>,

    /// Container image for the docker executor.
    #[serde(default = "default_image")]
    pub image: String,

    /// Optional tmpfs mount for the docker executor, as "path:options".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmpfs: Option<String>,
}

fn default_backend() -> String {
    "docker".to_string()
}

fn default_concurrency() -> u32 {
    1
}

fn default_check_interval() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_image() -> String {
    "ubuntu:latest".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            coordinator_url: String::new(),
            registration_token: String::new(),
            backend: default_backend(),
            tags: vec![],
            run_untagged: false,
            locked: false,
            concurrency: default_concurrency(),
            check_interval: default_check_interval(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            sentry_dsn: None,
            image: default_image(),
            tmpfs: None,
        }
    }
}

impl Config {
    /// Load configuration with precedence:
    /// 1. Environment variables (connection settings only)
    /// 2. Config file
    /// 3. Built-in defaults
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            Self::default()
        };
        Ok(config.merge_env())
    }

    /// Apply environment overrides for the connection settings. The rest of
    /// the configuration is file-only.
    fn merge_env(mut self) -> Self {
        if let Ok(url) = std::env::var("RUNNERCTL_COORDINATOR_URL") {
            self.coordinator_url = url;
        }
        if let Ok(token) = std::env::var("RUNNERCTL_REGISTRATION_TOKEN") {
            self.registration_token = token;
        }
        if let Ok(backend) = std::env::var("RUNNERCTL_BACKEND") {
            self.backend = backend;
        }
        self
    }

    /// Check completeness and internal consistency. Pure; no side effects.
    pub fn validate(&self) -> Result<()> {
        let mut missing = vec![];
        if self.coordinator_url.is_empty() {
            missing.push("coordinator_url");
        }
        if self.registration_token.is_empty() {
            missing.push("registration_token");
        }
        if self.backend.is_empty() {
            missing.push("backend");
        }
        if !missing.is_empty() {
            return Err(RunnerctlError::MissingMandatoryConfig(missing.join(", ")));
        }

        if self.concurrency == 0 {
            return Err(RunnerctlError::InvalidConfig(
                "concurrency must be positive".to_string(),
            ));
        }

        // tmpfs only applies to the docker executor
        if self.backend == "docker" {
            if let Some(spec) = self.tmpfs.as_deref() {
                if !spec.is_empty() {
                    TmpfsSpec::parse(spec)?;
                }
            }
        }

        Ok(())
    }
}

/// A parsed docker tmpfs mount specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmpfsSpec {
    pub path: String,
    pub options: String,
}

impl TmpfsSpec {
    /// Parse a "path:options" spec. Exactly one ':' separator, both sides
    /// non-empty.
    pub fn parse(spec: &str) -> Result<Self> {
        if spec.matches(':').count() != 1 {
            return Err(RunnerctlError::InvalidTmpfsSpec(spec.to_string()));
        }
        match spec.split_once(':') {
            Some((path, options)) if !path.is_empty() && !options.is_empty() => Ok(Self {
                path: path.to_string(),
                options: options.to_string(),
            }),
            _ => Err(RunnerctlError::InvalidTmpfsSpec(spec.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_config() -> Config {
        Config {
            coordinator_url: "https://ci.example.com".to_string(),
            registration_token: "tok-123".to_string(),
            backend: "docker".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend, "docker");
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.check_interval, 3);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, "text");
        assert!(config.tags.is_empty());
        assert!(!config.run_untagged);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            coordinator_url = "https://ci.example.com"
            registration_token = "tok-123"
            backend = "lxd"
            tags = ["linux", "fast"]
            run_untagged = true
            locked = true
            concurrency = 4
            check_interval = 10
            log_level = "debug"
            log_format = "json"
            sentry_dsn = "https://sentry.example.com/1"
            image = "alpine:3.20"
            tmpfs = "/scratch:rw,size=1g"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.backend, "lxd");
        assert_eq!(config.tags, vec!["linux", "fast"]);
        assert_eq!(config.concurrency, 4);
        assert_eq!(
            config.sentry_dsn.as_deref(),
            Some("https://sentry.example.com/1")
        );
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let toml = r#"
            coordinator_url = "https://ci.example.com"
            mystery_knob = true
        "#;
        let result: std::result::Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_missing_mandatory() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Missing mandatory config"));
        assert!(msg.contains("coordinator_url"));
        assert!(msg.contains("registration_token"));
    }

    #[test]
    fn test_validate_missing_token_only() {
        let mut config = valid_config();
        config.registration_token = String::new();
        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("registration_token"));
        assert!(!msg.contains("coordinator_url"));
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = valid_config();
        config.concurrency = 0;
        assert!(matches!(
            config.validate(),
            Err(RunnerctlError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_tmpfs_ok() {
        let mut config = valid_config();
        config.tmpfs = Some("/scratch:rw,size=1g".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_tmpfs_malformed() {
        for spec in ["/scratch", "/scratch:", ":rw", "a:b:c", ":"] {
            let mut config = valid_config();
            config.tmpfs = Some(spec.to_string());
            assert!(
                matches!(
                    config.validate(),
                    Err(RunnerctlError::InvalidTmpfsSpec(_))
                ),
                "spec {:?} should be rejected",
                spec
            );
        }
    }

    #[test]
    fn test_validate_tmpfs_ignored_for_lxd() {
        let mut config = valid_config();
        config.backend = "lxd".to_string();
        config.tmpfs = Some("not-a-spec".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tmpfs_split_on_first_colon_only() {
        let spec = TmpfsSpec::parse("/scratch:rw").unwrap();
        assert_eq!(spec.path, "/scratch");
        assert_eq!(spec.options, "rw");
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let config = Config::load(Path::new("/nonexistent/runnerctl.toml")).unwrap();
        assert_eq!(config.backend, "docker");
        assert!(config.coordinator_url.is_empty());
    }

    #[test]
    #[serial_test::serial]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "coordinator_url = \"https://file.example.com\"").unwrap();
        drop(file);

        std::env::set_var("RUNNERCTL_COORDINATOR_URL", "https://env.example.com");
        let config = Config::load(&path).unwrap();
        std::env::remove_var("RUNNERCTL_COORDINATOR_URL");

        assert_eq!(config.coordinator_url, "https://env.example.com");
    }

    #[test]
    #[serial_test::serial]
    fn test_only_connection_settings_overridable_from_env() {
        std::env::set_var("RUNNERCTL_IMAGE", "env-image:latest");
        let config = Config::load(Path::new("/nonexistent/runnerctl.toml")).unwrap();
        std::env::remove_var("RUNNERCTL_IMAGE");

        assert_eq!(config.image, "ubuntu:latest");
    }
}
