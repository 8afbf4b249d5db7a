use crate::config::{Config, TmpfsSpec};
use crate::error::{Result, RunnerctlError};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub const GLOBAL_CONFIG_TEMPLATE: &str = "config.toml.tmpl";
pub const DOCKER_TEMPLATE: &str = "docker-template.toml.tmpl";
pub const DOCKER_TMPFS_TEMPLATE: &str = "docker-tmpfs.toml.tmpl";

/// Variables available during interpolation.
pub type Context = BTreeMap<String, String>;

/// Renders configuration artifacts from template files with `{{ name }}`
/// placeholders. Rendering happens fully in memory; artifacts are only
/// written once interpolation has succeeded in full.
pub struct Renderer {
    template_dir: PathBuf,
}

impl Renderer {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
        }
    }

    fn render_file(&self, name: &str, vars: &Context) -> Result<String> {
        let path = self.template_dir.join(name);
        let source = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                RunnerctlError::TemplateNotFound(path.clone())
            } else {
                RunnerctlError::Io(e)
            }
        })?;
        interpolate(&source, &path, vars)
    }

    /// Render the agent's global configuration from operator settings.
    pub fn render_global_config(&self, config: &Config) -> Result<String> {
        let mut vars = Context::new();
        vars.insert("concurrent".to_string(), config.concurrency.to_string());
        vars.insert(
            "check_interval".to_string(),
            config.check_interval.to_string(),
        );
        vars.insert("log_level".to_string(), config.log_level.clone());
        vars.insert("log_format".to_string(), config.log_format.clone());
        vars.insert(
            "sentry_dsn".to_string(),
            config.sentry_dsn.clone().unwrap_or_default(),
        );
        self.render_file(GLOBAL_CONFIG_TEMPLATE, &vars)
    }

    /// Render the docker executor registration template. Only required for
    /// the docker backend.
    pub fn render_docker_template(&self, config: &Config) -> Result<String> {
        let tmpfs_section = match config.tmpfs.as_deref() {
            Some(spec) if !spec.is_empty() => {
                let tmpfs = TmpfsSpec::parse(spec)?;
                let mut vars = Context::new();
                vars.insert("tmpfs_path".to_string(), tmpfs.path);
                vars.insert("tmpfs_options".to_string(), tmpfs.options);
                self.render_file(DOCKER_TMPFS_TEMPLATE, &vars)?
            }
            _ => String::new(),
        };

        let mut vars = Context::new();
        vars.insert("image".to_string(), config.image.clone());
        vars.insert("tmpfs_section".to_string(), tmpfs_section);
        self.render_file(DOCKER_TEMPLATE, &vars)
    }
}

/// Substitute `{{ name }}` placeholders from `vars`. Fails closed: an
/// unterminated or empty placeholder is a syntax error, an unknown name is
/// an undefined-variable error.
fn interpolate(source: &str, file: &Path, vars: &Context) -> Result<String> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| RunnerctlError::TemplateSyntax {
                file: file.to_path_buf(),
                message: "unterminated '{{' placeholder".to_string(),
            })?;
        let name = after[..end].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(RunnerctlError::TemplateSyntax {
                file: file.to_path_buf(),
                message: format!("invalid placeholder name '{}'", name),
            });
        }
        let value = vars
            .get(name)
            .ok_or_else(|| RunnerctlError::UndefinedVariable {
                file: file.to_path_buf(),
                name: name.to_string(),
            })?;
        out.push_str(value);
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Write a fully rendered artifact with the given permission bits. The
/// parent directory is created if needed and the file is replaced whole.
pub fn write_artifact(path: &Path, contents: &str, mode: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_renderer() -> Renderer {
        Renderer::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates"))
    }

    fn docker_config() -> Config {
        Config {
            coordinator_url: "https://ci.example.com".to_string(),
            registration_token: "tok".to_string(),
            backend: "docker".to_string(),
            concurrency: 4,
            check_interval: 7,
            log_level: "warning".to_string(),
            log_format: "json".to_string(),
            image: "alpine:3.20".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_interpolate_basic() {
        let mut vars = Context::new();
        vars.insert("name".to_string(), "world".to_string());
        let out = interpolate("hello {{ name }}!", Path::new("t"), &vars).unwrap();
        assert_eq!(out, "hello world!");
    }

    #[test]
    fn test_interpolate_undefined_variable() {
        let vars = Context::new();
        let err = interpolate("{{ missing }}", Path::new("t"), &vars).unwrap_err();
        assert!(matches!(err, RunnerctlError::UndefinedVariable { ref name, .. } if name == "missing"));
    }

    #[test]
    fn test_interpolate_unterminated() {
        let vars = Context::new();
        let err = interpolate("{{ oops", Path::new("t"), &vars).unwrap_err();
        assert!(matches!(err, RunnerctlError::TemplateSyntax { .. }));
    }

    #[test]
    fn test_interpolate_bad_name() {
        let mut vars = Context::new();
        vars.insert("a b".to_string(), "x".to_string());
        let err = interpolate("{{ a b }}", Path::new("t"), &vars).unwrap_err();
        assert!(matches!(err, RunnerctlError::TemplateSyntax { .. }));
    }

    #[test]
    fn test_missing_template_file() {
        let renderer = Renderer::new("/nonexistent/templates");
        let err = renderer
            .render_global_config(&docker_config())
            .unwrap_err();
        assert!(matches!(err, RunnerctlError::TemplateNotFound(_)));
    }

    #[test]
    fn test_global_config_roundtrip() {
        let rendered = repo_renderer()
            .render_global_config(&docker_config())
            .unwrap();
        let value: toml::Value = rendered.parse().unwrap();
        assert_eq!(value["concurrent"].as_integer(), Some(4));
        assert_eq!(value["check_interval"].as_integer(), Some(7));
        assert_eq!(value["log_level"].as_str(), Some("warning"));
        assert_eq!(value["log_format"].as_str(), Some("json"));
        assert_eq!(value["sentry_dsn"].as_str(), Some(""));
    }

    #[test]
    fn test_docker_template_without_tmpfs() {
        let rendered = repo_renderer()
            .render_docker_template(&docker_config())
            .unwrap();
        let value: toml::Value = rendered.parse().unwrap();
        let runner = &value["runners"].as_array().unwrap()[0];
        assert_eq!(runner["docker"]["image"].as_str(), Some("alpine:3.20"));
        assert!(runner["docker"].get("tmpfs").is_none());
    }

    #[test]
    fn test_docker_template_with_tmpfs() {
        let mut config = docker_config();
        config.tmpfs = Some("/scratch:rw,size=1g".to_string());
        let rendered = repo_renderer().render_docker_template(&config).unwrap();
        let value: toml::Value = rendered.parse().unwrap();
        let docker = &value["runners"].as_array().unwrap()[0]["docker"];
        assert_eq!(docker["tmpfs"]["/scratch"].as_str(), Some("rw,size=1g"));
    }

    #[test]
    fn test_write_artifact_creates_parents_and_sets_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc/gitlab-runner/config.toml");
        write_artifact(&path, "concurrent = 1\n", 0o600).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "concurrent = 1\n");
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
