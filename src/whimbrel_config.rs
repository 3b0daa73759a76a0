//! Configuration: `.whimbrel/whimbrel.toml`, layered under CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [project]
//! name = "my-project"
//!
//! [run]
//! yes = false
//! report_dir = ".whimbrel"
//! log_level = "info"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Ambient per-run knobs carried on the context.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Skip the write-mode confirmation gate
    pub yes: bool,
    /// Trial-only run
    pub dry_run: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WhimbrelConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub run: RunDefaults,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunDefaults {
    /// Default for `--yes`
    #[serde(default)]
    pub yes: bool,
    /// Where run reports land; `.whimbrel` under the project by default
    #[serde(default)]
    pub report_dir: Option<PathBuf>,
    /// Default tracing filter when `RUST_LOG` is unset
    #[serde(default)]
    pub log_level: Option<String>,
}

impl WhimbrelConfig {
    pub fn config_path(project_dir: &Path) -> PathBuf {
        project_dir.join(".whimbrel").join("whimbrel.toml")
    }

    /// Load the project's config; a missing file yields the defaults.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = Self::config_path(project_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// The directory run reports are written to.
    pub fn report_dir(&self, project_dir: &Path) -> PathBuf {
        match &self.run.report_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => project_dir.join(dir),
            None => project_dir.join(".whimbrel"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_config_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = WhimbrelConfig::load(dir.path()).unwrap();
        assert_eq!(config, WhimbrelConfig::default());
        assert!(!config.run.yes);
    }

    #[test]
    fn config_loads_from_toml() {
        let dir = tempdir().unwrap();
        let config_dir = dir.path().join(".whimbrel");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join("whimbrel.toml"),
            r#"
[project]
name = "mono"

[run]
yes = true
log_level = "debug"
"#,
        )
        .unwrap();

        let config = WhimbrelConfig::load(dir.path()).unwrap();
        assert_eq!(config.project.name.as_deref(), Some("mono"));
        assert!(config.run.yes);
        assert_eq!(config.run.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn invalid_toml_errors_with_path() {
        let dir = tempdir().unwrap();
        let config_dir = dir.path().join(".whimbrel");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("whimbrel.toml"), "[run\nbroken").unwrap();

        let err = WhimbrelConfig::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn report_dir_defaults_under_project() {
        let config = WhimbrelConfig::default();
        assert_eq!(
            config.report_dir(Path::new("/proj")),
            PathBuf::from("/proj/.whimbrel")
        );

        let mut custom = WhimbrelConfig::default();
        custom.run.report_dir = Some(PathBuf::from("reports"));
        assert_eq!(
            custom.report_dir(Path::new("/proj")),
            PathBuf::from("/proj/reports")
        );
    }
}
