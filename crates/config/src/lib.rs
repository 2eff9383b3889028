//! Layered configuration for tome.
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults.
//! 2. A config file: either the one passed explicitly (TOML, YAML or JSON,
//!    chosen by extension) or `tome.toml` in the user's config directory if
//!    it exists.
//! 3. Environment variables prefixed with `TOME_`, using `__` to separate
//!    sections from keys (`TOME_MONITOR__RESUME_DELAY_MS=2000`).
//!
//! ```toml
//! [naming]
//! default_pattern = "{author}/{% if series %}{series}/{% endif %}{title}"
//!
//! [monitor]
//! resume_delay_ms = 5000
//! settle_delay_ms = 1000
//!
//! [relocate]
//! pre_move_delay_ms = 500
//! settle_delay_ms = 1000
//!
//! [cleanup]
//! ignored_files = [".DS_Store", "Thumbs.db"]
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tome_library::{PathGenerator, Settings};

pub const ENV_PREFIX: &str = "TOME_";
pub const FILE_NAME: &str = "tome.toml";

/// Location of the implicit config file, whether or not it exists.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tome").map(|dirs| dirs.config_dir().join(FILE_NAME))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub naming: Naming,
    pub monitor: Monitor,
    pub relocate: Relocate,
    pub cleanup: Cleanup,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Naming {
    /// Pattern for libraries that don't define their own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Monitor {
    /// How long the watcher stays paused after a protected operation ends.
    pub resume_delay_ms: u64,
    /// Wait after a single-file move before its directories are watched again.
    pub settle_delay_ms: u64,
}

impl Default for Monitor {
    fn default() -> Self {
        Self {
            resume_delay_ms: 5000,
            settle_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Relocate {
    pub pre_move_delay_ms: u64,
    pub settle_delay_ms: u64,
}

impl Default for Relocate {
    fn default() -> Self {
        Self {
            pre_move_delay_ms: 500,
            settle_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cleanup {
    /// Files that don't stop a directory from being deleted as empty.
    pub ignored_files: Vec<String>,
}

impl Default for Cleanup {
    fn default() -> Self {
        Self {
            ignored_files: tome_library::cleanup::DEFAULT_IGNORED_FILES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Loads configuration from every source. An explicit `path` must exist;
    /// the implicit one is skipped when missing.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => default_path().filter(|p| p.is_file()),
        };
        match &file {
            Some(path) => tracing::debug!(path = %path.display(), "Loading config file"),
            None => tracing::debug!("No config file, using defaults and environment"),
        }
        Self::from_figment(Self::figment(file.as_deref())?)
    }

    /// The layered sources, for callers that want to add their own on top.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => figment.merge(Toml::file_exact(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
                Some("json") => figment.merge(Json::file_exact(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(pattern) = &self.naming.default_pattern {
            pattern
                .parse::<PathGenerator>()
                .or_raise(|| ErrorKind::Invalid(format!("naming.default_pattern {pattern:?} does not compile")))?;
        }
        for name in &self.cleanup.ignored_files {
            if name.trim().is_empty() {
                exn::bail!(ErrorKind::Invalid("cleanup.ignored_files contains an empty name".to_string()));
            }
            if name.contains(['/', '\\']) {
                exn::bail!(ErrorKind::Invalid(format!(
                    "cleanup.ignored_files entry {name:?} is a path, not a filename"
                )));
            }
        }
        Ok(())
    }

    /// Settings for the relocation engine.
    pub fn relocation_settings(&self) -> Settings {
        Settings {
            default_pattern: self.naming.default_pattern.clone(),
            pre_move_delay: Duration::from_millis(self.relocate.pre_move_delay_ms),
            batch_settle_delay: Duration::from_millis(self.relocate.settle_delay_ms),
            scoped_settle_delay: Duration::from_millis(self.monitor.settle_delay_ms),
            resume_delay: Duration::from_millis(self.monitor.resume_delay_ms),
            ignored_files: self.cleanup.ignored_files.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        config.validate().unwrap();
        let settings = config.relocation_settings();
        assert_eq!(settings.default_pattern, None);
        assert_eq!(settings.pre_move_delay, Duration::from_millis(500));
        assert_eq!(settings.batch_settle_delay, Duration::from_secs(1));
        assert_eq!(settings.scoped_settle_delay, Duration::from_secs(1));
        assert_eq!(settings.resume_delay, Duration::from_secs(5));
        assert!(settings.ignored_files.contains(".DS_Store"));
        assert!(settings.ignored_files.contains("Thumbs.db"));
    }

    #[test]
    fn test_file_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "tome.toml",
                r#"
                [naming]
                default_pattern = "{author}/{title}"

                [monitor]
                resume_delay_ms = 100
                "#,
            )?;
            jail.set_env("TOME_MONITOR__RESUME_DELAY_MS", "250");
            jail.set_env("TOME_RELOCATE__PRE_MOVE_DELAY_MS", "0");

            let config = Config::load(Some(jail.directory().join("tome.toml").as_path())).unwrap();
            assert_eq!(config.naming.default_pattern.as_deref(), Some("{author}/{title}"));
            assert_eq!(config.monitor.resume_delay_ms, 250);
            assert_eq!(config.monitor.settle_delay_ms, 1000);
            assert_eq!(config.relocate.pre_move_delay_ms, 0);
            Ok(())
        });
    }

    #[rstest]
    #[case("tome.yaml", "cleanup:\n  ignored_files: [desktop.ini]\n")]
    #[case("tome.json", r#"{"cleanup": {"ignored_files": ["desktop.ini"]}}"#)]
    fn test_other_formats(#[case] name: &str, #[case] contents: &str) {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        let config = Config::from_figment(Config::figment(Some(path.as_path())).unwrap()).unwrap();
        assert_eq!(config.cleanup.ignored_files, ["desktop.ini"]);
    }

    #[test]
    fn test_missing_explicit_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(temp_dir.path().join("nope.toml").as_path())).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let err = Config::figment(Some(Path::new("/etc/tome.ini"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_malformed_value() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("tome.toml");
        std::fs::write(&path, "[monitor]\nresume_delay_ms = \"soon\"\n").unwrap();
        let err = Config::from_figment(Config::figment(Some(path.as_path())).unwrap()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load));
    }

    #[rstest]
    #[case(vec![String::new()])]
    #[case(vec!["  ".to_string()])]
    #[case(vec!["sub/.DS_Store".to_string()])]
    fn test_invalid_ignored_files(#[case] ignored_files: Vec<String>) {
        let config = Config {
            cleanup: Cleanup { ignored_files },
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_invalid_pattern() {
        let config = Config {
            naming: Naming {
                default_pattern: Some("{% if title %}{title}".to_string()),
            },
            ..Config::default()
        };
        assert!(matches!(&*config.validate().unwrap_err(), ErrorKind::Invalid(_)));
    }
}
