//! Runner configuration

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TapResult;
use crate::format;

/// When to style output with ANSI colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color when stdout is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn enabled(self) -> bool {
        match self {
            ColorMode::Auto => std::io::stdout().is_terminal(),
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Wrap width; detected from the terminal when unset
    pub width: Option<usize>,

    /// Output coloring
    pub color: ColorMode,

    /// Directory failure locations are made relative to
    pub base_dir: PathBuf,

    /// Locations under this directory are shown as project frames
    pub project_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            width: None,
            color: ColorMode::Auto,
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            project_dir: PathBuf::from("tests"),
        }
    }
}

/// The fields a config file actually sets
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    width: Option<usize>,
    color: Option<ColorMode>,
    base_dir: Option<PathBuf>,
    project_dir: Option<PathBuf>,
}

impl RunnerConfig {
    /// Load configuration from a TOML file; a missing file yields defaults
    pub fn load(path: &Path) -> TapResult<Self> {
        Self::default().load_over(path)
    }

    /// Apply the fields set in a TOML file over `self`. Fields the file
    /// leaves out keep their current value; a missing file changes nothing.
    pub fn load_over(mut self, path: &Path) -> TapResult<Self> {
        if !path.exists() {
            return Ok(self);
        }
        let content = std::fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&content)?;

        if file.width.is_some() {
            self.width = file.width;
        }
        if let Some(color) = file.color {
            self.color = color;
        }
        if let Some(base_dir) = file.base_dir {
            self.base_dir = base_dir;
        }
        if let Some(project_dir) = file.project_dir {
            self.project_dir = project_dir;
        }
        Ok(self)
    }

    /// Effective wrap width
    pub fn resolved_width(&self) -> usize {
        self.width
            .filter(|width| *width > 0)
            .unwrap_or_else(format::detect_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = RunnerConfig::load(&tmp.path().join("soltap.toml")).unwrap();
        assert_eq!(config.width, None);
        assert_eq!(config.color, ColorMode::Auto);
        assert_eq!(config.project_dir, PathBuf::from("tests"));
    }

    #[test]
    fn test_partial_file_overrides_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("soltap.toml");
        std::fs::write(&path, "width = 100\ncolor = \"never\"\nproject_dir = \"specs\"\n").unwrap();

        let config = RunnerConfig::load(&path).unwrap();
        assert_eq!(config.resolved_width(), 100);
        assert!(!config.color.enabled());
        assert_eq!(config.project_dir, PathBuf::from("specs"));
    }

    #[test]
    fn test_load_over_keeps_unset_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("soltap.toml");
        std::fs::write(&path, "color = \"always\"\n").unwrap();

        let seeded = RunnerConfig {
            width: Some(72),
            project_dir: PathBuf::from("crates/e2e"),
            ..RunnerConfig::default()
        };
        let config = seeded.load_over(&path).unwrap();
        assert_eq!(config.color, ColorMode::Always);
        assert_eq!(config.width, Some(72));
        assert_eq!(config.project_dir, PathBuf::from("crates/e2e"));
    }

    #[test]
    fn test_invalid_file_is_a_config_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("soltap.toml");
        std::fs::write(&path, "width = \"wide\"").unwrap();

        let error = RunnerConfig::load(&path).unwrap_err();
        assert!(error.to_string().starts_with("Config error:"));
    }
}
