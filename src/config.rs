/// Configuration module for skimcat.
///
/// Handles loading, validating, and providing default rendering options.
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ctxspec::FileExpansionRequest;

/// File name looked up in the working directory when no `--config` is given.
pub const LOCAL_CONFIG_FILE: &str = "skimcat.json";

// ── Default value functions ──────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_gutter_separator() -> char {
    '|'
}

fn default_page_size() -> usize {
    10_000
}

fn default_start_line() -> usize {
    1
}

fn default_ignore_globs() -> Vec<String> {
    vec!["**/.git/**".to_string()]
}

// ── Config structs ───────────────────────────────────────────────────

/// Options for rendering a single file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Collapse omittable chunks into placeholder markers.
    #[serde(default)]
    pub outline: bool,

    /// Wrap the output in a fenced code block headed by the path.
    #[serde(default = "default_true")]
    pub output_fencing: bool,

    #[serde(default = "default_true")]
    pub show_line_numbers: bool,

    #[serde(default = "default_gutter_separator")]
    pub gutter_separator: char,

    /// Lines per page; 0 shows the whole file.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// First line to show (1-based).
    #[serde(default = "default_start_line")]
    pub start_line: usize,

    #[serde(default = "default_true")]
    pub show_page_info: bool,

    /// Symbols whose bodies stay visible in outline mode.
    #[serde(default)]
    pub expand_symbols: BTreeSet<String>,
}

/// Options for walking and filtering a directory.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DirectoryOptions {
    #[serde(default = "default_ignore_globs")]
    pub ignore_globs: Vec<String>,

    #[serde(default)]
    pub include_globs: Vec<String>,

    /// Only render files with these extensions (leading `.` optional).
    #[serde(default)]
    pub include_extensions: Vec<String>,

    #[serde(default)]
    pub exclude_extensions: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub render: RenderOptions,

    #[serde(default)]
    pub directory: DirectoryOptions,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            outline: false,
            output_fencing: default_true(),
            show_line_numbers: default_true(),
            gutter_separator: default_gutter_separator(),
            page_size: default_page_size(),
            start_line: default_start_line(),
            show_page_info: default_true(),
            expand_symbols: BTreeSet::new(),
        }
    }
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            ignore_globs: default_ignore_globs(),
            include_globs: Vec::new(),
            include_extensions: Vec::new(),
            exclude_extensions: Vec::new(),
        }
    }
}

impl RenderOptions {
    /// Options for one file: symbols from a context spec request stay
    /// expanded, and a whole-file request turns outlining off.
    #[must_use]
    pub fn for_request(&self, request: Option<&FileExpansionRequest>) -> Self {
        let mut options = self.clone();
        match request {
            Some(r) if r.whole_file() => options.outline = false,
            Some(r) => options.expand_symbols.extend(r.symbols.iter().cloned()),
            None => {}
        }
        options
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// With an explicit path the file must exist. Otherwise `skimcat.json` in
    /// the working directory and then `<config dir>/skimcat/config.json` are
    /// tried; if neither exists the defaults are used. Invalid JSON falls
    /// back to defaults with a warning.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => match Self::discover() {
                Some(p) => p,
                None => {
                    info!("no config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {}: {e}", path.display());
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {}", path.display());
        Ok(cfg)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("skimcat").join("config.json"))
            .filter(|p| p.is_file())
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.render.start_line > 0, "start_line must be positive");
        anyhow::ensure!(
            self.directory.include_extensions.is_empty()
                || self.directory.exclude_extensions.is_empty(),
            "cannot specify extensions to include and exclude"
        );
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.render.outline);
        assert!(config.render.output_fencing);
        assert!(config.render.show_line_numbers);
        assert_eq!(config.render.gutter_separator, '|');
        assert_eq!(config.render.page_size, 10_000);
        assert_eq!(config.render.start_line, 1);
        assert_eq!(config.directory.ignore_globs, vec!["**/.git/**"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"render": {"outline": true, "page_size": 0}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.render.outline);
        assert_eq!(config.render.page_size, 0);
        assert!(config.render.show_page_info);
        assert_eq!(config.directory, DirectoryOptions::default());
    }

    #[test]
    fn test_validate_rejects_conflicts() {
        let mut config = Config::default();
        config.directory.include_extensions = vec!["go".into()];
        config.directory.exclude_extensions = vec!["md".into()];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.render.start_line = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_options_for_request() {
        let base = RenderOptions {
            outline: true,
            ..RenderOptions::default()
        };

        let whole = FileExpansionRequest {
            filename: "a.go".into(),
            symbols: vec![],
        };
        assert!(!base.for_request(Some(&whole)).outline);

        let partial = FileExpansionRequest {
            filename: "a.go".into(),
            symbols: vec!["Run".into()],
        };
        let options = base.for_request(Some(&partial));
        assert!(options.outline);
        assert!(options.expand_symbols.contains("Run"));

        assert_eq!(base.for_request(None), base);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.render.outline = true;
        config.render.expand_symbols.insert("main".into());
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_json_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("missing.json"))).is_err());
    }
}
