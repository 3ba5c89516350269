//! Configuration file support for panesync
//!
//! Config file location: `~/.config/panesync/config.toml` (XDG_CONFIG_HOME)
//!
//! Example config:
//! ```toml
//! [ui]
//! granularity = "line"
//! view = "text"
//! line_wrap = false
//! line_numbers = true
//!
//! [sync]
//! enabled = true
//! echo_window_ms = 50
//! frame_ms = 16
//!
//! [diff]
//! algorithm = "histogram"
//! max_edit_length = 20000
//! timeout_ms = 2000
//! ```

use panesync_core::{DiffAlgorithm, DiffEngine, Granularity, SyncConfig, ViewKind};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// UI configuration
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Diff granularity: "char", "word", "line", "sentence", "json" or "patch"
    pub granularity: Option<String>,
    /// Result view for json granularity: "text" or "structured"
    pub view: Option<String>,
    /// Wrap long lines instead of cutting them off
    pub line_wrap: bool,
    /// Show line numbers in the input panes
    pub line_numbers: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            granularity: None,
            view: None,
            line_wrap: false,
            line_numbers: true,
        }
    }
}

/// Scroll sync configuration
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    #[serde(flatten)]
    pub sync: SyncConfig,
    /// Frame interval of the event loop in milliseconds
    pub frame_ms: u64,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            frame_ms: 16,
        }
    }
}

/// Diff engine configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// "histogram", "myers" or "myers-minimal"
    pub algorithm: Option<String>,
    /// Give up when more tokens than this changed
    pub max_edit_length: Option<usize>,
    /// Give up when the diff takes longer than this
    pub timeout_ms: Option<u64>,
}

/// Root configuration
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub ui: UiConfig,
    pub sync: SyncSection,
    pub diff: DiffConfig,
}

impl Config {
    /// Get all possible config file paths in priority order
    fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("panesync").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("panesync").join("config.toml"));
        }

        // ~/Library/Application Support on macOS
        if let Some(config_dir) = dirs::config_dir() {
            let platform_path = config_dir.join("panesync").join("config.toml");
            if !paths.contains(&platform_path) {
                paths.push(platform_path);
            }
        }

        paths
    }

    /// Get the first existing config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_paths().into_iter().find(|p| p.exists())
    }

    /// Load config from XDG config path
    /// Returns default config if file doesn't exist or can't be parsed
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| {
                log::debug!("loading config from {}", path.display());
                std::fs::read_to_string(&path).ok()
            })
            .and_then(|content| Self::parse(&content))
            .unwrap_or_default()
    }

    fn parse(content: &str) -> Option<Self> {
        toml::from_str(content)
            .map_err(|e| {
                log::warn!("failed to parse config: {e}");
                e
            })
            .ok()
    }

    pub fn parse_granularity(&self) -> Option<Granularity> {
        let name = self.ui.granularity.as_deref()?;
        name.parse()
            .map_err(|e| log::warn!("ignoring [ui] granularity: {e}"))
            .ok()
    }

    pub fn parse_view(&self) -> Option<ViewKind> {
        self.ui.view.as_deref().and_then(|s| match s {
            "text" => Some(ViewKind::Text),
            "structured" | "tree" => Some(ViewKind::Structured),
            other => {
                log::warn!("ignoring unknown [ui] view {other:?}");
                None
            }
        })
    }

    pub fn parse_algorithm(&self) -> Option<DiffAlgorithm> {
        self.diff.algorithm.as_deref().and_then(|s| match s {
            "histogram" => Some(DiffAlgorithm::Histogram),
            "myers" => Some(DiffAlgorithm::Myers),
            "myers-minimal" | "minimal" => Some(DiffAlgorithm::MyersMinimal),
            other => {
                log::warn!("ignoring unknown [diff] algorithm {other:?}");
                None
            }
        })
    }

    /// Diff engine configured from the `[diff]` section
    pub fn engine(&self) -> DiffEngine {
        DiffEngine::new()
            .with_algorithm(self.parse_algorithm().unwrap_or_default())
            .with_max_edit_length(self.diff.max_edit_length)
            .with_timeout(self.diff.timeout_ms.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = Config::parse("").unwrap();
        assert!(config.sync.sync.enabled);
        assert_eq!(config.sync.sync.echo_window_ms, 50);
        assert_eq!(config.sync.frame_ms, 16);
        assert!(config.ui.line_numbers);
        assert_eq!(config.parse_granularity(), None);
    }

    #[test]
    fn test_parse_sections() {
        let config = Config::parse(
            r#"
            [ui]
            granularity = "word"
            view = "structured"
            line_wrap = true

            [sync]
            enabled = false
            echo_window_ms = 80

            [diff]
            algorithm = "myers"
            max_edit_length = 100
            "#,
        )
        .unwrap();
        assert_eq!(config.parse_granularity(), Some(Granularity::Word));
        assert_eq!(config.parse_view(), Some(ViewKind::Structured));
        assert!(config.ui.line_wrap);
        assert!(!config.sync.sync.enabled);
        assert_eq!(config.sync.sync.echo_window_ms, 80);
        assert_eq!(config.sync.frame_ms, 16);
        assert_eq!(config.parse_algorithm(), Some(DiffAlgorithm::Myers));
        assert_eq!(config.diff.max_edit_length, Some(100));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(Config::parse("[sync]\nenabled = \"yes\"").is_none());
    }

    #[test]
    fn test_unknown_values_are_ignored() {
        let config = Config::parse("[ui]\ngranularity = \"paragraph\"\nview = \"3d\"").unwrap();
        assert_eq!(config.parse_granularity(), None);
        assert_eq!(config.parse_view(), None);
    }
}
