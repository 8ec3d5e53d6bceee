//! Exclusion-rule configuration for queue admission.
//!
//! Mirrors the app-config layout the UI suite ships: a JSON document
//! with `files.excluded` / `folders.excluded` pattern lists and a
//! match-options bag per list.

use crate::utils::get_config_dir;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the config directory
pub const FILTER_CONFIG_FILE: &str = "app.config.json";

fn default_true() -> bool {
    true
}

/// Glob-matching knobs for one exclusion list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchOptions {
    /// Match case-sensitively (default true)
    pub case_sensitive: bool,
    /// Require `*` to not cross `/` boundaries
    pub literal_separator: bool,
    /// Treat `\` as an escape character rather than a path separator
    pub backslash_escape: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            case_sensitive: true,
            literal_separator: false,
            backslash_escape: true,
        }
    }
}

/// One exclusion list plus its matching options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExclusionRules {
    /// Glob patterns; anything matching one of these is rejected
    pub excluded: Vec<String>,
    pub match_options: MatchOptions,
}

/// Admission-filter configuration: filename rules and parent-folder rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub files: ExclusionRules,
    pub folders: ExclusionRules,
}

impl FilterSettings {
    /// Convenience constructor used by tests and demos
    pub fn with_patterns(files: Vec<String>, folders: Vec<String>) -> Self {
        FilterSettings {
            files: ExclusionRules {
                excluded: files,
                match_options: MatchOptions::default(),
            },
            folders: ExclusionRules {
                excluded: folders,
                match_options: MatchOptions::default(),
            },
        }
    }
}

/// Supplies exclusion patterns to the queue manager.
///
/// The queue polls its policy source on every enqueue call, so pattern
/// changes take effect for subsequent admissions without a restart.
pub trait FilterPolicySource: Send + Sync {
    fn excluded_files(&self) -> Vec<String>;
    fn excluded_folders(&self) -> Vec<String>;
    fn file_match_options(&self) -> MatchOptions;
    fn folder_match_options(&self) -> MatchOptions;
}

impl FilterPolicySource for FilterSettings {
    fn excluded_files(&self) -> Vec<String> {
        self.files.excluded.clone()
    }

    fn excluded_folders(&self) -> Vec<String> {
        self.folders.excluded.clone()
    }

    fn file_match_options(&self) -> MatchOptions {
        self.files.match_options
    }

    fn folder_match_options(&self) -> MatchOptions {
        self.folders.match_options
    }
}

/// Loads filter settings from the given file, falling back to the
/// config directory. A missing file yields the default (no exclusions).
pub fn load_filter_settings(config_file: Option<PathBuf>) -> eyre::Result<FilterSettings> {
    let path = config_file.unwrap_or_else(|| get_config_dir().join(FILTER_CONFIG_FILE));
    if !path.exists() {
        return Ok(FilterSettings::default());
    }
    parse_filter_settings(path.as_path())
}

fn parse_filter_settings(path: &Path) -> eyre::Result<FilterSettings> {
    let contents = fs::read_to_string(path)?;
    let settings: FilterSettings = serde_json::from_str(&contents)?;
    Ok(settings)
}
