// Debug settings
// Loaded from ~/.config/template-debug/settings.json when present

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::inspect::PROXY_CLASS_NAMES;

/// Environment variable that overrides `template_debug`.
pub const TEMPLATE_DEBUG_ENV: &str = "TEMPLATE_DEBUG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    /// Gates every debug tag; off produces no output at all
    pub template_debug: bool,

    /// Prefix stripped from file paths reported by `find`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_path: Option<PathBuf>,

    /// Class names shown as a label instead of their value
    pub proxy_labels: Vec<String>,

    /// Address `remote_trace` attaches to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_debugger: Option<SocketAddr>,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            template_debug: false,
            root_path: None,
            proxy_labels: PROXY_CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
            remote_debugger: None,
        }
    }
}

impl DebugSettings {
    /// Settings with the debug gate switched on.
    pub fn enabled() -> Self {
        Self {
            template_debug: true,
            ..Self::default()
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("template-debug").join("settings.json"))
    }

    /// Loads settings from `path`, or from the default location when `path`
    /// is `None`, then applies the `TEMPLATE_DEBUG` override.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);

        let mut settings = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };

        if let Ok(raw) = env::var(TEMPLATE_DEBUG_ENV) {
            match parse_flag(&raw) {
                Some(flag) => settings.template_debug = flag,
                None => tracing::warn!("Ignoring unrecognized {}={:?}", TEMPLATE_DEBUG_ENV, raw),
            }
        }

        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid settings in {}", path.display()))
    }

    pub fn root_path(&self) -> Option<&Path> {
        self.root_path.as_deref()
    }
}

/// Parses a boolean switch the way shells usually spell one.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
