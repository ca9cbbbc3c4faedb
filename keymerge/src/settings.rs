use key::PathRewrite;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const SETTINGS_ENV: &str = "KEYMERGE_SETTINGS";
const DEFAULT_SETTINGS_PATH: &str = "./keymerge_settings.json";

/// Defaults for the merge tool. Command line flags take precedence.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Rewrite applied to archive filenames of mods, `null` disables it.
    pub rewrite: Option<PathRewrite>,

    /// Whether to reject key files with duplicate resources.
    pub strict: bool,

    /// Whether to copy the base key file to `<base>.bak` before it is overwritten.
    pub backup: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            rewrite: Some(PathRewrite::default()),
            strict: false,
            backup: true,
        }
    }
}

#[derive(Debug)]
pub enum SettingsError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, serde_json::Error),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(path, e) => write!(f, "cannot read settings {:?}: {}", path, e),
            SettingsError::Parse(path, e) => write!(f, "invalid settings {:?}: {}", path, e),
        }
    }
}

/// Loads settings from the file named by `KEYMERGE_SETTINGS` (or
/// `./keymerge_settings.json`). A missing file yields the defaults.
pub fn load_settings() -> Result<Settings, SettingsError> {
    let path: PathBuf = std::env::var(SETTINGS_ENV)
        .unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.into())
        .into();

    load_settings_from(&path)
}

pub fn load_settings_from(path: &Path) -> Result<Settings, SettingsError> {
    if !path.exists() {
        debug!("no settings file at {:?}, using defaults", path);
        return Ok(Settings::default());
    }

    let text =
        std::fs::read_to_string(path).map_err(|e| SettingsError::Io(path.to_path_buf(), e))?;
    serde_json::from_str(&text).map_err(|e| SettingsError::Parse(path.to_path_buf(), e))
}
