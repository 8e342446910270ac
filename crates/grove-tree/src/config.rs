//! Session configuration.

use std::fmt;
use std::str::FromStr;

use grove_path::NameMap;
use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::warning::WarningPolicy;

/// How a file session is opened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileMode {
    /// `r`: the file must exist; no mutation.
    #[default]
    ReadOnly,
    /// `r+`: the file must exist.
    ReadWrite,
    /// `a`: the file is created if missing.
    Append,
    /// `w`: the file always starts empty.
    TruncateCreate,
}

impl FileMode {
    /// Returns `true` for every mode except [`FileMode::ReadOnly`].
    pub fn is_writable(&self) -> bool {
        !matches!(self, Self::ReadOnly)
    }

    /// The conventional mode string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "r",
            Self::ReadWrite => "r+",
            Self::Append => "a",
            Self::TruncateCreate => "w",
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileMode {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" => Ok(Self::ReadOnly),
            "r+" => Ok(Self::ReadWrite),
            "a" => Ok(Self::Append),
            "w" => Ok(Self::TruncateCreate),
            other => Err(TreeError::InvalidMode(other.to_string())),
        }
    }
}

/// Options for opening a file session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Open mode.
    pub mode: FileMode,
    /// Title written to the root of a newly created file.
    pub title: Option<String>,
    /// Group of the store that acts as the session root (default `/`).
    pub root_path: Option<String>,
    /// Front-end <-> store name translation.
    pub name_map: NameMap,
    /// Whether advisory warnings block.
    pub warning_policy: WarningPolicy,
    /// Start with the undo log enabled (ignored in read-only mode).
    pub enable_undo: bool,
}

impl SessionConfig {
    /// Default configuration with the given mode.
    pub fn with_mode(mode: FileMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: FileMode::ReadOnly,
            title: None,
            root_path: None,
            name_map: NameMap::new(),
            warning_policy: WarningPolicy::Log,
            enable_undo: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_strings_round_trip() {
        for mode in [
            FileMode::ReadOnly,
            FileMode::ReadWrite,
            FileMode::Append,
            FileMode::TruncateCreate,
        ] {
            assert_eq!(mode.as_str().parse::<FileMode>().unwrap(), mode);
        }
        assert!(matches!(
            "rw".parse::<FileMode>(),
            Err(TreeError::InvalidMode(m)) if m == "rw"
        ));
    }

    #[test]
    fn only_read_only_is_not_writable() {
        assert!(!FileMode::ReadOnly.is_writable());
        assert!(FileMode::Append.is_writable());
    }

    #[test]
    fn config_from_json() {
        let json = r#"{
            "mode": "Append",
            "title": "Title example",
            "root_path": "/agroup",
            "name_map": {"pythonarray": "array"},
            "warning_policy": "error",
            "enable_undo": true
        }"#;
        let config: SessionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.mode, FileMode::Append);
        assert_eq!(config.name_map.to_store("pythonarray"), "array");
        assert_eq!(config.warning_policy, WarningPolicy::Error);
        assert!(config.enable_undo);
    }
}
