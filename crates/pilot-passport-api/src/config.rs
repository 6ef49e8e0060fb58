//! Where the career database and resource directories live.
//!
//! [`PassportConfig`] is the loose, partially-filled form read from a JSON file
//! and command-line flags. [`PassportConfig::resolve`] derives the concrete
//! [`PassportPaths`] handed to the api; nothing here touches global state.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_STATIC_ROOT: &str = "static";

/// Career database location relative to the game installation root.
pub const CAREER_DB_RELATIVE: [&str; 3] = ["data", "Career", "cp.db"];

/// Mod rank override directory relative to the game installation root.
pub const MOD_RANKS_RELATIVE: [&str; 4] = ["data", "swf", "il2", "charactersranks"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PassportConfig {
    pub game_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub static_root: Option<PathBuf>,
    pub mod_ranks_dir: Option<PathBuf>,
}

impl PassportConfig {
    /// Read a JSON config file.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or is not a valid config object.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Fields set in `overrides` replace the corresponding fields of `self`.
    #[must_use]
    pub fn merge(self, overrides: Self) -> Self {
        Self {
            game_path: overrides.game_path.or(self.game_path),
            db_path: overrides.db_path.or(self.db_path),
            static_root: overrides.static_root.or(self.static_root),
            mod_ranks_dir: overrides.mod_ranks_dir.or(self.mod_ranks_dir),
        }
    }

    /// Explicit paths win over those derived from the game installation root.
    #[must_use]
    pub fn resolve(&self) -> PassportPaths {
        let under_game = |relative: &[&str]| {
            self.game_path
                .as_ref()
                .map(|root| relative.iter().fold(root.clone(), |path, segment| path.join(segment)))
        };
        PassportPaths {
            db_path: self.db_path.clone().or_else(|| under_game(&CAREER_DB_RELATIVE)),
            static_root: self
                .static_root
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_ROOT)),
            mod_ranks_dir: self.mod_ranks_dir.clone().or_else(|| under_game(&MOD_RANKS_RELATIVE)),
        }
    }
}

/// Resolved locations. A missing database is not an error here; it surfaces
/// per request as [`crate::PassportError::SourceUnavailable`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PassportPaths {
    pub db_path: Option<PathBuf>,
    pub static_root: PathBuf,
    pub mod_ranks_dir: Option<PathBuf>,
}

impl PassportPaths {
    #[must_use]
    pub fn new(db_path: impl Into<PathBuf>, static_root: impl Into<PathBuf>) -> Self {
        Self { db_path: Some(db_path.into()), static_root: static_root.into(), mod_ranks_dir: None }
    }

    #[must_use]
    pub fn with_mod_ranks_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mod_ranks_dir = Some(dir.into());
        self
    }
}
