//! Filesystem-backed resource sources.
//!
//! Game resources live one directory per key, e.g.
//! `standard_charactersranks/101004/info.locale=eng.txt` next to `big.png`.
//! A [`DirectorySource`] maps each [`ResourceCategory`] it serves to such a
//! category directory plus the URL prefix under which its images are published.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use pilot_passport_core::{ResourceCategory, ResourceSource};
use tracing::debug;

pub const LOCALE_FILE_NAME: &str = "info.locale=eng.txt";

pub const STOCK_RANKS_DIR: &str = "standard_charactersranks";
pub const STOCK_AWARDS_DIR: &str = "achievements";
pub const STOCK_SQUADRONS_DIR: &str = "squadrons";
pub const MOD_RANKS_URL_PREFIX: &str = "/charactersranks";
const STOCK_URL_PREFIX: &str = "/static";

#[derive(Debug, Clone)]
struct CategoryRoot {
    category: ResourceCategory,
    dir: PathBuf,
    url_prefix: String,
}

#[derive(Debug, Clone)]
pub struct DirectorySource {
    label: String,
    roots: Vec<CategoryRoot>,
}

impl DirectorySource {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), roots: Vec::new() }
    }

    /// Serve `category` from `dir`; images resolve to `{url_prefix}/{key}/{file}`.
    #[must_use]
    pub fn with_category(
        mut self,
        category: ResourceCategory,
        dir: impl Into<PathBuf>,
        url_prefix: impl Into<String>,
    ) -> Self {
        self.roots.retain(|root| root.category != category);
        self.roots.push(CategoryRoot {
            category,
            dir: dir.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        });
        self
    }

    /// Stock resources shipped under the static root: ranks, awards and squadrons.
    #[must_use]
    pub fn stock(static_root: &Path) -> Self {
        [
            (ResourceCategory::Rank, STOCK_RANKS_DIR),
            (ResourceCategory::Award, STOCK_AWARDS_DIR),
            (ResourceCategory::Squadron, STOCK_SQUADRONS_DIR),
        ]
        .into_iter()
        .fold(Self::new("stock"), |source, (category, dir_name)| {
            source.with_category(
                category,
                static_root.join(dir_name),
                format!("{STOCK_URL_PREFIX}/{dir_name}"),
            )
        })
    }

    /// A mod's rank override directory, usually `{game}/data/swf/il2/charactersranks`.
    #[must_use]
    pub fn mod_ranks(ranks_dir: &Path) -> Self {
        Self::new("mod").with_category(ResourceCategory::Rank, ranks_dir, MOD_RANKS_URL_PREFIX)
    }

    fn root(&self, category: ResourceCategory) -> Option<&CategoryRoot> {
        self.roots.iter().find(|root| root.category == category)
    }

    fn key_dir(&self, category: ResourceCategory, key: &str) -> Option<(&CategoryRoot, PathBuf)> {
        if !is_plain_key(key) {
            return None;
        }
        let root = self.root(category)?;
        Some((root, root.dir.join(key)))
    }
}

impl ResourceSource for DirectorySource {
    fn label(&self) -> &str {
        &self.label
    }

    fn locale_text(&self, category: ResourceCategory, key: &str) -> Option<String> {
        let (_, dir) = self.key_dir(category, key)?;
        let path = dir.join(LOCALE_FILE_NAME);
        match fs::read(&path) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                debug!(
                    source = %self.label,
                    path = %path.display(),
                    error = %err,
                    "locale resource unreadable"
                );
                None
            }
        }
    }

    fn image(&self, category: ResourceCategory, key: &str, file_name: &str) -> Option<String> {
        if !is_plain_key(file_name) {
            return None;
        }
        let (root, dir) = self.key_dir(category, key)?;
        dir.join(file_name)
            .is_file()
            .then(|| format!("{}/{key}/{file_name}", root.url_prefix))
    }
}

/// Keys and file names come from database values; only single path segments
/// are looked up.
fn is_plain_key(key: &str) -> bool {
    !key.is_empty() && key != "." && key != ".." && !key.contains(['/', '\\'])
}
