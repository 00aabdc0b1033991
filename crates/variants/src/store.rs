//! On-disk home of the compiled / whitelist / blacklist collections together
//! with the pass types and keywords seen while collecting.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::variant::{PassType, VariantCollection, VariantSet};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read variant store at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write variant store at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse variant store at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize variant store: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Pass types and keywords encountered during collection, deduplicated and
/// kept in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SeenVariants {
    pub pass_types: Vec<PassType>,
    pub keywords: Vec<String>,
}

impl SeenVariants {
    pub fn record_pass_type(&mut self, pass_type: PassType) -> bool {
        if self.pass_types.contains(&pass_type) {
            return false;
        }
        self.pass_types.push(pass_type);
        true
    }

    pub fn record_keyword(&mut self, keyword: &str) -> bool {
        if keyword.is_empty() || self.keywords.iter().any(|known| known == keyword) {
            return false;
        }
        self.keywords.push(keyword.to_string());
        true
    }
}

/// The three persisted collections the build hook and the analyzer share.
#[derive(Debug, Clone, Default)]
pub struct VariantLists<C = VariantSet> {
    pub compiled: C,
    pub whitelist: C,
    pub blacklist: C,
}

impl<C: VariantCollection> VariantLists<C> {
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.compiled.len(),
            self.whitelist.len(),
            self.blacklist.len(),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct VariantStore {
    pub compiled: VariantSet,
    pub whitelist: VariantSet,
    pub blacklist: VariantSet,
    pub seen: SeenVariants,
}

impl VariantStore {
    pub fn load_or_default(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "variant store missing; starting empty");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let store: Self = toml::from_str(&contents).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            path = %path.display(),
            compiled = store.compiled.len(),
            whitelist = store.whitelist.len(),
            blacklist = store.blacklist.len(),
            "loaded variant store"
        );
        Ok(store)
    }

    pub fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let serialized = toml::to_string_pretty(self)?;
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| StoreError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, serialized).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Splits the store into its collections and the seen lists so both can
    /// be borrowed mutably at once.
    pub fn parts_mut(&mut self) -> (VariantLists<&mut VariantSet>, &mut SeenVariants) {
        (
            VariantLists {
                compiled: &mut self.compiled,
                whitelist: &mut self.whitelist,
                blacklist: &mut self.blacklist,
            },
            &mut self.seen,
        )
    }
}
