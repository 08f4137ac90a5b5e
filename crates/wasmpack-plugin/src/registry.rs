//! Crate registry
//!
//! Derives, from each declared crate path, the deterministic
//! artifact filename and its on-disk location, and builds the
//! lookup table every other component queries. Built once at plugin
//! construction and read-only afterwards, so it is shared via `Arc`
//! without synchronization.

use crate::error::BridgeError;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Name of the directory wasm-pack emits inside a crate root
pub const PKG_DIR: &str = "pkg";

/// Derive the artifact filename for a crate directory name.
///
/// Only the first hyphen is replaced, matching wasm-pack's own
/// naming: `my-crate` becomes `my_crate_bg.wasm`, while
/// `my-extra-crate` becomes `my_extra-crate_bg.wasm`.
pub fn wasm_file_name(crate_name: &str) -> String {
    format!("{}_bg.wasm", crate_name.replacen('-', "_", 1))
}

/// Derive the generated loader script filename for a crate directory name
pub fn loader_file_name(crate_name: &str) -> String {
    format!("{}.js", crate_name.replacen('-', "_", 1))
}

/// One declared wasm-pack crate and everything derived from its path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrateDescriptor {
    /// Crate root as declared by the caller
    pub source_path: PathBuf,
    /// Last path segment of `source_path`
    pub crate_name: String,
    /// Derived artifact filename, e.g. `my_crate_bg.wasm`
    pub wasm_file_name: String,
    /// `source_path/pkg/<wasm_file_name>`
    pub wasm_path: PathBuf,
}

impl CrateDescriptor {
    pub fn new(source_path: impl Into<PathBuf>) -> Result<Self, BridgeError> {
        let source_path = source_path.into();
        let crate_name = source_path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| BridgeError::InvalidCratePath {
                path: source_path.clone(),
            })?;

        let wasm_file_name = wasm_file_name(&crate_name);
        let wasm_path = source_path.join(PKG_DIR).join(&wasm_file_name);

        Ok(Self {
            source_path,
            crate_name,
            wasm_file_name,
            wasm_path,
        })
    }

    /// The crate's pkg directory, `<source_path>/pkg`
    pub fn pkg_dir(&self) -> PathBuf {
        self.source_path.join(PKG_DIR)
    }

    /// Generated loader script filename, e.g. `my_crate.js`
    pub fn loader_file_name(&self) -> String {
        loader_file_name(&self.crate_name)
    }
}

/// Insertion-ordered map from artifact filename to artifact source path
#[derive(Debug, Default)]
pub struct CrateRegistry {
    entries: IndexMap<String, PathBuf>,
}

impl CrateRegistry {
    /// Build the registry from the full declaration-ordered crate list.
    ///
    /// Two crates deriving the same artifact filename is rejected
    /// here rather than silently overwriting the earlier entry; the
    /// dev middleware and the asset emitter could otherwise disagree
    /// about which crate a filename belongs to.
    pub fn from_descriptors(crates: &[CrateDescriptor]) -> Result<Self, BridgeError> {
        let mut entries = IndexMap::with_capacity(crates.len());
        for krate in crates {
            if let Some(first) = entries.insert(krate.wasm_file_name.clone(), krate.wasm_path.clone())
            {
                return Err(BridgeError::DuplicateArtifact {
                    wasm_file_name: krate.wasm_file_name.clone(),
                    first,
                    second: krate.wasm_path.clone(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Look up the source path for an exact artifact filename
    pub fn artifact_path(&self, wasm_file_name: &str) -> Option<&Path> {
        self.entries.get(wasm_file_name).map(PathBuf::as_path)
    }

    pub fn contains(&self, wasm_file_name: &str) -> bool {
        self.entries.contains_key(wasm_file_name)
    }

    /// Entries in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
