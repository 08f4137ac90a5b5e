//! Plugin configuration types
//!
//! Mirrors the JavaScript plugin surface: the caller hands over one
//! crate path or a list of them, plus the invocation mode. The web
//! config snapshot lives here too since it is pure configuration
//! data; its two-phase capture is owned by the plugin itself.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How the current bundler invocation runs.
///
/// Dev sessions serve artifacts through the middleware in
/// `wasmpack-dev` and skip asset emission; production builds emit
/// assets and install no middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Dev,
    Build,
}

/// Configuration for the wasm-pack bridge plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasmPackOptions {
    /// Paths to wasm-pack crate roots, in declaration order
    pub crates: Vec<PathBuf>,

    /// Invocation mode, selected once per run
    pub mode: Mode,

    /// Project root containing `node_modules`
    ///
    /// Staged pkg directories land under `<root>/node_modules`.
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

impl WasmPackOptions {
    /// Create options for a production build from one crate path or a list
    pub fn new(crates: impl Into<CrateList>) -> Self {
        Self {
            crates: crates.into().0,
            mode: Mode::Build,
            root: default_root(),
        }
    }

    /// Select the invocation mode
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the project root containing `node_modules`
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }
}

/// One crate path or a list of crate paths.
///
/// Exists so `WasmPackOptions::new` accepts either shape, the way
/// the original plugin accepted `string | string[]`.
#[derive(Debug, Clone)]
pub struct CrateList(pub Vec<PathBuf>);

impl From<&str> for CrateList {
    fn from(path: &str) -> Self {
        Self(vec![PathBuf::from(path)])
    }
}

impl From<String> for CrateList {
    fn from(path: String) -> Self {
        Self(vec![PathBuf::from(path)])
    }
}

impl From<PathBuf> for CrateList {
    fn from(path: PathBuf) -> Self {
        Self(vec![path])
    }
}

impl From<Vec<PathBuf>> for CrateList {
    fn from(paths: Vec<PathBuf>) -> Self {
        Self(paths)
    }
}

impl From<Vec<String>> for CrateList {
    fn from(paths: Vec<String>) -> Self {
        Self(paths.into_iter().map(PathBuf::from).collect())
    }
}

impl From<Vec<&str>> for CrateList {
    fn from(paths: Vec<&str>) -> Self {
        Self(paths.into_iter().map(PathBuf::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for CrateList {
    fn from(paths: [&str; N]) -> Self {
        Self(paths.iter().map(PathBuf::from).collect())
    }
}

/// Snapshot of the host bundler's finalized web configuration.
///
/// Captured once per invocation, after the host resolves its
/// configuration; the loader rewriter needs both values to compute
/// the patched artifact URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebConfig {
    /// Public base URL path, e.g. `/` or `/app/`
    pub base: String,

    /// Assets subdirectory name inside the output, e.g. `assets`
    pub assets_dir: String,
}

impl WebConfig {
    pub fn new(base: impl Into<String>, assets_dir: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            assets_dir: assets_dir.into(),
        }
    }
}
