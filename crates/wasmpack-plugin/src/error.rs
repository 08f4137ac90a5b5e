//! Error types for the wasm-pack bridge plugin

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while registering crates, staging their pkg
/// output, or patching the generated loader script.
#[derive(Error, Debug, Diagnostic)]
pub enum BridgeError {
    /// A declared crate path has no basename to derive names from
    #[error("invalid crate path: {}", .path.display())]
    #[diagnostic(
        code(wasmpack::invalid_crate_path),
        help("crate paths must end in the crate directory name, e.g. ./crates/my-crate")
    )]
    InvalidCratePath { path: PathBuf },

    /// Two declared crates derive the same artifact filename
    #[error(
        "crates {} and {} both produce the artifact {wasm_file_name}",
        .first.display(),
        .second.display()
    )]
    #[diagnostic(
        code(wasmpack::duplicate_artifact),
        help("rename one of the crates; artifact filenames must be unique across the registry")
    )]
    DuplicateArtifact {
        wasm_file_name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// The crate's pre-built pkg directory is missing
    #[error(
        "can't find {}, run `wasm-pack build {} --target web` first",
        .pkg_dir.display(),
        .crate_path.display()
    )]
    #[diagnostic(
        code(wasmpack::pkg_not_found),
        help("wasm-pack must generate the pkg/ directory before the bundler runs")
    )]
    MissingPkgDir {
        pkg_dir: PathBuf,
        crate_path: PathBuf,
    },

    /// Copying the pkg directory into node_modules failed
    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    #[diagnostic(code(wasmpack::copy_failed))]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the staged loader script failed
    #[error("failed to read loader script {}: {source}", .path.display())]
    #[diagnostic(code(wasmpack::loader_read))]
    LoaderRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the patched loader script back failed
    #[error("failed to write loader script {}: {source}", .path.display())]
    #[diagnostic(code(wasmpack::loader_write))]
    LoaderWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The loader script contains no artifact-URL construction to patch
    #[error("no artifact URL construction found in {}", .loader.display())]
    #[diagnostic(
        code(wasmpack::patch_pattern_not_found),
        help(
            "expected `input = new URL('<name>_bg.wasm', import.meta.url);` in the \
             wasm-bindgen loader; the loader may have been generated by an \
             incompatible wasm-bindgen version or already patched"
        )
    )]
    PatchPatternNotFound { loader: PathBuf },

    /// Staging was attempted before the web config snapshot was captured
    #[error("web config not resolved; call resolve_config() before the build starts")]
    #[diagnostic(
        code(wasmpack::config_pending),
        help("the host must supply its base URL and assets directory once its configuration is final")
    )]
    ConfigPending,

    /// resolve_config() was called twice in one invocation
    #[error("web config already resolved for this invocation")]
    #[diagnostic(code(wasmpack::config_already_resolved))]
    ConfigAlreadyResolved,
}
