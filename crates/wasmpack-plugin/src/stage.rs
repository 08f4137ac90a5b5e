//! Loader staging and patching
//!
//! Runs once per invocation, at build start, iterating the declared
//! crates strictly in declaration order: verify the pkg directory
//! exists, copy it into `node_modules/<crate-name>`, then rewrite
//! the wasm-bindgen loader so its artifact lookup points at the
//! bundler's public asset path instead of a location relative to the
//! module itself. A failure on one crate aborts before the next is
//! touched.

use crate::config::WebConfig;
use crate::error::BridgeError;
use crate::registry::CrateDescriptor;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

/// wasm-bindgen's default artifact lookup: the `input` assignment,
/// a quoted relative path, and the `import.meta.url` anchor. Matched
/// as a token pattern rather than one monolithic line so whitespace
/// variations across wasm-bindgen versions still hit.
static URL_CONSTRUCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"input\s*=\s*new\s+URL\(\s*['"]([^'"]+)['"]\s*,\s*import\.meta\.url\s*\)\s*;?"#)
        .expect("artifact URL pattern is valid")
});

/// Stage every crate strictly in declaration order. The first
/// failure aborts before the next crate is touched, so diagnostics
/// stay attributable to one crate and no partially-staged state
/// accumulates behind an error.
pub async fn stage_all(
    root: &Path,
    crates: &[CrateDescriptor],
    web: &WebConfig,
) -> Result<(), BridgeError> {
    for krate in crates {
        stage_crate(root, krate, web).await?;
    }
    Ok(())
}

/// Stage one crate: verify, copy, patch, write back.
pub async fn stage_crate(
    root: &Path,
    krate: &CrateDescriptor,
    web: &WebConfig,
) -> Result<(), BridgeError> {
    let pkg_dir = krate.pkg_dir();
    if !pkg_dir.is_dir() {
        return Err(BridgeError::MissingPkgDir {
            pkg_dir,
            crate_path: krate.source_path.clone(),
        });
    }

    let dest = root.join("node_modules").join(&krate.crate_name);
    copy_dir(&pkg_dir, &dest).await?;
    debug!(crate_name = %krate.crate_name, dest = %dest.display(), "staged pkg directory");

    let loader = dest.join(krate.loader_file_name());
    let source = tokio::fs::read_to_string(&loader)
        .await
        .map_err(|source| BridgeError::LoaderRead {
            path: loader.clone(),
            source,
        })?;

    let patched = patch_loader(&source, web).ok_or(BridgeError::PatchPatternNotFound {
        loader: loader.clone(),
    })?;

    tokio::fs::write(&loader, patched)
        .await
        .map_err(|source| BridgeError::LoaderWrite {
            path: loader.clone(),
            source,
        })?;
    debug!(loader = %loader.display(), "patched artifact URL");

    Ok(())
}

/// Replace every artifact-URL construction with a fixed public-path
/// assignment. Returns `None` when the pattern never occurs; callers
/// treat that as an error rather than shipping an unpatched loader.
pub fn patch_loader(source: &str, web: &WebConfig) -> Option<String> {
    if !URL_CONSTRUCTION.is_match(source) {
        return None;
    }
    let patched = URL_CONSTRUCTION.replace_all(source, |caps: &regex::Captures| {
        let url = join_url_path(&[&web.base, &web.assets_dir, &caps[1]]);
        format!("input = \"{url}\";")
    });
    Some(patched.into_owned())
}

/// Join URL path segments with forward slashes regardless of host
/// OS; the result is a URL path, not a filesystem path. Empty
/// segments drop out and a leading slash on the first segment is
/// preserved.
pub fn join_url_path(segments: &[&str]) -> String {
    let mut out = String::new();
    for (index, segment) in segments.iter().enumerate() {
        if index == 0 && segment.starts_with('/') {
            out.push('/');
        }
        let trimmed = segment.trim_matches('/');
        if trimmed.is_empty() {
            continue;
        }
        if !out.is_empty() && !out.ends_with('/') {
            out.push('/');
        }
        out.push_str(trimmed);
    }
    out
}

/// Recursively copy `src` into `dst`, creating directories as needed.
async fn copy_dir(src: &Path, dst: &Path) -> Result<(), BridgeError> {
    let copy_failed = |source| BridgeError::CopyFailed {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source,
    };

    for entry in walkdir::WalkDir::new(src) {
        let entry = entry.map_err(|e| copy_failed(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .expect("walkdir yields paths under its root");
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            tokio::fs::create_dir_all(&target).await.map_err(copy_failed)?;
        } else {
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(copy_failed)?;
            }
            tokio::fs::copy(entry.path(), &target)
                .await
                .map_err(copy_failed)?;
        }
    }
    Ok(())
}
