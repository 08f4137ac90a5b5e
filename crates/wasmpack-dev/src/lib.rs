//! Dev-server middleware for wasm-pack artifacts.
//!
//! The staged loader scripts request their `.wasm` artifact by
//! public URL, but during a dev session the artifact lives outside
//! the served root, inside each crate's `pkg/` directory. This
//! middleware intercepts any request whose path basename is a
//! registered artifact filename and streams the file's bytes
//! directly, bypassing the server's normal static-file handling;
//! everything else passes through untouched.
//!
//! Layer it **before** static-file serving, which does not know the
//! artifact's real filesystem location:
//!
//! ```rust,no_run
//! use axum::{middleware, Router};
//! use wasmpack_plugin::{WasmPackOptions, WasmPackPlugin};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let plugin = WasmPackPlugin::new(WasmPackOptions::new("./my-crate"))?;
//! let app: Router = Router::new()
//!     .layer(middleware::from_fn_with_state(
//!         plugin.registry(),
//!         wasmpack_dev::serve_artifacts,
//!     ));
//! # Ok(())
//! # }
//! ```

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use wasmpack_plugin::CrateRegistry;

/// MIME type for the binary artifact
pub const WASM_CONTENT_TYPE: &str = "application/wasm";

/// Artifacts may be rebuilt between requests and must never be
/// served stale
pub const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Serve registered wasm artifacts, passing every other request to
/// the next service in the chain.
///
/// A registered artifact that is missing on disk maps to 500; the
/// registry recorded it at construction time, so the file vanished
/// underneath the dev session.
pub async fn serve_artifacts(
    State(registry): State<Arc<CrateRegistry>>,
    req: Request,
    next: Next,
) -> Response {
    let basename = req
        .uri()
        .path()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();

    if !basename.ends_with(".wasm") {
        return next.run(req).await;
    }
    let Some(artifact) = registry.artifact_path(&basename).map(|p| p.to_path_buf()) else {
        return next.run(req).await;
    };

    match tokio::fs::read(&artifact).await {
        Ok(bytes) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, WASM_CONTENT_TYPE)
            .header(header::CONTENT_LENGTH, bytes.len())
            .header(header::CACHE_CONTROL, NO_CACHE)
            .body(Body::from(bytes))
            .unwrap(),
        Err(e) => {
            tracing::error!(
                artifact = %artifact.display(),
                error = %e,
                "failed to read registered wasm artifact"
            );
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from("failed to read wasm artifact"))
                .unwrap()
        }
    }
}
