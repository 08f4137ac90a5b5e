//! End-to-end middleware tests: a router with the artifact
//! middleware layered in front of a marker fallback, driven through
//! `tower::ServiceExt::oneshot`.

use axum::{body::Body, http::Request, middleware, routing::get, Router};
use http_body_util::BodyExt;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use wasmpack_dev::serve_artifacts;
use wasmpack_plugin::{CrateDescriptor, CrateRegistry};

const WASM_BYTES: &[u8] = b"\0asm\x01\0\0\0dev-serving-fixture";

fn registry_with_crate(root: &std::path::Path, name: &str) -> Arc<CrateRegistry> {
    let crate_dir = root.join(name);
    let pkg = crate_dir.join("pkg");
    fs::create_dir_all(&pkg).unwrap();
    let wasm_file = format!("{}_bg.wasm", name.replacen('-', "_", 1));
    fs::write(pkg.join(&wasm_file), WASM_BYTES).unwrap();

    let crates = vec![CrateDescriptor::new(&crate_dir).unwrap()];
    Arc::new(CrateRegistry::from_descriptors(&crates).unwrap())
}

fn app(registry: Arc<CrateRegistry>) -> Router {
    Router::new()
        .route("/", get(|| async { "index" }))
        .fallback(|| async { "fallthrough" })
        .layer(middleware::from_fn_with_state(registry, serve_artifacts))
}

#[tokio::test]
async fn test_serves_registered_artifact_from_any_prefix() {
    let temp = TempDir::new().unwrap();
    let app = app(registry_with_crate(temp.path(), "my-crate"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/whatever/prefix/my_crate_bg.wasm")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/wasm"
    );
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "no-cache, no-store, must-revalidate"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), WASM_BYTES);
}

#[tokio::test]
async fn test_unknown_artifact_passes_through() {
    let temp = TempDir::new().unwrap();
    let app = app(registry_with_crate(temp.path(), "my-crate"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/other_bg.wasm")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Next service handled it, untouched by the middleware
    let wasm_typed = response
        .headers()
        .get("content-type")
        .is_some_and(|v| v.to_str().unwrap() == "application/wasm");
    assert!(!wasm_typed);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), b"fallthrough");
}

#[tokio::test]
async fn test_non_wasm_requests_pass_through() {
    let temp = TempDir::new().unwrap();
    let app = app(registry_with_crate(temp.path(), "my-crate"));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), b"index");
}

#[tokio::test]
async fn test_registered_but_deleted_artifact_is_500() {
    let temp = TempDir::new().unwrap();
    let registry = registry_with_crate(temp.path(), "my-crate");
    fs::remove_file(temp.path().join("my-crate/pkg/my_crate_bg.wasm")).unwrap();

    let response = app(registry)
        .oneshot(
            Request::builder()
                .uri("/my_crate_bg.wasm")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
}
