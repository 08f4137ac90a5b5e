//! Rolldown plugin for wasm-pack crates
//!
//! Bridges pre-built wasm-pack output (a `pkg/` directory holding a
//! wasm-bindgen loader script plus the `.wasm` artifact) into the
//! bundler's module graph and asset pipeline:
//!
//! - `resolve_id` turns a bare import of a declared crate's
//!   directory name into a virtual module id
//! - `load` serves that virtual module from the staged loader script
//! - `build_start` copies each crate's `pkg/` into
//!   `node_modules/<crate-name>` and patches the loader's artifact
//!   lookup to the final public asset URL
//! - `generate_bundle` emits each artifact as `assets/<name>_bg.wasm`
//!   in production builds
//!
//! The plugin never invokes wasm-pack itself; run
//! `wasm-pack build <crate> --target web` before bundling.
//!
//! Bare crate-name specifiers fail the bundler's default resolution
//! outright, so register this plugin ahead of any resolution plugins.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wasmpack_plugin::{Mode, WasmPackOptions, WasmPackPlugin};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let plugin = WasmPackPlugin::new(WasmPackOptions::new("./my-crate").with_mode(Mode::Build))?;
//! // Once the host's configuration is final:
//! plugin.resolve_config("/", "assets")?;
//! // Hand Arc::new(plugin) to the bundler's plugin list.
//! # Ok(())
//! # }
//! ```

use anyhow::Context;
use once_cell::sync::OnceCell;
use owo_colors::OwoColorize;
use rolldown_common::{ModuleType, Output, OutputAsset};
use rolldown_plugin::{
    HookBuildStartArgs, HookGenerateBundleArgs, HookLoadArgs, HookLoadOutput, HookLoadReturn,
    HookNoopReturn, HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn, HookUsage,
    Plugin, PluginContext,
};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod config;
mod error;
pub mod registry;
pub mod stage;

pub use config::{CrateList, Mode, WasmPackOptions, WebConfig};
pub use error::BridgeError;
pub use registry::{CrateDescriptor, CrateRegistry};

/// Marker prefix for virtual module ids synthesized by `resolve_id`
pub const VIRTUAL_PREFIX: &str = "\0wasmpack:";

/// Rolldown plugin bridging wasm-pack crates into the bundle
#[derive(Debug, Clone)]
pub struct WasmPackPlugin {
    options: WasmPackOptions,
    crates: Arc<Vec<CrateDescriptor>>,
    registry: Arc<CrateRegistry>,
    web: Arc<OnceCell<WebConfig>>,
}

impl WasmPackPlugin {
    /// Build the plugin and its crate registry.
    ///
    /// # Errors
    ///
    /// - a declared path has no usable basename
    /// - two declared crates derive the same artifact filename
    pub fn new(options: WasmPackOptions) -> Result<Self, BridgeError> {
        let crates = options
            .crates
            .iter()
            .map(CrateDescriptor::new)
            .collect::<Result<Vec<_>, _>>()?;
        let registry = CrateRegistry::from_descriptors(&crates)?;

        Ok(Self {
            options,
            crates: Arc::new(crates),
            registry: Arc::new(registry),
            web: Arc::new(OnceCell::new()),
        })
    }

    /// Capture the host's finalized web configuration.
    ///
    /// Must be called exactly once per invocation, before the build
    /// starts; staging cannot compute patched artifact URLs without
    /// it.
    pub fn resolve_config(
        &self,
        base: impl Into<String>,
        assets_dir: impl Into<String>,
    ) -> Result<(), BridgeError> {
        self.web
            .set(WebConfig::new(base, assets_dir))
            .map_err(|_| BridgeError::ConfigAlreadyResolved)
    }

    /// The captured web configuration, or `ConfigPending` before
    /// [`resolve_config`](Self::resolve_config) has run
    pub fn web_config(&self) -> Result<&WebConfig, BridgeError> {
        self.web.get().ok_or(BridgeError::ConfigPending)
    }

    /// Shared artifact registry, for wiring the dev middleware
    pub fn registry(&self) -> Arc<CrateRegistry> {
        self.registry.clone()
    }

    /// Declared crates in declaration order
    pub fn crates(&self) -> &[CrateDescriptor] {
        &self.crates
    }

    pub fn mode(&self) -> Mode {
        self.options.mode
    }

    /// Outputs to append at the end of a bundle: one asset per
    /// declared crate in build mode, nothing in dev mode, where the
    /// middleware serves artifacts instead.
    pub fn bundle_outputs(&self) -> anyhow::Result<Vec<Output>> {
        match self.options.mode {
            Mode::Dev => Ok(Vec::new()),
            Mode::Build => collect_artifact_assets(&self.crates),
        }
    }

    /// Virtual module id for a specifier that exactly matches a
    /// declared crate's directory name
    pub fn resolve_specifier(&self, specifier: &str) -> Option<String> {
        self.crates
            .iter()
            .find(|krate| krate.crate_name == specifier)
            .map(|krate| format!("{VIRTUAL_PREFIX}{}", krate.crate_name))
    }

    fn staged_loader_path(root: &Path, crate_name: &str) -> PathBuf {
        root.join("node_modules")
            .join(crate_name)
            .join(registry::loader_file_name(crate_name))
    }
}

impl Plugin for WasmPackPlugin {
    fn name(&self) -> Cow<'static, str> {
        "wasmpack-bridge".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId | HookUsage::Load | HookUsage::BuildStart | HookUsage::GenerateBundle
    }

    /// Redirect bare crate-name imports to virtual module ids; every
    /// other specifier passes through to default resolution.
    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let resolved = self.resolve_specifier(args.specifier);

        async move {
            Ok(resolved.map(|id| HookResolveIdOutput {
                id: id.into(),
                ..Default::default()
            }))
        }
    }

    /// Serve a virtual crate module from its staged loader script.
    ///
    /// Reading can only fail if staging has not run for that crate
    /// yet, which is an ordering bug in the host's pipeline; the
    /// error propagates with that context attached.
    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let root = self.options.root.clone();

        async move {
            let Some(crate_name) = id.strip_prefix(VIRTUAL_PREFIX) else {
                return Ok(None);
            };

            let loader = Self::staged_loader_path(&root, crate_name);
            let code = tokio::fs::read_to_string(&loader).await.with_context(|| {
                format!(
                    "failed to read staged loader {} for virtual module {crate_name}; \
                     was the build-start staging phase skipped?",
                    loader.display()
                )
            })?;

            Ok(Some(HookLoadOutput {
                code: code.into(),
                module_type: Some(ModuleType::Js),
                ..Default::default()
            }))
        }
    }

    /// Stage every declared crate in declaration order, aborting on
    /// the first failure so later crates stay untouched.
    fn build_start(
        &self,
        _ctx: &PluginContext,
        _args: &HookBuildStartArgs,
    ) -> impl std::future::Future<Output = HookNoopReturn> + Send {
        let crates = self.crates.clone();
        let root = self.options.root.clone();
        let web = self.web.clone();

        async move {
            let web = web.get().cloned().ok_or(BridgeError::ConfigPending)?;

            if let Err(err) = stage::stage_all(&root, &crates, &web).await {
                report_fatal(&err);
                return Err(err.into());
            }

            tracing::debug!(count = crates.len(), "all crates staged and patched");
            Ok(())
        }
    }

    /// Emit each artifact under `assets/<wasm file name>`, the exact
    /// URL the patched loaders request at runtime. Dev sessions skip
    /// this; the middleware serves artifacts instead.
    fn generate_bundle(
        &self,
        _ctx: &PluginContext,
        args: &mut HookGenerateBundleArgs<'_>,
    ) -> impl std::future::Future<Output = HookNoopReturn> + Send {
        let plugin = self.clone();

        async move {
            args.bundle.extend(plugin.bundle_outputs()?);
            Ok(())
        }
    }
}

/// Read every artifact and wrap it as an `assets/<wasm file name>`
/// output asset, in declaration order.
pub fn collect_artifact_assets(crates: &[CrateDescriptor]) -> anyhow::Result<Vec<Output>> {
    let mut assets = Vec::with_capacity(crates.len());
    for krate in crates {
        let bytes = std::fs::read(&krate.wasm_path).with_context(|| {
            format!("failed to read wasm artifact {}", krate.wasm_path.display())
        })?;

        assets.push(Output::Asset(Arc::new(OutputAsset {
            names: vec![],
            original_file_names: vec![krate.wasm_path.to_string_lossy().into_owned()],
            filename: format!("assets/{}", krate.wasm_file_name).into(),
            source: bytes.into(),
        })));
    }
    Ok(assets)
}

/// Print a fatal staging error to stderr before it aborts the build.
fn report_fatal(err: &BridgeError) {
    eprintln!("{} {}", "✗".red().bold(), err.to_string().red());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin(paths: impl Into<CrateList>) -> WasmPackPlugin {
        WasmPackPlugin::new(WasmPackOptions::new(paths)).unwrap()
    }

    #[test]
    fn test_plugin_creation() {
        let plugin = plugin("./my-crate");
        assert_eq!(plugin.name(), "wasmpack-bridge");
        assert_eq!(plugin.registry().len(), 1);
    }

    #[test]
    fn test_duplicate_crates_rejected_at_construction() {
        let result = WasmPackPlugin::new(WasmPackOptions::new(vec![
            "./first/my-crate",
            "./second/my-crate",
        ]));
        assert!(matches!(
            result,
            Err(BridgeError::DuplicateArtifact { .. })
        ));
    }

    #[test]
    fn test_resolve_specifier_exact_match_only() {
        let plugin = plugin(["../deep/wasm-game", "./other"]);

        assert_eq!(
            plugin.resolve_specifier("wasm-game").as_deref(),
            Some("\0wasmpack:wasm-game")
        );
        assert_eq!(plugin.resolve_specifier("other").as_deref(), Some("\0wasmpack:other"));

        assert!(plugin.resolve_specifier("wasm-gam").is_none());
        assert!(plugin.resolve_specifier("wasm-game2").is_none());
        assert!(plugin.resolve_specifier("./wasm-game").is_none());
        assert!(plugin.resolve_specifier("wasm_game").is_none());
    }

    #[test]
    fn test_web_config_two_phase() {
        let plugin = plugin("./my-crate");
        assert!(matches!(
            plugin.web_config(),
            Err(BridgeError::ConfigPending)
        ));

        plugin.resolve_config("/app/", "static").unwrap();
        assert_eq!(plugin.web_config().unwrap().base, "/app/");

        assert!(matches!(
            plugin.resolve_config("/", "assets"),
            Err(BridgeError::ConfigAlreadyResolved)
        ));
    }

    #[tokio::test]
    async fn test_load_passes_through_foreign_ids() {
        let plugin = plugin("./my-crate");
        let ctx = PluginContext::new_napi_context();
        let args = HookLoadArgs { id: "./src/index.js" };

        let result = plugin.load(&ctx, &args).await.unwrap();
        assert!(result.is_none());
    }
}
