// Tauri plugin binding
// This file contains Tauri-specific wrappers and is excluded from coverage.
// The actual logic is in crate::bridge which is fully tested.
#![cfg_attr(coverage_nightly, coverage(off))]

/// Helper macro to emit events with error logging
macro_rules! emit_or_warn {
    ($handle:expr, $event:expr, $payload:expr) => {
        if let Err(e) = $handle.emit($event, $payload) {
            crate::warn!("Failed to emit event '{}': {}", $event, e);
        }
    };
}

mod emitter;

pub use emitter::TauriSessionEmitter;

use crate::bridge::{Bridge, BridgeBuilder, BridgeError, BridgeResponse};
use crate::config::BridgeConfig;
use serde_json::Value;
use std::sync::Arc;
use tauri::plugin::{Builder, TauriPlugin};
use tauri::{Manager, Runtime, State};

/// Name the plugin is registered under (`plugin:ai|<command>`)
pub const PLUGIN_NAME: &str = "ai";

/// Type alias for the managed bridge state
pub type BridgeState = Arc<Bridge>;

#[tauri::command]
async fn ask(bridge: State<'_, BridgeState>, question: String) -> Result<String, BridgeError> {
    bridge.ask(&question).await
}

#[tauri::command]
async fn transcript(bridge: State<'_, BridgeState>) -> Result<String, BridgeError> {
    bridge.transcript().await
}

#[tauri::command]
async fn speak(bridge: State<'_, BridgeState>, text: String) -> Result<String, BridgeError> {
    bridge.speak(&text).await
}

/// Generic entry point mirroring the scripted caller's `execute(action, args)`
#[tauri::command]
async fn execute(
    bridge: State<'_, BridgeState>,
    action: String,
    args: Option<Value>,
) -> Result<BridgeResponse, BridgeError> {
    bridge.execute(&action, &args.unwrap_or(Value::Null)).await
}

/// Build the `ai` plugin around a configured bridge builder
///
/// A `plugins.ai` block in the Tauri config replaces the builder's config.
/// Lifecycle events are emitted to the webview; the bridge is torn down when
/// the plugin is dropped.
pub fn init<R: Runtime>(builder: BridgeBuilder) -> TauriPlugin<R, Option<BridgeConfig>> {
    Builder::<R, Option<BridgeConfig>>::new(PLUGIN_NAME)
        .invoke_handler(tauri::generate_handler![ask, transcript, speak, execute])
        .setup(move |app, api| {
            let mut builder =
                builder.with_emitter(Arc::new(TauriSessionEmitter::new(app.clone())));
            if let Some(config) = api.config().clone() {
                crate::debug!("Applying plugin config: {:?}", config);
                builder = builder.with_config(config);
            }

            // Controller task runs on Tauri's Tokio runtime
            let runtime = tauri::async_runtime::handle();
            let bridge = builder.build_on(runtime.inner())?;
            app.manage::<BridgeState>(Arc::new(bridge));
            crate::info!("AI bridge plugin initialized");
            Ok(())
        })
        .on_drop(|app| {
            if let Some(bridge) = app.try_state::<BridgeState>() {
                let bridge = bridge.inner().clone();
                tauri::async_runtime::spawn(async move {
                    bridge.on_destroy().await;
                });
            }
        })
        .build()
}
