//! Disha Viewer - browser preview of AR waypoint navigation
//!
//! Runs the AR session controller against a simulated platform: the orbit
//! camera stands in for the device and a ground plane stands in for the
//! detected surface. Paths come from `?path=<url>`, a local JSON file, or a
//! built-in demo.

mod app;
mod loader;
mod platform;
mod scene;
mod session;
mod ui;

use wasm_bindgen::prelude::*;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();

    let max_level = if cfg!(debug_assertions) {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(max_level)
            .build(),
    );

    app::run();
}
