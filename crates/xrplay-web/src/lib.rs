#![forbid(unsafe_code)]

//! Browser bindings for xrplay.
//!
//! This crate provides [`XrPlayer`], a `wasm-bindgen`-exported struct that
//! wires `xrplay_runtime::XrApp` to the WebXR Device API and to a scene
//! object supplied by the page.
//!
//! # Page contract
//!
//! | Element id   | Use                                          |
//! |--------------|----------------------------------------------|
//! | `VRButton`   | Entry button, hidden while in full screen    |
//! | `lookYaw`    | Text content is the viewer yaw in radians    |
//! | `main_canvas`| Created by the player for the WebGL2 context |

#[cfg(target_arch = "wasm32")]
mod js_scene;
#[cfg(target_arch = "wasm32")]
mod logging;
#[cfg(target_arch = "wasm32")]
mod wasm;
#[cfg(target_arch = "wasm32")]
mod web_host;

#[cfg(target_arch = "wasm32")]
pub use js_scene::{JsScene, WebScene};
#[cfg(target_arch = "wasm32")]
pub use wasm::{XrPlayer, init_logging};
#[cfg(target_arch = "wasm32")]
pub use web_host::WebXrHost;

// Page rules are used by the wasm module and by native tests.
#[cfg(any(target_arch = "wasm32", test))]
mod page;
