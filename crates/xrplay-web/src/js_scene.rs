#![forbid(unsafe_code)]

//! The page's scene graph, reached through a duck-typed JS object.
//!
//! The page hands the player any object with the methods below; nodes are
//! opaque JS values compared by identity.

use glam::Mat4;
use js_sys::Float32Array;
use wasm_bindgen::prelude::*;
use web_sys::{WebGl2RenderingContext, XrFrame, XrInputSource, XrReferenceSpace, XrSession, XrViewerPose};
use xrplay_runtime::{Scene, SceneNodes};

use crate::web_host::WebXrHost;

#[wasm_bindgen]
extern "C" {
    /// Scene object supplied by the page.
    pub type JsScene;

    #[wasm_bindgen(method, js_name = createButtonNode)]
    fn create_button_node(this: &JsScene, icon: &str) -> JsValue;

    #[wasm_bindgen(method, js_name = addNode)]
    fn add_node(this: &JsScene, node: &JsValue);

    #[wasm_bindgen(method, js_name = removeNode)]
    fn remove_node(this: &JsScene, node: &JsValue);

    /// `matrix` is column-major, as WebGL expects.
    #[wasm_bindgen(method, js_name = setNodeMatrix)]
    fn set_node_matrix(this: &JsScene, node: &JsValue, matrix: &Float32Array);

    #[wasm_bindgen(method, js_name = setNodeIcon)]
    fn set_node_icon(this: &JsScene, node: &JsValue, icon: &str);

    #[wasm_bindgen(method, js_name = setRenderer)]
    fn set_renderer(this: &JsScene, gl: &WebGl2RenderingContext);

    #[wasm_bindgen(method, js_name = useProfileControllerMeshes)]
    fn use_profile_controller_meshes(this: &JsScene, session: &XrSession);

    #[wasm_bindgen(method, js_name = startFrame)]
    fn start_frame(this: &JsScene);

    #[wasm_bindgen(method, js_name = endFrame)]
    fn end_frame(this: &JsScene);

    #[wasm_bindgen(method, js_name = updateInputSources)]
    fn update_input_sources(this: &JsScene, frame: &XrFrame, space: &XrReferenceSpace);

    /// Returns the hit node, or `null`.
    #[wasm_bindgen(method, js_name = handleSelect)]
    fn handle_select(
        this: &JsScene,
        source: &XrInputSource,
        frame: &XrFrame,
        space: &XrReferenceSpace,
    ) -> JsValue;

    /// `pose` is `null` when tracking is lost.
    #[wasm_bindgen(method, js_name = drawXRFrame)]
    fn draw_xr_frame(this: &JsScene, frame: &XrFrame, pose: &JsValue);
}

/// Adapts a [`JsScene`] to the runtime's scene traits.
pub struct WebScene {
    inner: JsScene,
}

impl WebScene {
    #[must_use]
    pub fn new(inner: JsScene) -> Self {
        Self { inner }
    }
}

impl SceneNodes for WebScene {
    type Node = JsValue;

    fn create_button_node(&mut self, icon: &str) -> JsValue {
        self.inner.create_button_node(icon)
    }

    fn add_node(&mut self, node: &JsValue) {
        self.inner.add_node(node);
    }

    fn remove_node(&mut self, node: &JsValue) {
        self.inner.remove_node(node);
    }

    fn set_node_transform(&mut self, node: &JsValue, transform: &Mat4) {
        let matrix = Float32Array::from(&transform.to_cols_array()[..]);
        self.inner.set_node_matrix(node, &matrix);
    }

    fn set_node_icon(&mut self, node: &JsValue, icon: &str) {
        self.inner.set_node_icon(node, icon);
    }
}

impl Scene<WebXrHost> for WebScene {
    fn set_renderer(&mut self, context: &WebGl2RenderingContext) {
        self.inner.set_renderer(context);
    }

    fn use_profile_controller_meshes(&mut self, session: &XrSession) {
        self.inner.use_profile_controller_meshes(session);
    }

    fn start_frame(&mut self) {
        self.inner.start_frame();
    }

    fn end_frame(&mut self) {
        self.inner.end_frame();
    }

    fn update_input_sources(&mut self, frame: &XrFrame, space: &XrReferenceSpace) {
        self.inner.update_input_sources(frame, space);
    }

    fn handle_select(
        &mut self,
        source: &XrInputSource,
        frame: &XrFrame,
        space: &XrReferenceSpace,
    ) -> Option<JsValue> {
        let hit = self.inner.handle_select(source, frame, space);
        (!hit.is_null() && !hit.is_undefined()).then_some(hit)
    }

    fn draw_xr_frame(&mut self, frame: &XrFrame, pose: Option<&XrViewerPose>) {
        let pose = pose.map_or(JsValue::NULL, |pose| JsValue::from(pose.clone()));
        self.inner.draw_xr_frame(frame, &pose);
    }
}
