#![forbid(unsafe_code)]

//! [`XrHost`] over the browser's WebXR Device API.
//!
//! WebXR objects are reached through `web-sys`; dictionary members whose
//! setters have changed shape between `web-sys` releases are written with
//! `Reflect` instead.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Array, Function, Object, Promise, Reflect};
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Document, DomPointInit, HtmlCanvasElement, HtmlElement, WebGl2RenderingContext, Window,
    XrFrame, XrInputSource, XrInputSourceEvent, XrReferenceSpace, XrReferenceSpaceType,
    XrRenderStateInit, XrRigidTransform, XrSession, XrSessionEvent, XrSessionInit, XrSessionMode,
    XrSystem, XrViewerPose, XrWebGlLayer,
};
use xrplay_core::{ReferenceSpaceKind, SessionMode, XrError};
use xrplay_runtime::{FrameCallback, HostFuture, LocalTask, SessionEvents, XrHost};

use crate::page::{self, CANVAS_ID, ENTRY_BUTTON_ID, YAW_ELEMENT_ID};

/// Best-effort text for a rejected promise or thrown value.
pub(crate) fn js_error_text(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn session_mode(mode: SessionMode) -> XrSessionMode {
    match mode {
        SessionMode::Inline => XrSessionMode::Inline,
        SessionMode::ImmersiveVr => XrSessionMode::ImmersiveVr,
        SessionMode::ImmersiveAr => XrSessionMode::ImmersiveAr,
    }
}

fn reference_space_type(kind: ReferenceSpaceKind) -> XrReferenceSpaceType {
    match kind {
        ReferenceSpaceKind::Viewer => XrReferenceSpaceType::Viewer,
        ReferenceSpaceKind::Local => XrReferenceSpaceType::Local,
        ReferenceSpaceKind::LocalFloor => XrReferenceSpaceType::LocalFloor,
        ReferenceSpaceKind::BoundedFloor => XrReferenceSpaceType::BoundedFloor,
        ReferenceSpaceKind::Unbounded => XrReferenceSpaceType::Unbounded,
    }
}

/// Event closures registered on one session. Dropping them detaches the
/// listeners, so they live until the session has ended.
struct SessionListeners {
    ended: Rc<Cell<bool>>,
    _end: Closure<dyn FnMut(XrSessionEvent)>,
    _select: Closure<dyn FnMut(XrInputSourceEvent)>,
}

/// The browser window, its `navigator.xr`, and the page elements the player
/// drives.
pub struct WebXrHost {
    window: Window,
    document: Document,
    xr: Option<XrSystem>,
    canvas: RefCell<Option<HtmlCanvasElement>>,
    on_resize: RefCell<Option<Closure<dyn FnMut()>>>,
    listeners: RefCell<Vec<SessionListeners>>,
}

impl WebXrHost {
    /// Bind to the current window.
    ///
    /// A missing `navigator.xr` is not an error here; it surfaces as
    /// [`XrHost::has_xr`] returning `false`.
    pub fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let xr = Reflect::get(&window.navigator(), &JsValue::from_str("xr"))
            .ok()
            .filter(|xr| !xr.is_undefined() && !xr.is_null())
            .map(|xr| xr.unchecked_into::<XrSystem>());
        debug!(has_xr = xr.is_some(), "web host bound");
        Ok(Self {
            window,
            document,
            xr,
            canvas: RefCell::new(None),
            on_resize: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
        })
    }

    pub(crate) fn window(&self) -> &Window {
        &self.window
    }

    fn create_canvas(&self) -> Result<HtmlCanvasElement, JsValue> {
        let canvas: HtmlCanvasElement = self.document.create_element("canvas")?.dyn_into()?;
        canvas.set_id(CANVAS_ID);
        let body = self
            .document
            .body()
            .ok_or_else(|| JsValue::from_str("document has no body"))?;
        body.append_child(&canvas)?;
        Ok(canvas)
    }

    fn resize_canvas(window: &Window, canvas: &HtmlCanvasElement) {
        let (width, height) = page::canvas_pixels(
            canvas.client_width(),
            canvas.client_height(),
            window.device_pixel_ratio(),
        );
        canvas.set_width(width);
        canvas.set_height(height);
    }

    /// Keep the canvas backing store at device resolution.
    fn track_canvas_size(&self, canvas: &HtmlCanvasElement) {
        Self::resize_canvas(&self.window, canvas);
        let window = self.window.clone();
        let target = canvas.clone();
        let on_resize =
            Closure::<dyn FnMut()>::new(move || Self::resize_canvas(&window, &target));
        if let Err(err) = self
            .window
            .add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())
        {
            warn!(error = %js_error_text(&err), "canvas resize listener not installed");
        }
        *self.on_resize.borrow_mut() = Some(on_resize);
    }
}

impl XrHost for WebXrHost {
    type Session = XrSession;
    type Space = XrReferenceSpace;
    type Frame = XrFrame;
    type Pose = XrViewerPose;
    type InputSource = XrInputSource;
    type Context = WebGl2RenderingContext;

    fn has_xr(&self) -> bool {
        self.xr.is_some()
    }

    fn is_session_supported(&self, mode: SessionMode) -> HostFuture<bool> {
        let Some(xr) = &self.xr else {
            return Box::pin(async { false });
        };
        let promise = xr.is_session_supported(session_mode(mode));
        Box::pin(async move {
            JsFuture::from(promise)
                .await
                .ok()
                .and_then(|value| value.as_bool())
                .unwrap_or(false)
        })
    }

    fn request_session(
        &self,
        mode: SessionMode,
        required_features: &[&str],
    ) -> HostFuture<Result<XrSession, XrError>> {
        let Some(xr) = &self.xr else {
            return Box::pin(async { Err(XrError::CapabilityUnsupported) });
        };
        let init = XrSessionInit::new();
        let features: Array = required_features
            .iter()
            .map(|feature| JsValue::from_str(feature))
            .collect();
        if let Err(err) = Reflect::set(&init, &JsValue::from_str("requiredFeatures"), &features) {
            let reason = js_error_text(&err);
            return Box::pin(async move { Err(XrError::SessionRequestDenied(reason)) });
        }
        let promise = xr.request_session_with_options(session_mode(mode), &init);
        Box::pin(async move {
            let session = JsFuture::from(promise)
                .await
                .map_err(|err| XrError::SessionRequestDenied(js_error_text(&err)))?;
            Ok(session.unchecked_into::<XrSession>())
        })
    }

    fn request_reference_space(
        &self,
        session: &XrSession,
        kind: ReferenceSpaceKind,
    ) -> HostFuture<Result<XrReferenceSpace, XrError>> {
        let promise = session.request_reference_space(reference_space_type(kind));
        Box::pin(async move {
            let space = JsFuture::from(promise).await.map_err(|err| {
                XrError::ReferenceSpaceUnavailable {
                    kind,
                    reason: js_error_text(&err),
                }
            })?;
            Ok(space.unchecked_into::<XrReferenceSpace>())
        })
    }

    fn offset_reference_space(&self, space: &XrReferenceSpace, height: f32) -> XrReferenceSpace {
        if height == 0.0 {
            return space.clone();
        }
        let position = DomPointInit::new();
        let _ = Reflect::set(
            &position,
            &JsValue::from_str("y"),
            &JsValue::from_f64(f64::from(-height)),
        );
        match XrRigidTransform::new_with_position(&position) {
            Ok(offset) => space.get_offset_reference_space(&offset),
            Err(err) => {
                warn!(error = %js_error_text(&err), height, "offset transform rejected; using base space");
                space.clone()
            }
        }
    }

    fn create_graphics_context(&self) -> Result<WebGl2RenderingContext, XrError> {
        let unavailable = |err: JsValue| XrError::RenderContextUnavailable(js_error_text(&err));
        let canvas = self.create_canvas().map_err(unavailable)?;
        let attributes = Object::new();
        Reflect::set(&attributes, &JsValue::from_str("xrCompatible"), &JsValue::TRUE)
            .map_err(unavailable)?;
        let context = canvas
            .get_context_with_context_options("webgl2", &attributes)
            .map_err(unavailable)?
            .ok_or_else(|| XrError::RenderContextUnavailable("webgl2 not available".into()))?
            .dyn_into::<WebGl2RenderingContext>()
            .map_err(|_| XrError::RenderContextUnavailable("not a webgl2 context".into()))?;
        self.track_canvas_size(&canvas);
        *self.canvas.borrow_mut() = Some(canvas);
        debug!(canvas = CANVAS_ID, "graphics context created");
        Ok(context)
    }

    fn update_render_state(
        &self,
        session: &XrSession,
        context: &WebGl2RenderingContext,
    ) -> Result<(), XrError> {
        let layer = XrWebGlLayer::new_with_web_gl2_rendering_context(session, context)
            .map_err(|err| XrError::RenderContextUnavailable(js_error_text(&err)))?;
        let state = XrRenderStateInit::new();
        Reflect::set(&state, &JsValue::from_str("baseLayer"), &layer)
            .map_err(|err| XrError::RenderContextUnavailable(js_error_text(&err)))?;
        session.update_render_state_with_state(&state);
        Ok(())
    }

    fn listen(&self, session: &XrSession, events: SessionEvents<Self>) {
        let ended = Rc::new(Cell::new(false));

        let on_end = events.on_end;
        let flag = Rc::clone(&ended);
        let end = Closure::<dyn FnMut(XrSessionEvent)>::new(move |event: XrSessionEvent| {
            flag.set(true);
            on_end(&event.session());
        });

        let on_select = events.on_select;
        let select =
            Closure::<dyn FnMut(XrInputSourceEvent)>::new(move |event: XrInputSourceEvent| {
                on_select(&event.input_source(), &event.frame());
            });

        session.set_onend(Some(end.as_ref().unchecked_ref()));
        session.set_onselect(Some(select.as_ref().unchecked_ref()));

        let mut listeners = self.listeners.borrow_mut();
        listeners.retain(|entry| !entry.ended.get());
        listeners.push(SessionListeners {
            ended,
            _end: end,
            _select: select,
        });
    }

    fn request_animation_frame(&self, session: &XrSession, callback: FrameCallback<Self>) {
        let once = Closure::once_into_js(move |time: f64, frame: XrFrame| callback(time, &frame));
        session.request_animation_frame(once.unchecked_ref::<Function>());
    }

    fn end_session(&self, session: &XrSession) {
        let promise: Promise = session.end();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(err) = JsFuture::from(promise).await {
                // Usually the session already ended on its own.
                debug!(error = %js_error_text(&err), "session end rejected");
            }
        });
    }

    fn frame_session(&self, frame: &XrFrame) -> XrSession {
        frame.session()
    }

    fn viewer_pose(&self, frame: &XrFrame, space: &XrReferenceSpace) -> Option<XrViewerPose> {
        frame.get_viewer_pose(space)
    }

    fn viewer_yaw(&self) -> f32 {
        self.document
            .get_element_by_id(YAW_ELEMENT_ID)
            .and_then(|element| element.text_content())
            .map_or(0.0, |text| page::parse_yaw(&text))
    }

    fn is_fullscreen(&self) -> bool {
        self.document.fullscreen_element().is_some()
    }

    fn set_fullscreen(&self, fullscreen: bool) -> Result<(), XrError> {
        if !fullscreen {
            self.document.exit_fullscreen();
            return Ok(());
        }
        let root = self
            .document
            .document_element()
            .ok_or_else(|| XrError::FullscreenUnavailable("no document element".into()))?;
        root.request_fullscreen()
            .map_err(|err| XrError::FullscreenUnavailable(js_error_text(&err)))
    }

    fn set_entry_button_visible(&self, visible: bool) {
        let Some(button) = self
            .document
            .get_element_by_id(ENTRY_BUTTON_ID)
            .and_then(|element| element.dyn_into::<HtmlElement>().ok())
        else {
            return;
        };
        let display = page::entry_button_display(visible);
        if let Err(err) = button.style().set_property("display", display) {
            warn!(error = %js_error_text(&err), "entry button style not updated");
        }
    }

    fn spawn_local(&self, task: LocalTask) {
        wasm_bindgen_futures::spawn_local(task);
    }
}
