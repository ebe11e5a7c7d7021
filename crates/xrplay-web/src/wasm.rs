#![forbid(unsafe_code)]

//! `wasm-bindgen` exports for the player.
//!
//! Only compiled on `wasm32` targets.

use std::rc::Rc;

use js_sys::{Array, Function, Promise, Reflect};
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{HtmlVideoElement, XrFrame, XrInputSource};
use xrplay_core::SessionKind;
use xrplay_runtime::{ButtonDescriptor, MediaElement, TourHooks, XrApp};

use crate::js_scene::{JsScene, WebScene};
use crate::logging;
use crate::page;
use crate::web_host::{WebXrHost, js_error_text};

type WebApp = XrApp<WebXrHost, WebScene>;

fn console_error(msg: &str) {
    let global = js_sys::global();
    let Ok(console) = Reflect::get(&global, &"console".into()) else {
        return;
    };
    let Ok(error) = Reflect::get(&console, &"error".into()) else {
        return;
    };
    let Ok(error_fn) = error.dyn_into::<Function>() else {
        return;
    };
    let _ = error_fn.call1(&console, &JsValue::from_str(msg));
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = if let Some(loc) = info.location() {
                format!(
                    "panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                )
            } else {
                format!("panic: {info}")
            };
            console_error(&msg);
        }));
    });
}

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

fn get_string(object: &JsValue, key: &str) -> Option<String> {
    Reflect::get(object, &JsValue::from_str(key))
        .ok()
        .and_then(|value| value.as_string())
}

fn get_function(object: &JsValue, key: &str) -> Option<Function> {
    Reflect::get(object, &JsValue::from_str(key))
        .ok()
        .and_then(|value| value.dyn_into::<Function>().ok())
}

/// `{icon, callback}` entries from the page. `callback` receives
/// `(markSuccess, markFail)`.
fn descriptors_from_js(list: &Array) -> Result<Vec<ButtonDescriptor>, JsValue> {
    list.iter()
        .enumerate()
        .map(|(index, entry)| {
            let icon = get_string(&entry, "icon")
                .ok_or_else(|| to_js_error(format!("button {index}: missing icon")))?;
            let callback = get_function(&entry, "callback")
                .ok_or_else(|| to_js_error(format!("button {index}: missing callback")))?;
            Ok(ButtonDescriptor::new(icon, move |handle| {
                let success = handle.clone();
                let mark_success = Closure::<dyn Fn()>::new(move || success.mark_success());
                let mark_fail = Closure::<dyn Fn()>::new(move || handle.mark_fail());
                if let Err(err) = callback.call2(
                    &JsValue::NULL,
                    &mark_success.into_js_value(),
                    &mark_fail.into_js_value(),
                ) {
                    warn!(control = index, error = %js_error_text(&err), "button callback threw");
                }
            }))
        })
        .collect()
}

/// Player controls drive a page `<video>`.
struct VideoElement(HtmlVideoElement);

impl MediaElement for VideoElement {
    fn play(&self) {
        if let Err(err) = self.0.play() {
            warn!(error = %js_error_text(&err), "video play refused");
        }
    }

    fn pause(&self) {
        if let Err(err) = self.0.pause() {
            warn!(error = %js_error_text(&err), "video pause refused");
        }
    }

    fn is_muted(&self) -> bool {
        self.0.muted()
    }

    fn set_muted(&self, muted: bool) {
        self.0.set_muted(muted);
    }

    fn restart(&self) {
        self.0.set_current_time(0.0);
    }
}

#[wasm_bindgen(start)]
pub fn wasm_start() {
    install_panic_hook();
}

/// Install console logging at `level` (`error`, `warn`, `info`, `debug`,
/// `trace`). Call before constructing a player to change the default `info`.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: Option<String>) {
    logging::init(level.as_deref());
}

/// WebXR player: inline preview, immersive sessions, and the in-scene menu.
#[wasm_bindgen]
pub struct XrPlayer {
    app: WebApp,
}

#[wasm_bindgen]
impl XrPlayer {
    /// Bind a player to `scene`.
    ///
    /// `options` is a plain object with any of `inline`, `immersiveMode`,
    /// `referenceSpace`, `defaultInputHandling`, `usePolyfill`, `guidedTour`,
    /// `iconBase`. The page URL's query string overrides it. `signedIn`
    /// enables the guided tour on the tour page.
    #[wasm_bindgen(constructor)]
    pub fn new(
        scene: JsScene,
        options: Option<js_sys::Object>,
        signed_in: Option<bool>,
    ) -> Result<XrPlayer, JsValue> {
        install_panic_hook();
        logging::init(None);

        let host = WebXrHost::new()?;
        let location = host.window().location();
        let query = location.search().unwrap_or_default();
        let path = location.pathname().unwrap_or_default();
        let json = options
            .map(|options| js_sys::JSON::stringify(&options))
            .transpose()?
            .map(String::from);
        let tour = page::is_tour_page(&path, signed_in.unwrap_or(false));
        let options = page::resolve_options(json.as_deref(), &query, tour).map_err(to_js_error)?;

        let app = XrApp::new(host, WebScene::new(scene), options).map_err(to_js_error)?;
        Ok(Self { app })
    }

    /// Check capability and start the inline session. Later calls are ignored.
    pub fn run(&self) {
        self.app.run();
    }

    /// Resolves with the `XRSession`; rejects with the failure reason.
    #[wasm_bindgen(js_name = requestImmersiveSession)]
    pub fn request_immersive_session(&self) -> Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            app.request_immersive_session()
                .await
                .map(JsValue::from)
                .map_err(to_js_error)
        })
    }

    /// Ask the running immersive session to end. `false` if none is running.
    #[wasm_bindgen(js_name = endSession)]
    pub fn end_session(&self) -> bool {
        self.app.end_active_session()
    }

    /// Append menu buttons; returns the total control count.
    #[wasm_bindgen(js_name = addPermissionButtons)]
    pub fn add_permission_buttons(&self, list: Array) -> Result<usize, JsValue> {
        let descriptors = descriptors_from_js(&list)?;
        Ok(self.app.add_permission_buttons(descriptors))
    }

    /// Append play, pause, mute, restart, and full-screen buttons for `video`.
    #[wasm_bindgen(js_name = addPlayerControls)]
    pub fn add_player_controls(&self, video: HtmlVideoElement) -> usize {
        self.app.add_player_controls(Rc::new(VideoElement(video)))
    }

    /// Show or hide the menu; returns whether it is now visible.
    #[wasm_bindgen(js_name = toggleOptions)]
    pub fn toggle_options(&self) -> bool {
        self.app.toggle_options()
    }

    /// Enter or leave full screen; returns whether the page is now full screen.
    #[wasm_bindgen(js_name = toggleFullScreen)]
    pub fn toggle_full_screen(&self) -> Result<bool, JsValue> {
        self.app.toggle_full_screen().map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = immersiveSupported)]
    pub fn immersive_supported(&self) -> bool {
        self.app.immersive_supported()
    }

    /// Lifecycle phase name, e.g. `"inline-active"`.
    pub fn phase(&self) -> String {
        self.app.phase().as_str().to_string()
    }

    #[wasm_bindgen(js_name = isImmersiveActive)]
    pub fn is_immersive_active(&self) -> bool {
        self.app.session(SessionKind::Immersive).is_some()
    }

    /// Guided-tour hooks: `pointer(inputSource, frame)` sees every select,
    /// `frame(time, frame)` replaces the per-frame body. Ignored outside
    /// tour mode.
    #[wasm_bindgen(js_name = setTourHooks)]
    pub fn set_tour_hooks(&self, pointer: Option<Function>, frame: Option<Function>) {
        let pointer = pointer.map(|hook| {
            Rc::new(move |source: &XrInputSource, frame: &XrFrame| {
                if let Err(err) = hook.call2(&JsValue::NULL, source, frame) {
                    warn!(error = %js_error_text(&err), "tour pointer hook threw");
                }
            }) as Rc<dyn Fn(&XrInputSource, &XrFrame)>
        });
        let frame = frame.map(|hook| {
            Rc::new(move |time: f64, frame: &XrFrame| {
                if let Err(err) = hook.call2(&JsValue::NULL, &JsValue::from_f64(time), frame) {
                    warn!(error = %js_error_text(&err), "tour frame hook threw");
                }
            }) as Rc<dyn Fn(f64, &XrFrame)>
        });
        self.app.set_tour_hooks(TourHooks { pointer, frame });
    }
}
