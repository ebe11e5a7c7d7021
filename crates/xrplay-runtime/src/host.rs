#![forbid(unsafe_code)]

//! Seams to the outside world.
//!
//! The runtime never talks to a browser directly. Everything it needs from
//! the XR runtime and the page goes through [`XrHost`]; everything it needs
//! from the scene graph and renderer goes through [`Scene`].
//!
//! Async requests return [`HostFuture`]s. They are `'static` and own
//! whatever they need, so the runtime can await them without holding any
//! borrow of its own state.
//!
//! Event delivery is callback based, mirroring the host: the runtime hands
//! the host [`SessionEvents`] once per session and a [`FrameCallback`] each
//! time it arms the frame loop. Host frame callbacks are one-shot.

use core::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use glam::Mat4;
use xrplay_core::{ReferenceSpaceKind, SessionMode, XrError};

/// Future returned by host requests.
pub type HostFuture<T> = Pin<Box<dyn Future<Output = T>>>;

/// Fire-and-forget work handed to the host's local executor.
pub type LocalTask = Pin<Box<dyn Future<Output = ()>>>;

/// One-shot per-frame callback: `(timestamp_ms, frame)`.
pub type FrameCallback<H> = Rc<dyn Fn(f64, &<H as XrHost>::Frame)>;

/// Listeners the host forwards session events to.
pub struct SessionEvents<H: XrHost> {
    /// Fired once when the session ends, whatever the cause.
    pub on_end: Rc<dyn Fn(&H::Session)>,
    /// Fired for every primary action of an input source.
    pub on_select: Rc<dyn Fn(&H::InputSource, &H::Frame)>,
}

impl<H: XrHost> Clone for SessionEvents<H> {
    fn clone(&self) -> Self {
        Self {
            on_end: Rc::clone(&self.on_end),
            on_select: Rc::clone(&self.on_select),
        }
    }
}

/// The XR runtime and page environment.
pub trait XrHost: 'static {
    /// Opaque session handle. Equality identifies the session.
    type Session: Clone + PartialEq + fmt::Debug + 'static;
    /// Opaque reference space handle.
    type Space: Clone + fmt::Debug + 'static;
    /// Per-frame snapshot, valid only during its callback.
    type Frame: 'static;
    /// Tracked viewer pose for a frame.
    type Pose: 'static;
    /// Controller, hand, or gaze input.
    type InputSource: 'static;
    /// Graphics context the scene draws into. Clones share the context.
    type Context: Clone + 'static;

    /// Whether any XR runtime is present.
    fn has_xr(&self) -> bool;

    fn is_session_supported(&self, mode: SessionMode) -> HostFuture<bool>;

    fn request_session(
        &self,
        mode: SessionMode,
        required_features: &[&str],
    ) -> HostFuture<Result<Self::Session, XrError>>;

    fn request_reference_space(
        &self,
        session: &Self::Session,
        kind: ReferenceSpaceKind,
    ) -> HostFuture<Result<Self::Space, XrError>>;

    /// Derive a space whose origin sits `height` units below `space`'s.
    fn offset_reference_space(&self, space: &Self::Space, height: f32) -> Self::Space;

    /// Create an XR-compatible graphics context.
    fn create_graphics_context(&self) -> Result<Self::Context, XrError>;

    /// Point the session's output at `context`.
    fn update_render_state(
        &self,
        session: &Self::Session,
        context: &Self::Context,
    ) -> Result<(), XrError>;

    /// Start forwarding `end` and `select` events for `session`.
    fn listen(&self, session: &Self::Session, events: SessionEvents<Self>)
    where
        Self: Sized;

    /// Register `callback` for the session's next frame only.
    fn request_animation_frame(&self, session: &Self::Session, callback: FrameCallback<Self>)
    where
        Self: Sized;

    /// Ask the host to end `session`. Termination is observed via `on_end`.
    fn end_session(&self, session: &Self::Session);

    fn frame_session(&self, frame: &Self::Frame) -> Self::Session;

    /// `None` when tracking is lost for this frame.
    fn viewer_pose(&self, frame: &Self::Frame, space: &Self::Space) -> Option<Self::Pose>;

    /// Current viewer yaw in radians, as reported by the page's look control.
    fn viewer_yaw(&self) -> f32;

    fn is_fullscreen(&self) -> bool;

    fn set_fullscreen(&self, fullscreen: bool) -> Result<(), XrError>;

    /// Show or hide the page's "enter VR" button.
    fn set_entry_button_visible(&self, visible: bool);

    /// Run `task` on the host's single-threaded executor.
    fn spawn_local(&self, task: LocalTask);
}

/// Node operations on the scene graph, independent of the host.
pub trait SceneNodes {
    /// Renderable node handle.
    type Node: Clone + PartialEq + fmt::Debug;

    /// Create (but do not attach) an icon-textured button quad.
    fn create_button_node(&mut self, icon: &str) -> Self::Node;

    fn add_node(&mut self, node: &Self::Node);

    fn remove_node(&mut self, node: &Self::Node);

    fn set_node_transform(&mut self, node: &Self::Node, transform: &Mat4);

    fn set_node_icon(&mut self, node: &Self::Node, icon: &str);
}

/// The scene graph and renderer as seen by the frame loop.
pub trait Scene<H: XrHost>: SceneNodes {
    /// One-time renderer wiring after the graphics context exists.
    fn set_renderer(&mut self, context: &H::Context);

    fn use_profile_controller_meshes(&mut self, session: &H::Session);

    fn start_frame(&mut self);

    fn end_frame(&mut self);

    fn update_input_sources(&mut self, frame: &H::Frame, space: &H::Space);

    /// Hit-test a selection. Returns the targeted node, if any.
    fn handle_select(
        &mut self,
        source: &H::InputSource,
        frame: &H::Frame,
        space: &H::Space,
    ) -> Option<Self::Node>;

    fn draw_xr_frame(&mut self, frame: &H::Frame, pose: Option<&H::Pose>);
}
