#![forbid(unsafe_code)]

//! Runtime: session lifecycle, frame loop, and menu controls.
//!
//! # Role in xrplay
//! `xrplay-runtime` drives an XR application through its sessions. It asks
//! the host for sessions, resolves their reference spaces, keeps the
//! one-shot frame callback re-armed while a session lives, and each frame
//! repositions the menu buttons to face the viewer before drawing.
//!
//! # How it fits in the system
//! The runtime is host-agnostic. The browser binding (`xrplay-web`) and the
//! test fixtures (`xrplay-harness`) both implement [`XrHost`] and [`Scene`];
//! the runtime never touches a browser API itself. Geometry comes from
//! `xrplay-layout`, configuration and errors from `xrplay-core`.
//!
//! Execution is single-threaded and callback driven. [`XrApp`] is an `Rc`
//! handle; host callbacks hold it weakly so dropping the last handle stops
//! the application.

pub mod app;
pub mod controls;
pub mod frame_scheduler;
pub mod host;
mod lifecycle;
pub mod media;
pub mod reference_space;

pub use app::{LifecyclePhase, TourFrameHook, TourHooks, TourPointerHook, XrApp};
pub use controls::{ActivationHandle, ButtonDescriptor, ButtonIcon, ControlGrid, PermissionButton};
pub use frame_scheduler::FrameScheduler;
pub use host::{FrameCallback, HostFuture, LocalTask, Scene, SceneNodes, SessionEvents, XrHost};
pub use media::{MediaElement, player_controls};
pub use reference_space::{INLINE_EYE_HEIGHT, InlineViewerHelper, ReferenceSpaceResolver, ResolvedSpace};
