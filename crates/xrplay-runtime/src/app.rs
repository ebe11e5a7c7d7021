#![forbid(unsafe_code)]

//! Application state and the embedding-facing handle.
//!
//! [`XrApp`] is a cheap-clone handle over a single [`AppInner`]. Everything
//! mutable sits in its own `RefCell`. Borrows are kept short: none is held
//! across an `.await`, across a host call that may call back, or across a
//! user activation callback.

use core::fmt;
use std::cell::{OnceCell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, info};
use xrplay_core::{ConfigError, IconSet, SessionKind, XrError, XrOptions};
use xrplay_layout::{ButtonGridLayout, GridConfig};

use crate::controls::{ActivationHandle, ButtonDescriptor, ButtonIcon, ControlGrid};
use crate::frame_scheduler::FrameScheduler;
use crate::host::{Scene, SceneNodes, XrHost};
use crate::media::{MediaElement, player_controls};
use crate::reference_space::{ReferenceSpaceResolver, ResolvedSpace};

/// Observable lifecycle phase.
///
/// ```text
/// Uninitialized → AwaitingCapabilityCheck → (InlineActive | Idle)
///   → ImmersiveRequested → ImmersiveActive → Ended → (InlineActive | Idle)
/// ```
///
/// `Ended` is transient: it is entered when a session's end event arrives
/// and immediately settles into whatever the remaining sessions imply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecyclePhase {
    #[default]
    Uninitialized,
    AwaitingCapabilityCheck,
    InlineActive,
    Idle,
    ImmersiveRequested,
    ImmersiveActive,
    Ended,
}

impl LifecyclePhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::AwaitingCapabilityCheck => "awaiting-capability-check",
            Self::InlineActive => "inline-active",
            Self::Idle => "idle",
            Self::ImmersiveRequested => "immersive-requested",
            Self::ImmersiveActive => "immersive-active",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live session and, once resolved, its reference space.
pub(crate) struct SessionRecord<H: XrHost> {
    pub(crate) session: H::Session,
    pub(crate) space: Option<ResolvedSpace<H::Space>>,
}

/// Mutable per-page state.
pub(crate) struct ApplicationState<H: XrHost> {
    pub(crate) phase: LifecyclePhase,
    pub(crate) capability_checked: bool,
    pub(crate) immersive_supported: bool,
    pub(crate) sessions: [Option<SessionRecord<H>>; 2],
    /// Handle exposed to the page while an immersive session runs.
    pub(crate) active_immersive: Option<H::Session>,
    pub(crate) immersive_request_in_flight: bool,
    pub(crate) fullscreen: bool,
}

impl<H: XrHost> Default for ApplicationState<H> {
    fn default() -> Self {
        Self {
            phase: LifecyclePhase::Uninitialized,
            capability_checked: false,
            immersive_supported: false,
            sessions: [None, None],
            active_immersive: None,
            immersive_request_in_flight: false,
            fullscreen: false,
        }
    }
}

impl<H: XrHost> ApplicationState<H> {
    pub(crate) fn record(&self, kind: SessionKind) -> Option<&SessionRecord<H>> {
        self.sessions[kind.index()].as_ref()
    }

    /// Phase implied by the current sessions and flags.
    fn derived_phase(&self) -> LifecyclePhase {
        if self.phase == LifecyclePhase::Uninitialized {
            LifecyclePhase::Uninitialized
        } else if self.immersive_request_in_flight {
            LifecyclePhase::ImmersiveRequested
        } else if self.record(SessionKind::Immersive).is_some() {
            LifecyclePhase::ImmersiveActive
        } else if self.record(SessionKind::Inline).is_some() {
            LifecyclePhase::InlineActive
        } else if !self.capability_checked {
            LifecyclePhase::AwaitingCapabilityCheck
        } else {
            LifecyclePhase::Idle
        }
    }
}

/// Select hook for the pointer device used by guided tours.
pub type TourPointerHook<H> = Rc<dyn Fn(&<H as XrHost>::InputSource, &<H as XrHost>::Frame)>;

/// Frame hook replacing pose, input, controls and draw in guided tours.
pub type TourFrameHook<H> = Rc<dyn Fn(f64, &<H as XrHost>::Frame)>;

/// Guided-tour extensions. Ignored unless `XrOptions::guided_tour` is set.
pub struct TourHooks<H: XrHost> {
    pub pointer: Option<TourPointerHook<H>>,
    pub frame: Option<TourFrameHook<H>>,
}

impl<H: XrHost> Default for TourHooks<H> {
    fn default() -> Self {
        Self {
            pointer: None,
            frame: None,
        }
    }
}

pub(crate) struct AppInner<H: XrHost, S: Scene<H>> {
    pub(crate) host: H,
    pub(crate) options: XrOptions,
    pub(crate) icons: IconSet,
    pub(crate) resolver: ReferenceSpaceResolver,
    pub(crate) scene: RefCell<S>,
    pub(crate) grid: RefCell<ControlGrid<S::Node>>,
    pub(crate) context: OnceCell<H::Context>,
    pub(crate) state: RefCell<ApplicationState<H>>,
    pub(crate) scheduler: RefCell<FrameScheduler>,
    pub(crate) tour: RefCell<TourHooks<H>>,
}

/// Handle to the XR application. Clones share state.
pub struct XrApp<H: XrHost, S: Scene<H>> {
    pub(crate) inner: Rc<AppInner<H, S>>,
}

impl<H: XrHost, S: Scene<H>> Clone for XrApp<H, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<H, S> XrApp<H, S>
where
    H: XrHost,
    S: Scene<H> + 'static,
{
    /// Build an application with the player menu grid.
    pub fn new(host: H, scene: S, options: XrOptions) -> Result<Self, ConfigError> {
        Self::with_grid(host, scene, options, GridConfig::default())
    }

    pub fn with_grid(
        host: H,
        scene: S,
        options: XrOptions,
        grid: GridConfig,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        let layout = ButtonGridLayout::new(grid)?;
        debug!(?options, "xr app configured");
        Ok(Self {
            inner: Rc::new(AppInner {
                host,
                icons: options.icons(),
                resolver: ReferenceSpaceResolver::new(options.reference_space),
                options,
                scene: RefCell::new(scene),
                grid: RefCell::new(ControlGrid::new(layout)),
                context: OnceCell::new(),
                state: RefCell::new(ApplicationState::default()),
                scheduler: RefCell::new(FrameScheduler::new()),
                tour: RefCell::new(TourHooks::default()),
            }),
        })
    }

    pub(crate) fn upgrade(weak: &Weak<AppInner<H, S>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub(crate) fn downgrade(&self) -> Weak<AppInner<H, S>> {
        Rc::downgrade(&self.inner)
    }

    #[must_use]
    pub fn options(&self) -> &XrOptions {
        &self.inner.options
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.inner.host
    }

    #[must_use]
    pub fn phase(&self) -> LifecyclePhase {
        self.inner.state.borrow().phase
    }

    /// Result of the capability probe; `false` until it completes.
    #[must_use]
    pub fn immersive_supported(&self) -> bool {
        self.inner.state.borrow().immersive_supported
    }

    /// Whether the graphics context and renderer exist.
    #[must_use]
    pub fn is_rendering_ready(&self) -> bool {
        self.inner.context.get().is_some()
    }

    /// The running immersive session, if any.
    #[must_use]
    pub fn active_session(&self) -> Option<H::Session> {
        self.inner.state.borrow().active_immersive.clone()
    }

    #[must_use]
    pub fn session(&self, kind: SessionKind) -> Option<H::Session> {
        self.inner
            .state
            .borrow()
            .record(kind)
            .map(|r| r.session.clone())
    }

    /// The space frames of `kind` are evaluated in, once resolved.
    #[must_use]
    pub fn reference_space(&self, kind: SessionKind) -> Option<H::Space> {
        self.inner
            .state
            .borrow()
            .record(kind)
            .and_then(|r| r.space.as_ref())
            .map(|s| s.space().clone())
    }

    /// Eye height applied to the inline session, if one is resolved.
    #[must_use]
    pub fn inline_eye_height(&self) -> Option<f32> {
        self.inner
            .state
            .borrow()
            .record(SessionKind::Inline)
            .and_then(|r| r.space.as_ref())
            .and_then(|s| s.inline_helper().map(|h| h.height()))
    }

    #[must_use]
    pub fn frame_count(&self, kind: SessionKind) -> u64 {
        self.inner.scheduler.borrow().frame_count(kind)
    }

    #[must_use]
    pub fn is_frame_armed(&self, kind: SessionKind) -> bool {
        self.inner.scheduler.borrow().is_armed(kind)
    }

    pub(crate) fn kind_of(&self, session: &H::Session) -> Option<SessionKind> {
        let state = self.inner.state.borrow();
        SessionKind::ALL
            .into_iter()
            .find(|&kind| state.record(kind).is_some_and(|r| r.session == *session))
    }

    /// Move to `phase`, logging the change.
    pub(crate) fn transition(&self, phase: LifecyclePhase) {
        let mut state = self.inner.state.borrow_mut();
        if state.phase != phase {
            debug!(from = %state.phase, to = %phase, "lifecycle transition");
            state.phase = phase;
        }
    }

    /// Move to the phase the current state implies.
    pub(crate) fn settle(&self) {
        let phase = self.inner.state.borrow().derived_phase();
        self.transition(phase);
    }

    // ── Rendering ─────────────────────────────────────────────────────

    /// The shared graphics context, created and wired into the scene on
    /// first use. Later calls return the same context.
    pub fn graphics_context(&self) -> Result<H::Context, XrError> {
        if let Some(context) = self.inner.context.get() {
            return Ok(context.clone());
        }
        let context = self.inner.host.create_graphics_context()?;
        match self.inner.context.set(context) {
            Ok(()) => {
                if let Some(context) = self.inner.context.get() {
                    self.inner.scene.borrow_mut().set_renderer(context);
                    info!("graphics context created");
                }
            }
            // Created re-entrantly while we were creating ours.
            Err(_) => debug!("discarding duplicate graphics context"),
        }
        self.inner.context.get().cloned().ok_or_else(|| {
            XrError::RenderContextUnavailable("graphics context was not retained".into())
        })
    }

    // ── Menu ──────────────────────────────────────────────────────────

    /// Build buttons for `descriptors` and append them to the menu grid.
    /// Returns the total number of controls.
    pub fn add_permission_buttons(&self, descriptors: Vec<ButtonDescriptor>) -> usize {
        let mut grid = self.inner.grid.borrow_mut();
        let added = grid.extend(
            &mut *self.inner.scene.borrow_mut(),
            &self.inner.icons,
            descriptors,
        );
        info!(added = added.len(), total = grid.len(), "controls added");
        grid.len()
    }

    /// Add the video player buttons plus a full-screen toggle.
    pub fn add_player_controls<M: MediaElement>(&self, media: Rc<M>) -> usize {
        let mut descriptors = player_controls(media);
        let weak = self.downgrade();
        descriptors.push(ButtonDescriptor::new(IconSet::FULLSCREEN, move |handle| {
            let Some(app) = Self::upgrade(&weak) else {
                return;
            };
            if app.toggle_full_screen().is_err() {
                handle.mark_fail();
            }
        }));
        self.add_permission_buttons(descriptors)
    }

    #[must_use]
    pub fn control_count(&self) -> usize {
        self.inner.grid.borrow().len()
    }

    #[must_use]
    pub fn control_icon(&self, index: usize) -> Option<ButtonIcon> {
        self.inner.grid.borrow().controls().get(index).map(|c| c.icon())
    }

    #[must_use]
    pub fn control_node(&self, index: usize) -> Option<S::Node> {
        self.inner
            .grid
            .borrow()
            .controls()
            .get(index)
            .map(|c| c.node().clone())
    }

    #[must_use]
    pub fn options_visible(&self) -> bool {
        self.inner.grid.borrow().is_visible()
    }

    /// Detach or re-attach the whole menu. Returns the new visibility.
    pub fn toggle_options(&self) -> bool {
        let visible = self
            .inner
            .grid
            .borrow_mut()
            .toggle(&mut *self.inner.scene.borrow_mut());
        debug!(visible, "options toggled");
        visible
    }

    /// Swap control `index` to `icon`.
    pub fn mark_control(&self, index: usize, icon: ButtonIcon) -> bool {
        self.inner.grid.borrow_mut().set_icon(
            &mut *self.inner.scene.borrow_mut(),
            &self.inner.icons,
            index,
            icon,
        )
    }

    // ── Page ──────────────────────────────────────────────────────────

    /// Enter or leave page full-screen; the VR entry button is hidden while
    /// full-screen. Returns the new full-screen state.
    pub fn toggle_full_screen(&self) -> Result<bool, XrError> {
        let fullscreen = !self.inner.host.is_fullscreen();
        self.inner.host.set_fullscreen(fullscreen)?;
        self.inner.host.set_entry_button_visible(!fullscreen);
        self.inner.state.borrow_mut().fullscreen = fullscreen;
        debug!(fullscreen, "full-screen toggled");
        Ok(fullscreen)
    }

    #[must_use]
    pub fn is_fullscreen(&self) -> bool {
        self.inner.state.borrow().fullscreen
    }

    pub fn set_tour_hooks(&self, hooks: TourHooks<H>) {
        *self.inner.tour.borrow_mut() = hooks;
    }

    // ── Input ─────────────────────────────────────────────────────────

    /// Host select entry point.
    pub(crate) fn on_select(&self, source: &H::InputSource, frame: &H::Frame) {
        let session = self.inner.host.frame_session(frame);
        let Some(kind) = self.kind_of(&session) else {
            return;
        };
        let Some(space) = self.reference_space(kind) else {
            debug!(%kind, "select before reference space resolved");
            return;
        };

        if self.inner.options.guided_tour {
            let pointer = self.inner.tour.borrow().pointer.clone();
            if let Some(pointer) = pointer {
                pointer(source, frame);
            }
        }

        let hit = self
            .inner
            .scene
            .borrow_mut()
            .handle_select(source, frame, &space);
        if let Some(node) = hit {
            self.activate_node(&node);
        }
    }

    fn activate_node(&self, node: &<S as SceneNodes>::Node) {
        let found = {
            let grid = self.inner.grid.borrow();
            grid.position_of(node)
                .map(|i| (i, Rc::clone(&grid.controls()[i].descriptor().on_activate)))
        };
        let Some((index, on_activate)) = found else {
            return;
        };
        debug!(index, "control activated");
        let weak = self.downgrade();
        let handle = ActivationHandle::new(index, move |i, icon| {
            if let Some(app) = Self::upgrade(&weak) {
                app.mark_control(i, icon);
            }
        });
        on_activate(handle);
    }
}

impl<H: XrHost, S: Scene<H>> fmt::Debug for XrApp<H, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("XrApp")
            .field("phase", &state.phase)
            .field("immersive_supported", &state.immersive_supported)
            .field("rendering_ready", &self.inner.context.get().is_some())
            .finish_non_exhaustive()
    }
}
