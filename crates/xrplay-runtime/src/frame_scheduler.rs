#![forbid(unsafe_code)]

//! Per-session frame loop.
//!
//! Host frame callbacks are one-shot, so the loop only continues while each
//! frame re-registers itself. [`FrameScheduler`] makes that explicit with one
//! `armed` flag per session kind: a flag is set exactly while a host callback
//! is outstanding. Ending a session disarms it, and any callback that still
//! arrives afterwards is dropped without touching the scene.
//!
//! Each delivered frame runs these steps in order:
//!
//! 1. resolve the session's reference space (missing space ends the session)
//! 2. re-arm for the next frame
//! 3. `start_frame`
//! 4. viewer pose
//! 5. input polling, when enabled
//! 6. control transforms for the current yaw
//! 7. draw
//! 8. `end_frame`
//!
//! A guided-tour frame hook, when installed, replaces steps 4-7.

use std::rc::Rc;

use tracing::{error, trace, trace_span};
use xrplay_core::SessionKind;

use crate::app::XrApp;
use crate::host::{FrameCallback, Scene, XrHost};

/// Armed flags and delivered-frame counters, one slot per session kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameScheduler {
    armed: [bool; 2],
    frames: [u64; 2],
}

impl FrameScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a callback as outstanding for `kind`.
    ///
    /// Returns `false` if one already was; the caller must not register a
    /// second host callback in that case.
    pub fn arm(&mut self, kind: SessionKind) -> bool {
        let slot = &mut self.armed[kind.index()];
        if *slot {
            return false;
        }
        *slot = true;
        true
    }

    /// Accept a delivered frame. Returns `false` if none was expected.
    pub fn consume(&mut self, kind: SessionKind) -> bool {
        let i = kind.index();
        if !self.armed[i] {
            return false;
        }
        self.armed[i] = false;
        self.frames[i] += 1;
        true
    }

    pub fn disarm(&mut self, kind: SessionKind) {
        self.armed[kind.index()] = false;
    }

    #[must_use]
    pub fn is_armed(&self, kind: SessionKind) -> bool {
        self.armed[kind.index()]
    }

    /// Frames accepted for `kind` since startup.
    #[must_use]
    pub fn frame_count(&self, kind: SessionKind) -> u64 {
        self.frames[kind.index()]
    }
}

impl<H, S> XrApp<H, S>
where
    H: XrHost,
    S: Scene<H> + 'static,
{
    /// Arm `kind` and register a host callback, unless one is outstanding.
    pub(crate) fn schedule_frame(&self, session: &H::Session, kind: SessionKind) {
        if !self.inner.scheduler.borrow_mut().arm(kind) {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        let callback: FrameCallback<H> = Rc::new(move |time: f64, frame: &H::Frame| {
            if let Some(app) = XrApp::upgrade(&weak) {
                app.on_frame(time, frame);
            }
        });
        self.inner.host.request_animation_frame(session, callback);
    }

    /// Host frame entry point.
    pub(crate) fn on_frame(&self, time: f64, frame: &H::Frame) {
        let inner = &self.inner;
        let session = inner.host.frame_session(frame);
        let Some(kind) = self.kind_of(&session) else {
            trace!(?session, "dropping frame for a session that is no longer live");
            return;
        };
        if !inner.scheduler.borrow_mut().consume(kind) {
            trace!(%kind, "dropping unexpected frame");
            return;
        }
        let _span = trace_span!("xr_frame", %kind, time).entered();

        // 1
        let Some(space) = self.reference_space(kind) else {
            error!(%kind, "frame without a resolved reference space; ending session");
            inner.scheduler.borrow_mut().disarm(kind);
            inner.host.end_session(&session);
            return;
        };

        // 2
        self.schedule_frame(&session, kind);

        // 3
        inner.scene.borrow_mut().start_frame();

        let hook = if inner.options.guided_tour {
            inner.tour.borrow().frame.clone()
        } else {
            None
        };
        if let Some(hook) = hook {
            hook(time, frame);
        } else {
            // 4
            let pose = inner.host.viewer_pose(frame, &space);
            let mut scene = inner.scene.borrow_mut();
            // 5
            if inner.options.default_input_handling {
                scene.update_input_sources(frame, &space);
            }
            // 6
            inner
                .grid
                .borrow()
                .update_transforms(&mut *scene, inner.host.viewer_yaw());
            // 7
            scene.draw_xr_frame(frame, pose.as_ref());
        }

        // 8
        inner.scene.borrow_mut().end_frame();
    }
}
