#![forbid(unsafe_code)]

//! Scripted in-memory XR host.
//!
//! [`FakeHost`] is a cheap-clone handle: the application owns one clone and
//! the test keeps another to script failures, inspect recorded calls, and
//! deliver events. Nothing is delivered on its own. Tasks handed to
//! `spawn_local` wait in a FIFO queue until [`FakeHost::run_until_stalled`];
//! frames, selections and end events are delivered by explicit calls.
//!
//! Every host future is already complete, so driving one with `pollster`
//! never parks.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::{Future, poll_fn, ready};
use std::rc::Rc;
use std::task::Poll;

use tracing::trace;
use xrplay_core::{ReferenceSpaceKind, SessionKind, SessionMode, XrError};
use xrplay_runtime::{FrameCallback, HostFuture, LocalTask, SessionEvents, XrHost};

use crate::recording_scene::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeSession {
    pub id: u32,
    pub mode: SessionMode,
}

impl FakeSession {
    #[must_use]
    pub fn kind(&self) -> SessionKind {
        self.mode.kind()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakeSpace {
    pub id: u32,
    pub session: FakeSession,
    pub kind: ReferenceSpaceKind,
    /// Eye height folded in by `offset_reference_space`.
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakeFrame {
    pub session: FakeSession,
    pub time: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakePose {
    pub space: FakeSpace,
}

/// Input source aimed at `target`, or at nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeInputSource {
    pub target: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeContext {
    pub id: u32,
}

/// A host call observed by the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    IsSessionSupported(SessionMode),
    RequestSession {
        mode: SessionMode,
        features: Vec<String>,
    },
    RequestReferenceSpace {
        session: FakeSession,
        kind: ReferenceSpaceKind,
    },
    CreateGraphicsContext,
    UpdateRenderState(FakeSession),
    Listen(FakeSession),
    RequestAnimationFrame(FakeSession),
    EndSession(FakeSession),
    SetFullscreen(bool),
    SetEntryButtonVisible(bool),
}

#[derive(Debug, Clone)]
struct Script {
    xr_available: bool,
    immersive_supported: bool,
    deny_sessions: bool,
    denied_spaces: Vec<ReferenceSpaceKind>,
    fail_context: bool,
    fail_fullscreen: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            xr_available: true,
            immersive_supported: true,
            deny_sessions: false,
            denied_spaces: Vec::new(),
            fail_context: false,
            fail_fullscreen: false,
        }
    }
}

struct HostState {
    script: Script,
    next_id: u32,
    calls: Vec<HostCall>,
    contexts_created: u32,
    frame_callbacks: Vec<(FakeSession, FrameCallback<FakeHost>)>,
    listeners: Vec<(FakeSession, SessionEvents<FakeHost>)>,
    end_requests: VecDeque<FakeSession>,
    pose_available: bool,
    yaw: f32,
    fullscreen: bool,
    entry_button_visible: bool,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            script: Script::default(),
            next_id: 0,
            calls: Vec::new(),
            contexts_created: 0,
            frame_callbacks: Vec::new(),
            listeners: Vec::new(),
            end_requests: VecDeque::new(),
            pose_available: true,
            yaw: 0.0,
            fullscreen: false,
            entry_button_visible: true,
        }
    }
}

impl HostState {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Scripted host. See the module docs.
#[derive(Clone, Default)]
pub struct FakeHost {
    state: Rc<RefCell<HostState>>,
    tasks: Rc<RefCell<VecDeque<LocalTask>>>,
    hold_requests: Rc<Cell<bool>>,
}

impl FakeHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Script ────────────────────────────────────────────────────────

    /// No XR runtime at all.
    #[must_use]
    pub fn without_xr(self) -> Self {
        self.state.borrow_mut().script.xr_available = false;
        self
    }

    /// The capability probe reports no immersive support and immersive
    /// requests are refused.
    #[must_use]
    pub fn without_immersive_support(self) -> Self {
        self.state.borrow_mut().script.immersive_supported = false;
        self
    }

    /// Refuse every immersive session request.
    #[must_use]
    pub fn deny_sessions(self) -> Self {
        self.state.borrow_mut().script.deny_sessions = true;
        self
    }

    #[must_use]
    pub fn deny_reference_space(self, kind: ReferenceSpaceKind) -> Self {
        self.state.borrow_mut().script.denied_spaces.push(kind);
        self
    }

    #[must_use]
    pub fn fail_graphics_context(self) -> Self {
        self.state.borrow_mut().script.fail_context = true;
        self
    }

    #[must_use]
    pub fn fail_fullscreen(self) -> Self {
        self.state.borrow_mut().script.fail_fullscreen = true;
        self
    }

    /// Keep session requests pending until released.
    ///
    /// Held futures never wake their task; poll them again by hand after
    /// [`release_session_requests`](Self::release_session_requests).
    pub fn hold_session_requests(&self) {
        self.hold_requests.set(true);
    }

    pub fn release_session_requests(&self) {
        self.hold_requests.set(false);
    }

    pub fn set_pose_available(&self, available: bool) {
        self.state.borrow_mut().pose_available = available;
    }

    pub fn set_yaw(&self, yaw: f32) {
        self.state.borrow_mut().yaw = yaw;
    }

    // ── Driving ───────────────────────────────────────────────────────

    /// Run queued local tasks, including ones they spawn, until none remain.
    pub fn run_until_stalled(&self) {
        loop {
            let task = self.tasks.borrow_mut().pop_front();
            let Some(task) = task else {
                break;
            };
            pollster::block_on(task);
        }
    }

    /// Drive `future` to completion, then drain spawned tasks.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        let output = pollster::block_on(future);
        self.run_until_stalled();
        output
    }

    /// Deliver one frame to every callback registered for `session`.
    ///
    /// Callbacks are one-shot and removed before they run. Returns how many
    /// ran.
    pub fn fire_frame(&self, session: FakeSession, time: f64) -> usize {
        let callbacks: Vec<FrameCallback<FakeHost>> = {
            let mut state = self.state.borrow_mut();
            let (due, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut state.frame_callbacks)
                .into_iter()
                .partition(|(s, _)| *s == session);
            state.frame_callbacks = keep;
            due.into_iter().map(|(_, cb)| cb).collect()
        };
        let frame = FakeFrame { session, time };
        for callback in &callbacks {
            callback(time, &frame);
        }
        callbacks.len()
    }

    /// Frame callbacks currently registered for `session`.
    #[must_use]
    pub fn pending_frames(&self, session: FakeSession) -> usize {
        self.state
            .borrow()
            .frame_callbacks
            .iter()
            .filter(|(s, _)| *s == session)
            .count()
    }

    /// Complete every requested session end. Returns how many ended.
    pub fn deliver_end_events(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = self.state.borrow_mut().end_requests.pop_front();
            let Some(session) = next else {
                break;
            };
            self.disconnect(session);
            delivered += 1;
        }
        delivered
    }

    /// End `session` from the host side, as a device disconnect would.
    pub fn disconnect(&self, session: FakeSession) {
        let listeners = self.listeners_for(session);
        self.state
            .borrow_mut()
            .listeners
            .retain(|(s, _)| *s != session);
        trace!(?session, "fake session ended");
        for events in listeners {
            (events.on_end)(&session);
        }
    }

    /// Dispatch a select from an input source aimed at `target`.
    pub fn select(&self, session: FakeSession, target: Option<NodeId>) {
        let frame = FakeFrame { session, time: 0.0 };
        let source = FakeInputSource { target };
        for events in self.listeners_for(session) {
            (events.on_select)(&source, &frame);
        }
    }

    fn listeners_for(&self, session: FakeSession) -> Vec<SessionEvents<FakeHost>> {
        self.state
            .borrow()
            .listeners
            .iter()
            .filter(|(s, _)| *s == session)
            .map(|(_, events)| events.clone())
            .collect()
    }

    // ── Inspection ────────────────────────────────────────────────────

    #[must_use]
    pub fn calls(&self) -> Vec<HostCall> {
        self.state.borrow().calls.clone()
    }

    /// How many times `predicate` matched a recorded call.
    #[must_use]
    pub fn count_calls(&self, predicate: impl Fn(&HostCall) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| predicate(c)).count()
    }

    #[must_use]
    pub fn contexts_created(&self) -> u32 {
        self.state.borrow().contexts_created
    }

    #[must_use]
    pub fn entry_button_visible(&self) -> bool {
        self.state.borrow().entry_button_visible
    }

    fn record(&self, call: HostCall) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl XrHost for FakeHost {
    type Session = FakeSession;
    type Space = FakeSpace;
    type Frame = FakeFrame;
    type Pose = FakePose;
    type InputSource = FakeInputSource;
    type Context = FakeContext;

    fn has_xr(&self) -> bool {
        self.state.borrow().script.xr_available
    }

    fn is_session_supported(&self, mode: SessionMode) -> HostFuture<bool> {
        self.record(HostCall::IsSessionSupported(mode));
        let state = self.state.borrow();
        let script = &state.script;
        let supported = script.xr_available
            && (mode.kind() == SessionKind::Inline || script.immersive_supported);
        Box::pin(ready(supported))
    }

    fn request_session(
        &self,
        mode: SessionMode,
        required_features: &[&str],
    ) -> HostFuture<Result<FakeSession, XrError>> {
        self.record(HostCall::RequestSession {
            mode,
            features: required_features.iter().map(|f| f.to_string()).collect(),
        });
        let mut state = self.state.borrow_mut();
        let script = &state.script;
        let result = if !script.xr_available {
            Err(XrError::CapabilityUnsupported)
        } else if mode.kind() == SessionKind::Immersive
            && (script.deny_sessions || !script.immersive_supported)
        {
            Err(XrError::SessionRequestDenied(format!("{mode} refused")))
        } else {
            Ok(FakeSession {
                id: state.next_id(),
                mode,
            })
        };
        if !self.hold_requests.get() {
            return Box::pin(ready(result));
        }
        let held = Rc::clone(&self.hold_requests);
        let mut result = Some(result);
        Box::pin(poll_fn(move |_| {
            if held.get() {
                return Poll::Pending;
            }
            match result.take() {
                Some(result) => Poll::Ready(result),
                None => Poll::Pending,
            }
        }))
    }

    fn request_reference_space(
        &self,
        session: &FakeSession,
        kind: ReferenceSpaceKind,
    ) -> HostFuture<Result<FakeSpace, XrError>> {
        self.record(HostCall::RequestReferenceSpace {
            session: *session,
            kind,
        });
        let mut state = self.state.borrow_mut();
        let result = if state.script.denied_spaces.contains(&kind) {
            Err(XrError::ReferenceSpaceUnavailable {
                kind,
                reason: "feature not granted".into(),
            })
        } else {
            Ok(FakeSpace {
                id: state.next_id(),
                session: *session,
                kind,
                height: 0.0,
            })
        };
        Box::pin(ready(result))
    }

    fn offset_reference_space(&self, space: &FakeSpace, height: f32) -> FakeSpace {
        FakeSpace {
            height,
            ..space.clone()
        }
    }

    fn create_graphics_context(&self) -> Result<FakeContext, XrError> {
        self.record(HostCall::CreateGraphicsContext);
        let mut state = self.state.borrow_mut();
        if state.script.fail_context {
            return Err(XrError::RenderContextUnavailable("webgl2 unavailable".into()));
        }
        state.contexts_created += 1;
        Ok(FakeContext {
            id: state.next_id(),
        })
    }

    fn update_render_state(&self, session: &FakeSession, _context: &FakeContext) -> Result<(), XrError> {
        self.record(HostCall::UpdateRenderState(*session));
        Ok(())
    }

    fn listen(&self, session: &FakeSession, events: SessionEvents<Self>) {
        self.record(HostCall::Listen(*session));
        self.state.borrow_mut().listeners.push((*session, events));
    }

    fn request_animation_frame(&self, session: &FakeSession, callback: FrameCallback<Self>) {
        self.record(HostCall::RequestAnimationFrame(*session));
        self.state
            .borrow_mut()
            .frame_callbacks
            .push((*session, callback));
    }

    fn end_session(&self, session: &FakeSession) {
        self.record(HostCall::EndSession(*session));
        let mut state = self.state.borrow_mut();
        if !state.end_requests.contains(session) {
            state.end_requests.push_back(*session);
        }
    }

    fn frame_session(&self, frame: &FakeFrame) -> FakeSession {
        frame.session
    }

    fn viewer_pose(&self, _frame: &FakeFrame, space: &FakeSpace) -> Option<FakePose> {
        self.state.borrow().pose_available.then(|| FakePose {
            space: space.clone(),
        })
    }

    fn viewer_yaw(&self) -> f32 {
        self.state.borrow().yaw
    }

    fn is_fullscreen(&self) -> bool {
        self.state.borrow().fullscreen
    }

    fn set_fullscreen(&self, fullscreen: bool) -> Result<(), XrError> {
        self.record(HostCall::SetFullscreen(fullscreen));
        let mut state = self.state.borrow_mut();
        if state.script.fail_fullscreen {
            return Err(XrError::FullscreenUnavailable("fullscreen refused".into()));
        }
        state.fullscreen = fullscreen;
        Ok(())
    }

    fn set_entry_button_visible(&self, visible: bool) {
        self.record(HostCall::SetEntryButtonVisible(visible));
        self.state.borrow_mut().entry_button_visible = visible;
    }

    fn spawn_local(&self, task: LocalTask) {
        self.tasks.borrow_mut().push_back(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immersive_refused_without_support() {
        let host = FakeHost::new().without_immersive_support();
        let result = pollster::block_on(host.request_session(SessionMode::ImmersiveVr, &[]));
        assert!(matches!(result, Err(XrError::SessionRequestDenied(_))));
        let inline = pollster::block_on(host.request_session(SessionMode::Inline, &[]));
        assert!(inline.is_ok());
    }

    #[test]
    fn denied_space_reports_kind() {
        let host = FakeHost::new().deny_reference_space(ReferenceSpaceKind::LocalFloor);
        let session = pollster::block_on(host.request_session(SessionMode::ImmersiveVr, &[])).unwrap();
        let err = pollster::block_on(
            host.request_reference_space(&session, ReferenceSpaceKind::LocalFloor),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            XrError::ReferenceSpaceUnavailable {
                kind: ReferenceSpaceKind::LocalFloor,
                ..
            }
        ));
    }

    #[test]
    fn frames_are_one_shot() {
        let host = FakeHost::new();
        let session = FakeSession {
            id: 1,
            mode: SessionMode::Inline,
        };
        let hits = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&hits);
        host.request_animation_frame(&session, Rc::new(move |_: f64, _: &FakeFrame| *sink.borrow_mut() += 1));
        assert_eq!(host.fire_frame(session, 1.0), 1);
        assert_eq!(host.fire_frame(session, 2.0), 0);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn spawned_tasks_run_in_order() {
        let host = FakeHost::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let order = Rc::clone(&order);
            host.spawn_local(Box::pin(async move { order.borrow_mut().push(i) }));
        }
        host.run_until_stalled();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }
}
