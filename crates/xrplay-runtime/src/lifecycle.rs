#![forbid(unsafe_code)]

//! Session lifecycle: capability probing, session requests, startup and
//! teardown.
//!
//! # Invariants
//!
//! - At most one inline and one immersive session are live at a time.
//! - At most one immersive request is in flight; overlapping requests and
//!   requests made while an immersive session runs are rejected.
//! - The frame loop is armed only after the reference space resolved and
//!   only if the session is still live at that point.
//! - Host-initiated and page-initiated endings both go through
//!   `on_session_ended`, which is idempotent.

use std::rc::Rc;

use tracing::{Instrument, debug, info, info_span, warn};
use xrplay_core::{SessionKind, SessionMode, XrError};

use crate::app::{LifecyclePhase, SessionRecord, XrApp};
use crate::host::{Scene, SessionEvents, XrHost};

impl<H, S> XrApp<H, S>
where
    H: XrHost,
    S: Scene<H> + 'static,
{
    /// Start capability probing and, if configured, the inline session.
    ///
    /// Both run on the host's executor; this returns immediately. Calling it
    /// again has no effect.
    pub fn run(&self) {
        if self.phase() != LifecyclePhase::Uninitialized {
            debug!("run called twice; ignoring");
            return;
        }
        self.transition(LifecyclePhase::AwaitingCapabilityCheck);

        if !self.inner.host.has_xr() {
            warn!(error = %XrError::CapabilityUnsupported, "immersive entry disabled");
            self.on_capability(false);
            return;
        }

        let mode = self.inner.options.immersive_mode;
        let probe = self.inner.host.is_session_supported(mode);
        let weak = self.downgrade();
        self.inner.host.spawn_local(Box::pin(async move {
            let supported = probe.await;
            if let Some(app) = Self::upgrade(&weak) {
                app.on_capability(supported);
            }
        }));

        if self.inner.options.inline {
            let app = self.clone();
            self.inner.host.spawn_local(Box::pin(async move {
                if let Err(err) = app.start_inline_session().await {
                    warn!(%err, "inline session failed to start");
                }
            }));
        }
    }

    fn on_capability(&self, supported: bool) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.capability_checked = true;
            state.immersive_supported = supported;
        }
        info!(
            mode = %self.inner.options.immersive_mode,
            supported,
            "immersive capability probed"
        );
        self.settle();
    }

    async fn start_inline_session(&self) -> Result<H::Session, XrError> {
        let session = self
            .inner
            .host
            .request_session(SessionMode::Inline, &[])
            .await?;
        self.start_session(session.clone(), SessionKind::Inline)
            .await?;
        Ok(session)
    }

    /// Request and start an immersive session in the configured mode.
    ///
    /// Call from a user gesture. Fails with `RequestInFlight` while another
    /// request is pending and `SessionAlreadyActive` while one runs.
    pub async fn request_immersive_session(&self) -> Result<H::Session, XrError> {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.immersive_request_in_flight {
                warn!("immersive request already in flight; rejecting");
                return Err(XrError::RequestInFlight);
            }
            if state.record(SessionKind::Immersive).is_some() {
                return Err(XrError::SessionAlreadyActive(SessionKind::Immersive));
            }
            state.immersive_request_in_flight = true;
        }
        self.settle();

        let result = self.request_and_start_immersive().await;

        self.inner.state.borrow_mut().immersive_request_in_flight = false;
        self.settle();
        if let Err(err) = &result {
            warn!(%err, "immersive session request failed");
        }
        result
    }

    async fn request_and_start_immersive(&self) -> Result<H::Session, XrError> {
        let mode = self.inner.options.immersive_mode;
        let features = self.inner.options.required_features();
        debug!(%mode, ?features, "requesting immersive session");
        let session = self.inner.host.request_session(mode, &features).await?;

        self.inner.state.borrow_mut().active_immersive = Some(session.clone());
        if let Err(err) = self
            .start_session(session.clone(), SessionKind::Immersive)
            .await
        {
            let mut state = self.inner.state.borrow_mut();
            if state.active_immersive.as_ref() == Some(&session) {
                state.active_immersive = None;
            }
            return Err(err);
        }
        Ok(session)
    }

    /// Wire up `session` and start its frame loop.
    pub async fn start_session(&self, session: H::Session, kind: SessionKind) -> Result<(), XrError> {
        let span = info_span!("start_session", %kind);
        self.start_session_inner(session, kind).instrument(span).await
    }

    async fn start_session_inner(&self, session: H::Session, kind: SessionKind) -> Result<(), XrError> {
        if let Err(err) = self.register_session(&session, kind) {
            let existing = self.session(kind);
            if existing.as_ref() != Some(&session) {
                self.inner.host.end_session(&session);
            }
            return Err(err);
        }
        self.listen(&session);

        if let Err(err) = self.prepare_rendering(&session) {
            self.abort_start(&session, kind, &err);
            return Err(err);
        }

        let resolved = match self
            .inner
            .resolver
            .resolve(&self.inner.host, &session, kind)
            .await
        {
            Ok(resolved) => resolved,
            Err(err) => {
                self.abort_start(&session, kind, &err);
                return Err(err);
            }
        };

        {
            let mut state = self.inner.state.borrow_mut();
            let Some(record) = state.sessions[kind.index()]
                .as_mut()
                .filter(|r| r.session == session)
            else {
                debug!("session ended while resolving its reference space");
                return Err(XrError::SessionEnded);
            };
            record.space = Some(resolved);
        }

        self.schedule_frame(&session, kind);
        info!("session started");
        self.settle();
        Ok(())
    }

    fn register_session(&self, session: &H::Session, kind: SessionKind) -> Result<(), XrError> {
        let mut state = self.inner.state.borrow_mut();
        let slot = &mut state.sessions[kind.index()];
        if slot.is_some() {
            return Err(XrError::SessionAlreadyActive(kind));
        }
        *slot = Some(SessionRecord {
            session: session.clone(),
            space: None,
        });
        Ok(())
    }

    fn listen(&self, session: &H::Session) {
        let end = self.downgrade();
        let select = self.downgrade();
        let events = SessionEvents::<H> {
            on_end: Rc::new(move |session: &H::Session| {
                if let Some(app) = Self::upgrade(&end) {
                    app.on_session_ended(session);
                }
            }),
            on_select: Rc::new(move |source: &H::InputSource, frame: &H::Frame| {
                if let Some(app) = Self::upgrade(&select) {
                    app.on_select(source, frame);
                }
            }),
        };
        self.inner.host.listen(session, events);
    }

    fn prepare_rendering(&self, session: &H::Session) -> Result<(), XrError> {
        let context = self.graphics_context()?;
        self.inner
            .scene
            .borrow_mut()
            .use_profile_controller_meshes(session);
        self.inner.host.update_render_state(session, &context)
    }

    /// Forget a session that failed to start and ask the host to end it.
    fn abort_start(&self, session: &H::Session, kind: SessionKind, err: &XrError) {
        warn!(%err, fatal = err.is_fatal(), "session startup failed; ending session");
        self.forget_session(session);
        self.inner.scheduler.borrow_mut().disarm(kind);
        self.inner.host.end_session(session);
        self.settle();
    }

    /// Drop `session`'s record. Returns its kind if it was live.
    fn forget_session(&self, session: &H::Session) -> Option<SessionKind> {
        let kind = self.kind_of(session);
        let mut state = self.inner.state.borrow_mut();
        if let Some(kind) = kind {
            state.sessions[kind.index()] = None;
        }
        if state.active_immersive.as_ref() == Some(session) {
            state.active_immersive = None;
        }
        kind
    }

    /// Ask the host to end `session`. Returns `false` if it is not live.
    ///
    /// Termination is observed through the session's end event.
    pub fn end_session(&self, session: &H::Session) -> bool {
        if self.kind_of(session).is_none() {
            return false;
        }
        debug!(?session, "requesting session end");
        self.inner.host.end_session(session);
        true
    }

    /// End the running immersive session, if any.
    pub fn end_active_session(&self) -> bool {
        match self.active_session() {
            Some(session) => self.end_session(&session),
            None => false,
        }
    }

    /// Host end-event entry point.
    pub(crate) fn on_session_ended(&self, session: &H::Session) {
        let Some(kind) = self.forget_session(session) else {
            debug!(?session, "end event for a session that is not live");
            return;
        };
        self.inner.scheduler.borrow_mut().disarm(kind);
        info!(%kind, "session ended");
        self.transition(LifecyclePhase::Ended);
        self.settle();
    }
}
