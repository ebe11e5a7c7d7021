#![forbid(unsafe_code)]

//! Session lifecycle end-to-end tests.
//!
//! Drives `XrApp` against the scripted host: startup, immersive requests,
//! reference-space failures, graphics-context reuse, and teardown.
//!
//! # Running
//!
//! ```sh
//! cargo test -p xrplay-harness --test session_lifecycle
//! ```

use std::future::Future;
use std::pin::pin;
use std::task::{Context, Poll, Waker};

use pretty_assertions::assert_eq;
use xrplay_core::{ReferenceSpaceKind, SessionKind, SessionMode, XrError, XrOptions};
use xrplay_harness::{FakeHost, Fixture, HostCall, SceneEvent};
use xrplay_runtime::{INLINE_EYE_HEIGHT, LifecyclePhase};

fn immersive_only() -> XrOptions {
    XrOptions {
        inline: false,
        ..XrOptions::default()
    }
}

// ============================================================================
// Startup
// ============================================================================

#[test]
fn run_starts_inline_session_with_viewer_space() {
    let fx = Fixture::new(XrOptions::default());
    assert_eq!(fx.app.phase(), LifecyclePhase::Uninitialized);

    fx.app.run();
    assert_eq!(fx.app.phase(), LifecyclePhase::AwaitingCapabilityCheck);
    fx.host.run_until_stalled();

    assert_eq!(fx.app.phase(), LifecyclePhase::InlineActive);
    assert!(fx.app.immersive_supported());
    let space = fx.app.reference_space(SessionKind::Inline).unwrap();
    assert_eq!(space.kind, ReferenceSpaceKind::Viewer);
    assert_eq!(space.height, 0.0);
    assert!(fx.app.is_frame_armed(SessionKind::Inline));
    assert!(fx.app.active_session().is_none());
}

#[test]
fn inline_floor_configuration_assumes_eye_height() {
    let options = XrOptions {
        reference_space: ReferenceSpaceKind::LocalFloor,
        ..XrOptions::default()
    };
    let fx = Fixture::new(options);
    fx.app.run();
    fx.host.run_until_stalled();

    assert_eq!(fx.app.inline_eye_height(), Some(INLINE_EYE_HEIGHT));
    let space = fx.app.reference_space(SessionKind::Inline).unwrap();
    assert_eq!(space.kind, ReferenceSpaceKind::Viewer);
    assert_eq!(space.height, INLINE_EYE_HEIGHT);
}

#[test]
fn inline_disabled_settles_idle() {
    let fx = Fixture::new(immersive_only());
    fx.app.run();
    fx.host.run_until_stalled();

    assert_eq!(fx.app.phase(), LifecyclePhase::Idle);
    assert!(fx.app.session(SessionKind::Inline).is_none());
    assert_eq!(
        fx.host.count_calls(|c| matches!(c, HostCall::RequestSession { .. })),
        0
    );
}

#[test]
fn missing_xr_is_not_fatal() {
    let fx = Fixture::with_host(FakeHost::new().without_xr(), XrOptions::default());
    fx.app.run();
    fx.host.run_until_stalled();

    assert_eq!(fx.app.phase(), LifecyclePhase::Idle);
    assert!(!fx.app.immersive_supported());
    assert!(fx.host.calls().is_empty());
}

#[test]
fn unsupported_immersive_only_flips_flag() {
    let fx = Fixture::with_host(
        FakeHost::new().without_immersive_support(),
        XrOptions::default(),
    );
    fx.app.run();
    fx.host.run_until_stalled();

    assert!(!fx.app.immersive_supported());
    assert_eq!(fx.app.phase(), LifecyclePhase::InlineActive);
}

#[test]
fn run_twice_is_ignored() {
    let fx = Fixture::new(XrOptions::default());
    fx.app.run();
    fx.app.run();
    fx.host.run_until_stalled();
    assert_eq!(
        fx.host.count_calls(|c| matches!(c, HostCall::IsSessionSupported(_))),
        1
    );
}

// ============================================================================
// Immersive requests
// ============================================================================

#[test]
fn immersive_request_uses_configured_mode_and_features() {
    let options = XrOptions {
        reference_space: ReferenceSpaceKind::LocalFloor,
        ..immersive_only()
    };
    let fx = Fixture::new(options);
    fx.app.run();
    fx.host.run_until_stalled();

    let session = fx.host.block_on(fx.app.request_immersive_session()).unwrap();
    assert_eq!(session.mode, SessionMode::ImmersiveVr);
    assert_eq!(fx.app.active_session(), Some(session));
    assert_eq!(fx.app.phase(), LifecyclePhase::ImmersiveActive);
    assert!(fx.host.calls().contains(&HostCall::RequestSession {
        mode: SessionMode::ImmersiveVr,
        features: vec!["local-floor".to_string()],
    }));
    let space = fx.app.reference_space(SessionKind::Immersive).unwrap();
    assert_eq!(space.kind, ReferenceSpaceKind::LocalFloor);
}

#[test]
fn denied_request_is_surfaced() {
    let fx = Fixture::with_host(FakeHost::new().deny_sessions(), immersive_only());
    fx.app.run();
    fx.host.run_until_stalled();

    let err = fx
        .host
        .block_on(fx.app.request_immersive_session())
        .unwrap_err();
    assert!(matches!(err, XrError::SessionRequestDenied(_)));
    assert_eq!(fx.app.phase(), LifecyclePhase::Idle);
    assert!(fx.app.active_session().is_none());

    // No automatic retry.
    assert_eq!(
        fx.host.count_calls(|c| matches!(c, HostCall::RequestSession { .. })),
        1
    );
}

#[test]
fn denied_local_floor_never_reaches_the_frame_loop() {
    let options = XrOptions {
        reference_space: ReferenceSpaceKind::LocalFloor,
        ..immersive_only()
    };
    let host = FakeHost::new().deny_reference_space(ReferenceSpaceKind::LocalFloor);
    let fx = Fixture::with_host(host, options);
    fx.app.run();
    fx.host.run_until_stalled();

    let err = fx
        .host
        .block_on(fx.app.request_immersive_session())
        .unwrap_err();
    assert!(matches!(
        err,
        XrError::ReferenceSpaceUnavailable {
            kind: ReferenceSpaceKind::LocalFloor,
            ..
        }
    ));
    assert_eq!(
        fx.host.count_calls(|c| matches!(c, HostCall::RequestAnimationFrame(_))),
        0
    );
    assert!(!fx.app.is_frame_armed(SessionKind::Immersive));
    assert_eq!(fx.scene.count(|e| *e == SceneEvent::StartFrame), 0);
    // The half-started session is handed back to the host.
    assert_eq!(
        fx.host.count_calls(|c| matches!(c, HostCall::EndSession(_))),
        1
    );
    assert!(fx.app.active_session().is_none());
    assert_eq!(fx.app.phase(), LifecyclePhase::Idle);

    // The late end event for the aborted session is harmless.
    assert_eq!(fx.host.deliver_end_events(), 1);
    assert_eq!(fx.app.phase(), LifecyclePhase::Idle);
}

#[test]
fn request_while_in_flight_is_rejected() {
    let fx = Fixture::new(immersive_only());
    fx.app.run();
    fx.host.run_until_stalled();
    fx.host.hold_session_requests();

    let waker = Waker::noop();
    let mut cx = Context::from_waker(waker);
    let mut first = pin!(fx.app.request_immersive_session());
    assert!(first.as_mut().poll(&mut cx).is_pending());
    assert_eq!(fx.app.phase(), LifecyclePhase::ImmersiveRequested);

    let second = fx.host.block_on(fx.app.request_immersive_session());
    assert_eq!(second.unwrap_err(), XrError::RequestInFlight);

    fx.host.release_session_requests();
    let Poll::Ready(first) = first.as_mut().poll(&mut cx) else {
        panic!("released request should complete");
    };
    assert!(first.is_ok());
    assert_eq!(fx.app.phase(), LifecyclePhase::ImmersiveActive);
    assert_eq!(
        fx.host.count_calls(|c| matches!(c, HostCall::RequestSession { .. })),
        1
    );
}

#[test]
fn request_while_active_is_rejected() {
    let fx = Fixture::new(immersive_only());
    fx.app.run();
    fx.host.run_until_stalled();
    fx.host.block_on(fx.app.request_immersive_session()).unwrap();

    let err = fx
        .host
        .block_on(fx.app.request_immersive_session())
        .unwrap_err();
    assert_eq!(err, XrError::SessionAlreadyActive(SessionKind::Immersive));
}

// ============================================================================
// Graphics context
// ============================================================================

#[test]
fn graphics_context_is_created_once() {
    let fx = Fixture::new(XrOptions::default());
    let first = fx.app.graphics_context().unwrap();
    let second = fx.app.graphics_context().unwrap();
    assert_eq!(first, second);
    assert_eq!(fx.host.contexts_created(), 1);

    fx.app.run();
    fx.host.run_until_stalled();
    fx.host.block_on(fx.app.request_immersive_session()).unwrap();
    assert_eq!(fx.host.contexts_created(), 1);
    assert_eq!(
        fx.scene.count(|e| matches!(e, SceneEvent::SetRenderer(_))),
        1
    );
    assert!(fx.app.is_rendering_ready());
}

#[test]
fn context_failure_is_fatal_to_startup() {
    let fx = Fixture::with_host(FakeHost::new().fail_graphics_context(), immersive_only());
    fx.app.run();
    fx.host.run_until_stalled();

    let err = fx
        .host
        .block_on(fx.app.request_immersive_session())
        .unwrap_err();
    assert!(matches!(err, XrError::RenderContextUnavailable(_)));
    assert!(err.is_fatal());
    assert!(!fx.app.is_rendering_ready());
    assert_eq!(
        fx.host.count_calls(|c| matches!(c, HostCall::RequestReferenceSpace { .. })),
        0
    );
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn end_session_is_observed_through_end_event() {
    let fx = Fixture::new(immersive_only());
    fx.app.run();
    fx.host.run_until_stalled();
    let session = fx.host.block_on(fx.app.request_immersive_session()).unwrap();

    assert!(fx.app.end_session(&session));
    // Advisory: nothing changes until the host confirms.
    assert_eq!(fx.app.active_session(), Some(session));
    assert_eq!(fx.app.phase(), LifecyclePhase::ImmersiveActive);

    fx.host.deliver_end_events();
    assert!(fx.app.active_session().is_none());
    assert!(fx.app.reference_space(SessionKind::Immersive).is_none());
    assert!(!fx.app.is_frame_armed(SessionKind::Immersive));
    assert_eq!(fx.app.phase(), LifecyclePhase::Idle);
    assert!(!fx.app.end_session(&session));
}

#[test]
fn external_disconnect_uses_same_path() {
    let fx = Fixture::new(XrOptions::default());
    fx.app.run();
    fx.host.run_until_stalled();
    let session = fx.host.block_on(fx.app.request_immersive_session()).unwrap();

    fx.host.disconnect(session);
    assert!(fx.app.active_session().is_none());
    assert_eq!(fx.app.phase(), LifecyclePhase::InlineActive);

    // A new immersive session can start afterwards.
    let next = fx.host.block_on(fx.app.request_immersive_session()).unwrap();
    assert_ne!(next, session);
    assert_eq!(fx.app.phase(), LifecyclePhase::ImmersiveActive);
}

#[test]
fn end_active_session_without_one_is_noop() {
    let fx = Fixture::new(immersive_only());
    assert!(!fx.app.end_active_session());
    assert!(fx.host.calls().is_empty());
}
