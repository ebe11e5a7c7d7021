//! Property-based invariant tests for the application under arbitrary
//! interleavings of page and host events.
//!
//! 1. While options are visible the scene holds exactly the control nodes,
//!    in control order; while hidden it holds none.
//! 2. Every live session has exactly one pending frame callback.
//! 3. Frames only count while their session is live.
//! 4. At most one immersive session is live, and the active handle matches it.

use proptest::prelude::*;
use xrplay_core::{SessionKind, XrOptions};
use xrplay_harness::Fixture;
use xrplay_runtime::ButtonDescriptor;

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    AddButtons(usize),
    ToggleOptions,
    RequestImmersive,
    EndImmersive,
    DeliverEnds,
    Frame(SessionKind),
    Select(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..=5).prop_map(Op::AddButtons),
        Just(Op::ToggleOptions),
        Just(Op::RequestImmersive),
        Just(Op::EndImmersive),
        Just(Op::DeliverEnds),
        Just(Op::Frame(SessionKind::Inline)),
        Just(Op::Frame(SessionKind::Immersive)),
        (0usize..8).prop_map(Op::Select),
    ]
}

fn apply(fx: &Fixture, op: &Op, last_immersive: &mut Option<xrplay_harness::FakeSession>) {
    match op {
        Op::AddButtons(n) => {
            let descriptors = (0..*n)
                .map(|i| ButtonDescriptor::new(format!("{i}.png"), |h| h.mark_success()))
                .collect();
            fx.app.add_permission_buttons(descriptors);
        }
        Op::ToggleOptions => {
            fx.app.toggle_options();
        }
        Op::RequestImmersive => {
            if let Ok(session) = fx.host.block_on(fx.app.request_immersive_session()) {
                *last_immersive = Some(session);
            }
        }
        Op::EndImmersive => {
            fx.app.end_active_session();
        }
        Op::DeliverEnds => {
            fx.host.deliver_end_events();
        }
        Op::Frame(kind) => {
            let session = match kind {
                SessionKind::Inline => fx.app.session(SessionKind::Inline),
                // Includes already-ended sessions with a stale callback.
                SessionKind::Immersive => *last_immersive,
            };
            if let Some(session) = session {
                fx.host.fire_frame(session, 16.0);
            }
        }
        Op::Select(i) => {
            if let Some(session) = fx.app.session(SessionKind::Inline) {
                fx.host.select(session, fx.app.control_node(*i));
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1-4. Invariants after every step
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn invariants_hold_for_any_sequence(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let fx = Fixture::new(XrOptions::default());
        fx.app.run();
        fx.host.run_until_stalled();
        let mut last_immersive = None;

        for op in &ops {
            let before = SessionKind::ALL.map(|k| fx.app.frame_count(k));
            let live_before = SessionKind::ALL.map(|k| fx.app.session(k).is_some());

            apply(&fx, op, &mut last_immersive);

            // 1
            let nodes: Vec<_> = (0..fx.app.control_count())
                .map(|i| fx.app.control_node(i).unwrap())
                .collect();
            if fx.app.options_visible() {
                prop_assert_eq!(fx.scene.attached(), nodes);
            } else {
                prop_assert!(fx.scene.attached().is_empty());
            }

            // 2
            for kind in SessionKind::ALL {
                if let Some(session) = fx.app.session(kind) {
                    prop_assert_eq!(fx.host.pending_frames(session), 1);
                    prop_assert!(fx.app.is_frame_armed(kind));
                }
            }

            // 3
            for kind in SessionKind::ALL {
                let after = fx.app.frame_count(kind);
                if !live_before[kind.index()] {
                    prop_assert_eq!(after, before[kind.index()]);
                }
                prop_assert!(after <= before[kind.index()] + 1);
            }

            // 4
            prop_assert_eq!(fx.app.active_session(), fx.app.session(SessionKind::Immersive));
        }
    }
}
