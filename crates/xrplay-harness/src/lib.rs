#![forbid(unsafe_code)]

//! Deterministic fixtures for xrplay tests.
//!
//! A scripted [`FakeHost`] and a [`RecordingScene`] stand in for the browser
//! so the session lifecycle and frame loop can be driven step by step from
//! native tests.
//!
//! ```
//! use xrplay_core::{SessionKind, XrOptions};
//! use xrplay_harness::Fixture;
//!
//! let fx = Fixture::new(XrOptions::default());
//! fx.app.run();
//! fx.host.run_until_stalled();
//! assert!(fx.app.reference_space(SessionKind::Inline).is_some());
//! ```

pub mod fake_host;
pub mod recording_scene;

pub use fake_host::{
    FakeContext, FakeFrame, FakeHost, FakeInputSource, FakePose, FakeSession, FakeSpace, HostCall,
};
pub use recording_scene::{NodeId, RecordingScene, SceneEvent};

use xrplay_core::XrOptions;
use xrplay_runtime::XrApp;

/// Application under test.
pub type TestApp = XrApp<FakeHost, RecordingScene>;

/// An application wired to a fake host and a recording scene, with handles
/// to both kept for inspection.
pub struct Fixture {
    pub app: TestApp,
    pub host: FakeHost,
    pub scene: RecordingScene,
}

impl Fixture {
    /// # Panics
    ///
    /// Panics if `options` fail validation.
    #[must_use]
    pub fn new(options: XrOptions) -> Self {
        Self::with_host(FakeHost::new(), options)
    }

    /// # Panics
    ///
    /// Panics if `options` fail validation.
    #[must_use]
    pub fn with_host(host: FakeHost, options: XrOptions) -> Self {
        init_test_logging();
        let scene = RecordingScene::new();
        let app = match XrApp::new(host.clone(), scene.clone(), options) {
            Ok(app) => app,
            Err(err) => panic!("fixture options rejected: {err}"),
        };
        Self { app, host, scene }
    }
}

/// Route `tracing` output to the test writer, filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
