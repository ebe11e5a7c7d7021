#![forbid(unsafe_code)]

//! Core: session vocabulary, configuration, and errors.
//!
//! # Role in xrplay
//! `xrplay-core` is the leaf crate. It owns the value types every other
//! layer speaks in: which kind of XR session is running, which reference
//! space it tracks in, how the application was configured, and how things
//! fail.
//!
//! # How it fits in the system
//! The layout engine (`xrplay-layout`) and the session runtime
//! (`xrplay-runtime`) consume these types. Nothing here touches a browser
//! or a graphics API, so the whole crate is usable from native tests.

pub mod config;
pub mod error;
pub mod session;

pub use config::{IconSet, XrOptions};
pub use error::{ConfigError, XrError};
pub use session::{ReferenceSpaceKind, SessionKind, SessionMode};
