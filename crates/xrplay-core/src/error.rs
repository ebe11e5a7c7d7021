#![forbid(unsafe_code)]

//! Error taxonomy.
//!
//! [`XrError`] covers everything a session request can fail with. None of
//! these are retried internally: they propagate to whichever caller started
//! the action, and the embedding page decides how to present them.
//!
//! [`ConfigError`] is raised while building [`crate::XrOptions`] and never
//! after construction.

use core::fmt;

use crate::session::{ReferenceSpaceKind, SessionKind};

/// Failures surfaced by the XR session runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XrError {
    /// The browser or device has no XR runtime. Non-fatal: only the
    /// immersive entry point is disabled.
    CapabilityUnsupported,
    /// The host refused a session (unsupported device, permission denied,
    /// required feature unavailable).
    SessionRequestDenied(String),
    /// The requested tracking mode is not offered for this session.
    ReferenceSpaceUnavailable {
        kind: ReferenceSpaceKind,
        reason: String,
    },
    /// Graphics context creation failed. Fatal for the application.
    RenderContextUnavailable(String),
    /// An immersive request is already pending.
    RequestInFlight,
    /// A session of this kind is already running.
    SessionAlreadyActive(SessionKind),
    /// The session ended while it was still starting.
    SessionEnded,
    /// The page refused to enter or leave full screen.
    FullscreenUnavailable(String),
}

impl XrError {
    /// Whether the application can keep running after this error.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RenderContextUnavailable(_))
    }
}

impl fmt::Display for XrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapabilityUnsupported => write!(f, "XR is not supported on this device"),
            Self::SessionRequestDenied(reason) => write!(f, "session request denied: {reason}"),
            Self::ReferenceSpaceUnavailable { kind, reason } => {
                write!(f, "reference space '{kind}' unavailable: {reason}")
            }
            Self::RenderContextUnavailable(reason) => {
                write!(f, "graphics context unavailable: {reason}")
            }
            Self::RequestInFlight => write!(f, "an immersive session request is already pending"),
            Self::SessionAlreadyActive(kind) => write!(f, "an {kind} session is already active"),
            Self::SessionEnded => write!(f, "session ended before it finished starting"),
            Self::FullscreenUnavailable(reason) => write!(f, "full screen unavailable: {reason}"),
        }
    }
}

impl std::error::Error for XrError {}

/// Errors from building or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Malformed JSON options.
    Json(String),
    /// Unrecognized session mode string.
    UnknownSessionMode(String),
    /// Unrecognized reference space string.
    UnknownReferenceSpace(String),
    /// A boolean option had a value that is not a recognized spelling.
    InvalidBool { key: String, value: String },
    /// A numeric option could not be parsed or is out of range.
    InvalidNumber { key: &'static str, value: String },
    /// `immersiveMode` named a non-immersive mode.
    NotImmersive(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "options JSON parse error: {msg}"),
            Self::UnknownSessionMode(mode) => write!(f, "unknown session mode: {mode}"),
            Self::UnknownReferenceSpace(kind) => write!(f, "unknown reference space: {kind}"),
            Self::InvalidBool { key, value } => {
                write!(f, "option {key} expects a boolean, got {value:?}")
            }
            Self::InvalidNumber { key, value } => {
                write!(f, "option {key} expects a positive number, got {value:?}")
            }
            Self::NotImmersive(mode) => write!(f, "immersiveMode must be immersive, got {mode}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_space() {
        let err = XrError::ReferenceSpaceUnavailable {
            kind: ReferenceSpaceKind::LocalFloor,
            reason: "NotSupportedError".into(),
        };
        assert_eq!(
            err.to_string(),
            "reference space 'local-floor' unavailable: NotSupportedError"
        );
    }

    #[test]
    fn only_render_context_is_fatal() {
        assert!(XrError::RenderContextUnavailable("no webgl".into()).is_fatal());
        assert!(!XrError::CapabilityUnsupported.is_fatal());
        assert!(!XrError::SessionRequestDenied("user".into()).is_fatal());
        assert!(!XrError::RequestInFlight.is_fatal());
    }
}
