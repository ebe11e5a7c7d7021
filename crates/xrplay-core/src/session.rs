#![forbid(unsafe_code)]

//! Session and reference-space vocabulary.
//!
//! The string forms match the WebXR enumerations (`"immersive-vr"`,
//! `"local-floor"`, ...) so they can be handed to the host unchanged.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Whether a session renders in-page or on a head-mounted display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    /// Magic-window presentation inside the page.
    Inline,
    /// Fully tracked head-mounted presentation.
    Immersive,
}

impl SessionKind {
    /// Both kinds, in table order.
    pub const ALL: [SessionKind; 2] = [SessionKind::Inline, SessionKind::Immersive];

    /// Stable slot index for per-kind tables.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Inline => 0,
            Self::Immersive => 1,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Immersive => "immersive",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session mode string passed to the host when requesting a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    Inline,
    #[default]
    ImmersiveVr,
    ImmersiveAr,
}

impl SessionMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::ImmersiveVr => "immersive-vr",
            Self::ImmersiveAr => "immersive-ar",
        }
    }

    /// The session kind a session of this mode runs as.
    #[must_use]
    pub const fn kind(self) -> SessionKind {
        match self {
            Self::Inline => SessionKind::Inline,
            Self::ImmersiveVr | Self::ImmersiveAr => SessionKind::Immersive,
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "inline" => Ok(Self::Inline),
            "immersive-vr" => Ok(Self::ImmersiveVr),
            "immersive-ar" => Ok(Self::ImmersiveAr),
            other => Err(ConfigError::UnknownSessionMode(other.to_string())),
        }
    }
}

/// Coordinate frame convention used to interpret tracked poses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceSpaceKind {
    /// Head-locked; always available.
    Viewer,
    /// Origin near the viewer's starting position.
    #[default]
    Local,
    /// Like `Local`, with the origin on the floor.
    LocalFloor,
    /// Floor-relative with a known safe boundary.
    BoundedFloor,
    /// Large-scale tracking without a fixed origin.
    Unbounded,
}

impl ReferenceSpaceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Local => "local",
            Self::LocalFloor => "local-floor",
            Self::BoundedFloor => "bounded-floor",
            Self::Unbounded => "unbounded",
        }
    }

    /// Whether poses in this space are measured from the floor.
    ///
    /// Inline sessions have no floor calibration, so callers fake an eye
    /// height for these kinds.
    #[must_use]
    pub const fn is_floor_relative(self) -> bool {
        matches!(self, Self::LocalFloor | Self::BoundedFloor)
    }
}

impl fmt::Display for ReferenceSpaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceSpaceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "viewer" => Ok(Self::Viewer),
            "local" => Ok(Self::Local),
            "local-floor" => Ok(Self::LocalFloor),
            "bounded-floor" => Ok(Self::BoundedFloor),
            "unbounded" => Ok(Self::Unbounded),
            other => Err(ConfigError::UnknownReferenceSpace(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_strings_match_webxr() {
        assert_eq!(SessionMode::Inline.as_str(), "inline");
        assert_eq!(SessionMode::ImmersiveVr.as_str(), "immersive-vr");
        assert_eq!(SessionMode::ImmersiveAr.as_str(), "immersive-ar");
    }

    #[test]
    fn mode_kind() {
        assert_eq!(SessionMode::Inline.kind(), SessionKind::Inline);
        assert_eq!(SessionMode::ImmersiveVr.kind(), SessionKind::Immersive);
        assert_eq!(SessionMode::ImmersiveAr.kind(), SessionKind::Immersive);
    }

    #[test]
    fn reference_space_parse() {
        assert_eq!(
            "local-floor".parse::<ReferenceSpaceKind>(),
            Ok(ReferenceSpaceKind::LocalFloor)
        );
        assert_eq!(
            " bounded-floor ".parse::<ReferenceSpaceKind>(),
            Ok(ReferenceSpaceKind::BoundedFloor)
        );
        assert_eq!(
            "stage".parse::<ReferenceSpaceKind>(),
            Err(ConfigError::UnknownReferenceSpace("stage".into()))
        );
    }

    #[test]
    fn floor_relative_kinds() {
        assert!(ReferenceSpaceKind::LocalFloor.is_floor_relative());
        assert!(ReferenceSpaceKind::BoundedFloor.is_floor_relative());
        assert!(!ReferenceSpaceKind::Local.is_floor_relative());
        assert!(!ReferenceSpaceKind::Viewer.is_floor_relative());
        assert!(!ReferenceSpaceKind::Unbounded.is_floor_relative());
    }

    #[test]
    fn kind_indices_are_distinct() {
        assert_ne!(SessionKind::Inline.index(), SessionKind::Immersive.index());
        for kind in SessionKind::ALL {
            assert_eq!(SessionKind::ALL[kind.index()], kind);
        }
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&ReferenceSpaceKind::LocalFloor).unwrap();
        assert_eq!(json, "\"local-floor\"");
        let mode: SessionMode = serde_json::from_str("\"immersive-ar\"").unwrap();
        assert_eq!(mode, SessionMode::ImmersiveAr);
    }
}
