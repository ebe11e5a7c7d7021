#![forbid(unsafe_code)]

//! Reference-space resolution.
//!
//! Immersive sessions track in the configured space kind; inline sessions
//! always use `viewer`, wrapped in an [`InlineViewerHelper`] that supplies an
//! assumed eye height when the configuration expects a floor-relative frame.
//! There is no fallback: a refused kind fails session startup.

use xrplay_core::{ReferenceSpaceKind, SessionKind, XrError};

use crate::host::XrHost;

/// Eye height assumed for inline sessions configured for a floor space.
pub const INLINE_EYE_HEIGHT: f32 = 1.6;

/// Inline-session view state layered over the host's `viewer` space.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineViewerHelper<S> {
    base: S,
    height: f32,
}

impl<S> InlineViewerHelper<S> {
    /// Wrap `base`, faking floor calibration if `configured` needs it.
    pub fn new(base: S, configured: ReferenceSpaceKind) -> Self {
        let height = if configured.is_floor_relative() {
            INLINE_EYE_HEIGHT
        } else {
            0.0
        };
        Self { base, height }
    }

    pub fn set_height(&mut self, height: f32) {
        self.height = height;
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.height
    }

    /// The host's unadjusted space.
    #[must_use]
    pub fn base_space(&self) -> &S {
        &self.base
    }
}

/// A session's resolved space, stored for the session's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSpace<S> {
    Immersive(S),
    Inline {
        helper: InlineViewerHelper<S>,
        /// `helper`'s base space lowered by its eye height.
        space: S,
    },
}

impl<S> ResolvedSpace<S> {
    /// The space poses and input are evaluated in.
    #[must_use]
    pub fn space(&self) -> &S {
        match self {
            Self::Immersive(space) | Self::Inline { space, .. } => space,
        }
    }

    #[must_use]
    pub fn inline_helper(&self) -> Option<&InlineViewerHelper<S>> {
        match self {
            Self::Immersive(_) => None,
            Self::Inline { helper, .. } => Some(helper),
        }
    }
}

/// Picks and requests the right space kind for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceSpaceResolver {
    configured: ReferenceSpaceKind,
}

impl ReferenceSpaceResolver {
    #[must_use]
    pub const fn new(configured: ReferenceSpaceKind) -> Self {
        Self { configured }
    }

    /// Kind requested from the host for a session of `kind`.
    #[must_use]
    pub const fn requested_kind(&self, kind: SessionKind) -> ReferenceSpaceKind {
        match kind {
            SessionKind::Immersive => self.configured,
            SessionKind::Inline => ReferenceSpaceKind::Viewer,
        }
    }

    /// Request the space for `session`.
    ///
    /// Any host failure is reported as
    /// [`XrError::ReferenceSpaceUnavailable`] for the requested kind.
    pub async fn resolve<H: XrHost>(
        &self,
        host: &H,
        session: &H::Session,
        kind: SessionKind,
    ) -> Result<ResolvedSpace<H::Space>, XrError> {
        let requested = self.requested_kind(kind);
        let space = host
            .request_reference_space(session, requested)
            .await
            .map_err(|e| match e {
                XrError::ReferenceSpaceUnavailable { .. } => e,
                other => XrError::ReferenceSpaceUnavailable {
                    kind: requested,
                    reason: other.to_string(),
                },
            })?;

        Ok(match kind {
            SessionKind::Immersive => ResolvedSpace::Immersive(space),
            SessionKind::Inline => {
                let helper = InlineViewerHelper::new(space, self.configured);
                let space = host.offset_reference_space(helper.base_space(), helper.height());
                ResolvedSpace::Inline { helper, space }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immersive_uses_configured_kind() {
        let resolver = ReferenceSpaceResolver::new(ReferenceSpaceKind::LocalFloor);
        assert_eq!(
            resolver.requested_kind(SessionKind::Immersive),
            ReferenceSpaceKind::LocalFloor
        );
    }

    #[test]
    fn inline_always_uses_viewer() {
        let resolver = ReferenceSpaceResolver::new(ReferenceSpaceKind::BoundedFloor);
        assert_eq!(
            resolver.requested_kind(SessionKind::Inline),
            ReferenceSpaceKind::Viewer
        );
    }

    #[test]
    fn floor_configuration_fakes_eye_height() {
        let helper = InlineViewerHelper::new("viewer", ReferenceSpaceKind::LocalFloor);
        assert_eq!(helper.height(), INLINE_EYE_HEIGHT);
        let helper = InlineViewerHelper::new("viewer", ReferenceSpaceKind::BoundedFloor);
        assert_eq!(helper.height(), INLINE_EYE_HEIGHT);
    }

    #[test]
    fn non_floor_configuration_keeps_zero_height() {
        let mut helper = InlineViewerHelper::new("viewer", ReferenceSpaceKind::Local);
        assert_eq!(helper.height(), 0.0);
        helper.set_height(1.2);
        assert_eq!(helper.height(), 1.2);
        assert_eq!(*helper.base_space(), "viewer");
    }

    #[test]
    fn resolved_space_accessors() {
        let immersive = ResolvedSpace::Immersive(7);
        assert_eq!(*immersive.space(), 7);
        assert!(immersive.inline_helper().is_none());

        let inline = ResolvedSpace::Inline {
            helper: InlineViewerHelper::new(1, ReferenceSpaceKind::LocalFloor),
            space: 2,
        };
        assert_eq!(*inline.space(), 2);
        assert_eq!(inline.inline_helper().map(|h| *h.base_space()), Some(1));
    }
}
