#![forbid(unsafe_code)]

//! Page contract: element ids the player reads and writes, and the parsing
//! of the values it finds there.
//!
//! Kept free of `web-sys` so the rules can be checked by native tests.

use xrplay_core::{ConfigError, XrOptions};

/// Button that enters an immersive session.
pub const ENTRY_BUTTON_ID: &str = "VRButton";

/// Element whose text holds the look control's yaw, in radians.
pub const YAW_ELEMENT_ID: &str = "lookYaw";

/// Canvas created for the shared graphics context.
pub const CANVAS_ID: &str = "main_canvas";

/// Path that runs the page as a guided tour.
pub const TOUR_PATH: &str = "/Tour";

/// Parse the yaw text published by the look control.
///
/// Anything that is not a finite number reads as facing forward.
#[must_use]
pub fn parse_yaw(text: &str) -> f32 {
    match text.trim().parse::<f32>() {
        Ok(yaw) if yaw.is_finite() => yaw,
        _ => 0.0,
    }
}

/// CSS `display` value for the entry button.
#[must_use]
pub const fn entry_button_display(visible: bool) -> &'static str {
    if visible { "block" } else { "none" }
}

/// A signed-in visitor on the tour path gets the guided tour.
#[must_use]
pub fn is_tour_page(path: &str, signed_in: bool) -> bool {
    signed_in && path.trim_end_matches('/') == TOUR_PATH
}

/// Backing-store size for a canvas laid out at `css` pixels.
#[must_use]
pub fn canvas_pixels(css_width: i32, css_height: i32, device_pixel_ratio: f64) -> (u32, u32) {
    let ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio
    } else {
        1.0
    };
    let scale = |css: i32| (f64::from(css.max(0)) * ratio).round() as u32;
    (scale(css_width), scale(css_height))
}

/// Build options from the page's serialized options object and its URL.
///
/// `json` is `None` when the page passed nothing. Query overrides apply
/// last, then the tour flag from the page location.
pub fn resolve_options(
    json: Option<&str>,
    query: &str,
    tour: bool,
) -> Result<XrOptions, ConfigError> {
    let mut options = match json {
        Some(json) => XrOptions::from_json(json)?,
        None => XrOptions::default(),
    };
    options.apply_query(query)?;
    options.guided_tour |= tour;
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use xrplay_core::ReferenceSpaceKind;

    #[test]
    fn yaw_text_is_radians() {
        assert_eq!(parse_yaw("1.25"), 1.25);
        assert_eq!(parse_yaw(" -0.5\n"), -0.5);
    }

    #[test]
    fn unreadable_yaw_faces_forward() {
        assert_eq!(parse_yaw(""), 0.0);
        assert_eq!(parse_yaw("north"), 0.0);
        assert_eq!(parse_yaw("NaN"), 0.0);
        assert_eq!(parse_yaw("inf"), 0.0);
    }

    #[test]
    fn entry_button_display_values() {
        assert_eq!(entry_button_display(true), "block");
        assert_eq!(entry_button_display(false), "none");
    }

    #[test]
    fn tour_needs_path_and_account() {
        assert!(is_tour_page("/Tour", true));
        assert!(is_tour_page("/Tour/", true));
        assert!(!is_tour_page("/Tour", false));
        assert!(!is_tour_page("/tour", true));
        assert!(!is_tour_page("/", true));
    }

    #[test]
    fn canvas_scales_by_pixel_ratio() {
        assert_eq!(canvas_pixels(400, 300, 2.0), (800, 600));
        assert_eq!(canvas_pixels(401, 300, 1.5), (602, 450));
        assert_eq!(canvas_pixels(-5, 10, 0.0), (0, 10));
    }

    #[test]
    fn query_overrides_page_options() {
        let options = resolve_options(
            Some(r#"{"inline":false,"referenceSpace":"local-floor"}"#),
            "?referenceSpace=bounded-floor",
            false,
        )
        .unwrap();
        assert!(!options.inline);
        assert_eq!(options.reference_space, ReferenceSpaceKind::BoundedFloor);
        assert!(!options.guided_tour);
    }

    #[test]
    fn tour_location_enables_tour() {
        let options = resolve_options(None, "", true).unwrap();
        assert!(options.guided_tour);
        assert_eq!(options, XrOptions { guided_tour: true, ..XrOptions::default() });
    }

    #[test]
    fn bad_page_options_are_rejected() {
        assert!(resolve_options(Some(r#"{"inlne":true}"#), "", false).is_err());
        assert!(resolve_options(None, "?inline=maybe", false).is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn yaw_is_always_finite(text in ".{0,24}") {
                prop_assert!(parse_yaw(&text).is_finite());
            }

            #[test]
            fn canvas_never_shrinks_below_css(w in 0i32..4096, h in 0i32..4096, ratio in 1.0f64..4.0) {
                let (pw, ph) = canvas_pixels(w, h, ratio);
                prop_assert!(pw >= w as u32);
                prop_assert!(ph >= h as u32);
            }
        }
    }
}
