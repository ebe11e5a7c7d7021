#![forbid(unsafe_code)]

//! Application configuration.
//!
//! [`XrOptions`] enumerates every recognized option with its default. It can
//! be built three ways:
//!
//! - `XrOptions::default()` for the reference configuration,
//! - [`XrOptions::from_json`] for an options object serialized by the page,
//! - [`XrOptions::from_query`] for `?inline=0&referenceSpace=local-floor`
//!   style overrides read from the page URL.
//!
//! All constructors validate; a value that fails validation never reaches the
//! runtime.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::session::{ReferenceSpaceKind, SessionKind, SessionMode};

const DEFAULT_ICON_BASE: &str = "/assets/media/buttons/";

/// Resolved application options, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct XrOptions {
    /// Request an inline (magic-window) session at startup.
    pub inline: bool,
    /// Mode used for immersive requests.
    pub immersive_mode: SessionMode,
    /// Reference space required by immersive sessions.
    pub reference_space: ReferenceSpaceKind,
    /// Poll input sources every frame.
    pub default_input_handling: bool,
    /// Whether the page should install the WebXR polyfill.
    pub use_polyfill: bool,
    /// Page runs as a guided tour (enables tour select and frame hooks).
    pub guided_tour: bool,
    /// Directory that relative button icon names resolve against.
    pub icon_base: String,
}

impl Default for XrOptions {
    fn default() -> Self {
        Self {
            inline: true,
            immersive_mode: SessionMode::ImmersiveVr,
            reference_space: ReferenceSpaceKind::Local,
            default_input_handling: true,
            use_polyfill: true,
            guided_tour: false,
            icon_base: DEFAULT_ICON_BASE.to_string(),
        }
    }
}

impl XrOptions {
    /// Parse options from a JSON object. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Apply overrides from a URL query string on top of the defaults.
    ///
    /// Unknown keys are ignored since page URLs carry unrelated parameters.
    pub fn from_query(query: &str) -> Result<Self, ConfigError> {
        let mut options = Self::default();
        options.apply_query(query)?;
        Ok(options)
    }

    /// Apply overrides from a URL query string on top of `self`.
    pub fn apply_query(&mut self, query: &str) -> Result<(), ConfigError> {
        let query = query.trim_start_matches('?');
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "inline" => self.inline = parse_flag(key, value)?,
                "immersiveMode" => self.immersive_mode = value.parse()?,
                "referenceSpace" => self.reference_space = value.parse()?,
                "defaultInputHandling" => self.default_input_handling = parse_flag(key, value)?,
                "usePolyfill" => self.use_polyfill = parse_flag(key, value)?,
                "tour" => self.guided_tour = parse_flag(key, value)?,
                _ => {}
            }
        }
        self.validate()
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.immersive_mode.kind() != SessionKind::Immersive {
            return Err(ConfigError::NotImmersive(
                self.immersive_mode.as_str().to_string(),
            ));
        }
        Ok(())
    }

    /// Features an immersive request must be granted.
    #[must_use]
    pub fn required_features(&self) -> Vec<&'static str> {
        vec![self.reference_space.as_str()]
    }

    /// Icon resolver rooted at [`icon_base`](Self::icon_base).
    #[must_use]
    pub fn icons(&self) -> IconSet {
        IconSet::new(&self.icon_base)
    }
}

#[inline]
fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        // A bare `?inline` means "on".
        "" | "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Resolves button icon names to resource locators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconSet {
    base: String,
}

impl IconSet {
    pub const PLAY: &'static str = "play-button.png";
    pub const PAUSE: &'static str = "pause-button.png";
    pub const MUTE: &'static str = "mic-button.png";
    pub const RESTART: &'static str = "restart-button.png";
    pub const FULLSCREEN: &'static str = "fullscreen.png";
    pub const OPTIONS: &'static str = "options-button.png";
    pub const SUCCESS: &'static str = "check-button.png";
    pub const FAIL: &'static str = "x-button.png";

    #[must_use]
    pub fn new(base: &str) -> Self {
        let mut base = base.trim().to_string();
        if !base.is_empty() && !base.ends_with('/') {
            base.push('/');
        }
        Self { base }
    }

    /// Resolve `icon`. Anything containing a `/` is already a locator.
    #[must_use]
    pub fn resolve(&self, icon: &str) -> String {
        if icon.contains('/') {
            icon.to_string()
        } else {
            format!("{}{icon}", self.base)
        }
    }

    /// Checkmark shown after a successful activation.
    #[must_use]
    pub fn success(&self) -> String {
        self.resolve(Self::SUCCESS)
    }

    /// X mark shown after a failed activation.
    #[must_use]
    pub fn fail(&self) -> String {
        self.resolve(Self::FAIL)
    }
}

impl Default for IconSet {
    fn default() -> Self {
        Self::new(DEFAULT_ICON_BASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_reference_configuration() {
        let options = XrOptions::default();
        assert!(options.inline);
        assert_eq!(options.immersive_mode, SessionMode::ImmersiveVr);
        assert_eq!(options.reference_space, ReferenceSpaceKind::Local);
        assert!(options.default_input_handling);
        assert!(!options.guided_tour);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn json_fills_missing_keys_with_defaults() {
        let options = XrOptions::from_json(r#"{"referenceSpace":"local-floor"}"#).unwrap();
        assert_eq!(
            options,
            XrOptions {
                reference_space: ReferenceSpaceKind::LocalFloor,
                ..XrOptions::default()
            }
        );
    }

    #[test]
    fn json_rejects_unknown_keys() {
        let err = XrOptions::from_json(r#"{"inlined":false}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn json_rejects_inline_immersive_mode() {
        let err = XrOptions::from_json(r#"{"immersiveMode":"inline"}"#).unwrap_err();
        assert_eq!(err, ConfigError::NotImmersive("inline".into()));
    }

    #[test]
    fn query_overrides() {
        let options =
            XrOptions::from_query("?inline=0&referenceSpace=bounded-floor&usePolyfill=false&tour")
                .unwrap();
        assert!(!options.inline);
        assert_eq!(options.reference_space, ReferenceSpaceKind::BoundedFloor);
        assert!(!options.use_polyfill);
        assert!(options.guided_tour);
        assert!(options.default_input_handling);
    }

    #[test]
    fn query_ignores_unrelated_keys() {
        let options = XrOptions::from_query("video=home.mp4&utm_source=x").unwrap();
        assert_eq!(options, XrOptions::default());
    }

    #[test]
    fn query_rejects_bad_flag() {
        let err = XrOptions::from_query("inline=maybe").unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidBool {
                key: "inline".into(),
                value: "maybe".into()
            }
        );
    }

    #[test]
    fn required_features_name_the_space() {
        let options = XrOptions {
            reference_space: ReferenceSpaceKind::LocalFloor,
            ..XrOptions::default()
        };
        assert_eq!(options.required_features(), vec!["local-floor"]);
    }

    #[test]
    fn icon_resolution() {
        let icons = IconSet::new("/media/buttons");
        assert_eq!(icons.resolve("play-button.png"), "/media/buttons/play-button.png");
        assert_eq!(icons.resolve("/other/pause.png"), "/other/pause.png");
        assert_eq!(icons.success(), "/media/buttons/check-button.png");
        assert_eq!(icons.fail(), "/media/buttons/x-button.png");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn query_never_panics(query in "[a-zA-Z=&?0-9-]{0,64}") {
                let _ = XrOptions::from_query(&query);
            }

            #[test]
            fn accepted_queries_validate(inline in any::<bool>(), input in any::<bool>()) {
                let query = format!("inline={inline}&defaultInputHandling={input}");
                let options = XrOptions::from_query(&query).unwrap();
                prop_assert_eq!(options.inline, inline);
                prop_assert_eq!(options.default_input_handling, input);
                prop_assert!(options.validate().is_ok());
            }
        }
    }
}
