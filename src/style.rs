//! Class names, custom-property names, and the style strings the engine
//! publishes. Everything the host applies to its tree is built here so the
//! exact wire format stays in one place.

use crate::ease::CubicBezier;

/// Marker class for surfaces that take ambient motion.
pub const GLASS_CLASS: &str = "glass";

/// Toggled on and off each breathing cycle.
pub const BREATHING_CLASS: &str = "is-breathing";

/// Marker class for progress bars that reveal on first sight.
pub const PROGRESS_FILL_CLASS: &str = "glass-progress-fill";

pub const SCROLL_TRANSLATE_VAR: &str = "--scroll-translate";
pub const SCROLL_OPACITY_VAR: &str = "--scroll-opacity";
pub const MOUSE_X_VAR: &str = "--mouse-x";
pub const MOUSE_Y_VAR: &str = "--mouse-y";

/// Data attribute that persists a fill's target width.
pub const WIDTH_DATA_KEY: &str = "width";

/// Fallback fill target when neither data nor inline width is present.
pub const DEFAULT_FILL_WIDTH: &str = "0%";

pub const PLAY_STATE_PAUSED: &str = "paused";
pub const PLAY_STATE_RUNNING: &str = "running";

pub fn px(value: f64) -> String {
    format!("{value}px")
}

/// Transform applied while a surface is in the parallax band. Reads the
/// custom property so later ratio updates need no transform rewrite.
pub const PARALLAX_TRANSFORM: &str = "translateY(var(--scroll-translate, 0px))";

/// Opacity applied alongside [`PARALLAX_TRANSFORM`].
pub const PARALLAX_OPACITY: &str = "var(--scroll-opacity, 1)";

/// Hover tilt transform. `tilt_x_deg` rotates about the x axis (driven by
/// vertical pointer offset), `tilt_y_deg` about the y axis.
pub fn tilt_transform(lift_px: f64, tilt_x_deg: f64, tilt_y_deg: f64) -> String {
    format!("translateY({lift_px}px) rotateX({tilt_x_deg}deg) rotateY({tilt_y_deg}deg)")
}

/// Transition armed one frame before a fill animates to its target.
pub fn fill_transition(duration_ms: u64, curve: CubicBezier) -> String {
    let seconds = duration_ms as f64 / 1000.0;
    format!("width {seconds}s {}", curve.to_css())
}

/// Inverse of [`fill_transition`], for hosts that replay the reveal.
pub fn parse_fill_transition(s: &str) -> Option<(u64, CubicBezier)> {
    let rest = s.strip_prefix("width ")?;
    let (seconds, curve) = rest.split_once(' ')?;
    let seconds: f64 = seconds.strip_suffix('s')?.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some(((seconds * 1000.0).round() as u64, CubicBezier::parse_css(curve)?))
}

/// Parse a percentage width such as `80%` into its fraction, `0.8`.
pub fn parse_percent(s: &str) -> Option<f64> {
    let value: f64 = s.trim().strip_suffix('%')?.trim().parse().ok()?;
    if value.is_finite() { Some(value / 100.0) } else { None }
}
