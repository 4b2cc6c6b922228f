use crate::config::MotionConfig;
use crate::core::ElementId;
use crate::observe::{IntersectionEntry, ObserverOptions};
use crate::stage::{Stage, StyleProp};
use crate::style;

/// Scroll-linked drift and fade. Surfaces slide up to `drift_px` and dim to
/// `opacity_floor` as they leave the inset viewport band.
///
/// Custom properties are published on every measurement; the direct
/// transform and opacity overrides are only installed once the surface is
/// meaningfully visible, and are never removed here. The resize path clears
/// them through [`Parallax::clear_overrides`].
#[derive(Clone, Copy, Debug)]
pub struct Parallax {
    drift_px: f64,
    opacity_floor: f64,
    apply_ratio_gate: f64,
}

impl Parallax {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            drift_px: config.drift_px,
            opacity_floor: config.opacity_floor,
            apply_ratio_gate: config.apply_ratio_gate,
        }
    }

    /// Watch options for the scroll slot: config thresholds against the
    /// inset viewport band.
    pub fn observer_options(config: &MotionConfig) -> ObserverOptions {
        ObserverOptions::new(config.parallax_thresholds.clone(), config.margin_fraction)
    }

    pub fn apply(&self, stage: &mut dyn Stage, entry: &IntersectionEntry) {
        let translate = (1.0 - entry.ratio) * self.drift_px;
        let opacity = entry.ratio.max(self.opacity_floor);

        stage.set_var(
            entry.element,
            style::SCROLL_TRANSLATE_VAR,
            &style::px(translate),
        );
        stage.set_var(
            entry.element,
            style::SCROLL_OPACITY_VAR,
            &format!("{opacity}"),
        );

        if entry.ratio > self.apply_ratio_gate {
            stage.set_style(entry.element, StyleProp::Transform, style::PARALLAX_TRANSFORM);
            stage.set_style(entry.element, StyleProp::Opacity, style::PARALLAX_OPACITY);
        }
    }

    /// Drop the direct overrides so stylesheet rules win again. Custom
    /// properties stay; the next measurement refreshes them.
    pub fn clear_overrides(stage: &mut dyn Stage, element: ElementId) {
        stage.clear_style(element, StyleProp::Transform);
        stage.clear_style(element, StyleProp::Opacity);
    }
}
