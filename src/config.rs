use crate::{
    ease::CubicBezier,
    error::{VetroError, VetroResult},
};

/// Tuning knobs for every motion component. All timings are virtual
/// milliseconds; geometry is in CSS pixels.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub breath_period_ms: u64, // toggle cadence per element
    pub breath_jitter_ms: u64, // uniform [0, jitter) offset per element
    pub pointer_throttle_ms: u64,
    pub resize_debounce_ms: u64,
    pub parallax_thresholds: Vec<f64>, // ascending, within [0, 1]
    pub margin_fraction: f64,          // viewport inset, top and bottom
    pub drift_px: f64,                 // parallax travel at ratio 0
    pub opacity_floor: f64,
    pub apply_ratio_gate: f64, // direct styles only above this ratio
    pub tilt_deg: f64,         // pointer tilt per unit offset
    pub lift_px: f64,          // vertical lift while hovered
    pub progress_threshold: f64,
    pub fill_duration_ms: u64,
    pub fill_curve: CubicBezier,
    pub seed: u64, // jitter determinism
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            breath_period_ms: 6500,
            breath_jitter_ms: 200,
            pointer_throttle_ms: 16,
            resize_debounce_ms: 250,
            parallax_thresholds: vec![0.0, 0.25, 0.5, 0.75, 1.0],
            margin_fraction: 0.10,
            drift_px: 20.0,
            opacity_floor: 0.3,
            apply_ratio_gate: 0.1,
            tilt_deg: 2.0,
            lift_px: -2.0,
            progress_threshold: 0.5,
            fill_duration_ms: 2500,
            fill_curve: CubicBezier::GLASS_FILL,
            seed: 0,
        }
    }
}

impl MotionConfig {
    pub fn validate(&self) -> VetroResult<()> {
        if self.breath_period_ms == 0 {
            return Err(VetroError::validation("breath_period_ms must be > 0"));
        }
        if self.breath_jitter_ms >= self.breath_period_ms {
            return Err(VetroError::validation(
                "breath_jitter_ms must be < breath_period_ms",
            ));
        }
        if self.parallax_thresholds.is_empty() {
            return Err(VetroError::validation(
                "parallax_thresholds must be non-empty",
            ));
        }
        for pair in self.parallax_thresholds.windows(2) {
            if pair[0] >= pair[1] {
                return Err(VetroError::validation(
                    "parallax_thresholds must be strictly ascending",
                ));
            }
        }
        for &t in &self.parallax_thresholds {
            if !(0.0..=1.0).contains(&t) {
                return Err(VetroError::validation(format!(
                    "parallax threshold {t} out of [0, 1]"
                )));
            }
        }
        if !(0.0..0.5).contains(&self.margin_fraction) {
            return Err(VetroError::validation(
                "margin_fraction must be in [0, 0.5)",
            ));
        }
        if !(0.0..=1.0).contains(&self.opacity_floor) {
            return Err(VetroError::validation("opacity_floor must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.apply_ratio_gate) {
            return Err(VetroError::validation(
                "apply_ratio_gate must be in [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.progress_threshold) {
            return Err(VetroError::validation(
                "progress_threshold must be in [0, 1]",
            ));
        }
        if self.fill_duration_ms == 0 {
            return Err(VetroError::validation("fill_duration_ms must be > 0"));
        }
        Ok(())
    }
}
