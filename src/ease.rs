/// CSS-style cubic bezier timing curve through (0,0) and (1,1) with control
/// points (x1,y1) and (x2,y2).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CubicBezier {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CubicBezier {
    /// The fill-reveal curve: fast attack, long glide into the target.
    pub const GLASS_FILL: CubicBezier = CubicBezier {
        x1: 0.2,
        y1: 0.8,
        x2: 0.2,
        y2: 1.0,
    };

    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Eased progress for time progress `t` in [0, 1].
    ///
    /// Solves x(s) = t by bisection (x is monotonic for CSS curves, which
    /// keep x1 and x2 inside [0, 1]), then evaluates y(s).
    pub fn eval(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        if t == 0.0 || t == 1.0 {
            return t;
        }

        let mut lo = 0.0_f64;
        let mut hi = 1.0_f64;
        let mut s = t;
        for _ in 0..32 {
            if axis(s, self.x1, self.x2) < t {
                lo = s;
            } else {
                hi = s;
            }
            s = (lo + hi) / 2.0;
        }
        axis(s, self.y1, self.y2)
    }

    /// The curve in CSS notation, e.g. `cubic-bezier(0.2, 0.8, 0.2, 1)`.
    pub fn to_css(self) -> String {
        format!(
            "cubic-bezier({}, {}, {}, {})",
            self.x1, self.y1, self.x2, self.y2
        )
    }

    /// Parse CSS notation produced by [`CubicBezier::to_css`].
    pub fn parse_css(s: &str) -> Option<Self> {
        let inner = s
            .trim()
            .strip_prefix("cubic-bezier(")?
            .strip_suffix(')')?;
        let mut parts = inner.split(',').map(|p| p.trim().parse::<f64>());
        let bez = Self {
            x1: parts.next()?.ok()?,
            y1: parts.next()?.ok()?,
            x2: parts.next()?.ok()?,
            y2: parts.next()?.ok()?,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(bez)
    }
}

fn axis(s: f64, c1: f64, c2: f64) -> f64 {
    let u = 1.0 - s;
    3.0 * u * u * s * c1 + 3.0 * u * s * s * c2 + s * s * s
}

/// Quartic ease-in-out on [0, 1].
pub fn ease_in_out_quart(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        8.0 * t * t * t * t
    } else {
        let u = t - 1.0;
        1.0 - 8.0 * u * u * u * u
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_stable() {
        let bez = CubicBezier::GLASS_FILL;
        assert_eq!(bez.eval(0.0), 0.0);
        assert_eq!(bez.eval(1.0), 1.0);
        assert_eq!(ease_in_out_quart(0.0), 0.0);
        assert_eq!(ease_in_out_quart(1.0), 1.0);
    }

    #[test]
    fn monotonic_spot_check() {
        let bez = CubicBezier::GLASS_FILL;
        let a = bez.eval(0.25);
        let b = bez.eval(0.5);
        let c = bez.eval(0.75);
        assert!(a < b);
        assert!(b < c);

        assert!(ease_in_out_quart(0.25) < ease_in_out_quart(0.5));
        assert!(ease_in_out_quart(0.5) < ease_in_out_quart(0.75));
    }

    #[test]
    fn linear_curve_is_identity() {
        let bez = CubicBezier::new(1.0 / 3.0, 1.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0);
        for t in [0.1, 0.3, 0.5, 0.7, 0.9] {
            assert!((bez.eval(t) - t).abs() < 1e-6);
        }
    }

    #[test]
    fn fill_curve_runs_ahead_of_linear() {
        // y1 = 0.8 front-loads the motion.
        let bez = CubicBezier::GLASS_FILL;
        assert!(bez.eval(0.25) > 0.25);
        assert!(bez.eval(0.5) > 0.5);
    }

    #[test]
    fn css_roundtrip() {
        let bez = CubicBezier::GLASS_FILL;
        let css = bez.to_css();
        assert_eq!(css, "cubic-bezier(0.2, 0.8, 0.2, 1)");
        assert_eq!(CubicBezier::parse_css(&css), Some(bez));
        assert_eq!(CubicBezier::parse_css("linear"), None);
        assert_eq!(CubicBezier::parse_css("cubic-bezier(0.2, 0.8)"), None);
    }

    #[test]
    fn quart_is_symmetric_about_midpoint() {
        for t in [0.1, 0.2, 0.4] {
            let lo = ease_in_out_quart(t);
            let hi = ease_in_out_quart(1.0 - t);
            assert!((lo + hi - 1.0).abs() < 1e-9);
        }
    }
}
