use crate::config::MotionConfig;
use crate::core::{ElementId, Point};
use crate::stage::{Stage, StyleProp};
use crate::style;

/// Hover tilt. While the pointer rides a glass surface, the surface lifts
/// and tilts toward the pointer; offsets are normalized to the surface size
/// so the tilt angle is the same for a card and a banner.
#[derive(Clone, Copy, Debug)]
pub struct Pointer {
    tilt_deg: f64,
    lift_px: f64,
}

impl Pointer {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            tilt_deg: config.tilt_deg,
            lift_px: config.lift_px,
        }
    }

    /// Topmost glass surface under the point. Surfaces later in document
    /// order paint on top, so the scan runs back to front.
    pub fn hovered_glass(stage: &dyn Stage, pos: Point) -> Option<ElementId> {
        stage
            .elements_with_class(style::GLASS_CLASS)
            .into_iter()
            .rev()
            .find(|&id| {
                stage.bounds(id).is_some_and(|b| {
                    pos.x >= b.x0 && pos.x <= b.x1 && pos.y >= b.y0 && pos.y <= b.y1
                })
            })
    }

    /// Tilt `element` toward `pos`. Returns false when the surface has no
    /// usable geometry (detached or zero-sized).
    pub fn apply(&self, stage: &mut dyn Stage, element: ElementId, pos: Point) -> bool {
        let Some(bounds) = stage.bounds(element) else {
            return false;
        };
        let (w, h) = (bounds.width(), bounds.height());
        if w <= 0.0 || h <= 0.0 {
            return false;
        }

        let center = bounds.center();
        let delta_x = (pos.x - center.x) / w;
        let delta_y = (pos.y - center.y) / h;

        stage.set_var(element, style::MOUSE_X_VAR, &format!("{delta_x}"));
        stage.set_var(element, style::MOUSE_Y_VAR, &format!("{delta_y}"));
        stage.set_style(
            element,
            StyleProp::Transform,
            &style::tilt_transform(self.lift_px, delta_y * self.tilt_deg, delta_x * self.tilt_deg),
        );
        true
    }

    /// Pointer left the stage: drop the tilt on every glass surface. Only
    /// the transform is cleared; mouse vars keep their last value.
    pub fn reset_all(stage: &mut dyn Stage) {
        for id in stage.elements_with_class(style::GLASS_CLASS) {
            stage.clear_style(id, StyleProp::Transform);
        }
    }
}
