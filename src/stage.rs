use crate::core::{ElementId, Rect, Viewport};

/// What the host environment can do for us. Components that need a missing
/// capability stay dormant instead of failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Capabilities {
    /// Host can report element visibility; scroll parallax and progress
    /// reveals depend on it.
    pub intersection_observation: bool,
}

impl Capabilities {
    pub const FULL: Capabilities = Capabilities {
        intersection_observation: true,
    };
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::FULL
    }
}

/// Inline style properties the engine writes directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StyleProp {
    Transform,
    Opacity,
    Width,
    Transition,
    AnimationPlayState,
}

impl StyleProp {
    pub fn name(self) -> &'static str {
        match self {
            StyleProp::Transform => "transform",
            StyleProp::Opacity => "opacity",
            StyleProp::Width => "width",
            StyleProp::Transition => "transition",
            StyleProp::AnimationPlayState => "animation-play-state",
        }
    }
}

/// Host surface the engine drives. The engine never walks a real tree; it
/// reads geometry and writes styles through this seam, which keeps every
/// component testable against a scripted stage.
pub trait Stage {
    fn capabilities(&self) -> Capabilities;
    fn viewport(&self) -> Viewport;

    /// Elements carrying `class`, in document order.
    fn elements_with_class(&self, class: &str) -> Vec<ElementId>;
    fn has_class(&self, id: ElementId, class: &str) -> bool;
    fn add_class(&mut self, id: ElementId, class: &str);
    fn remove_class(&mut self, id: ElementId, class: &str);

    /// Bounding rect in viewport coordinates, if the element is attached.
    fn bounds(&self, id: ElementId) -> Option<Rect>;

    fn set_var(&mut self, id: ElementId, name: &str, value: &str);

    fn set_style(&mut self, id: ElementId, prop: StyleProp, value: &str);
    fn clear_style(&mut self, id: ElementId, prop: StyleProp);
    /// Current inline value for `prop`, if one was set.
    fn inline_style(&self, id: ElementId, prop: StyleProp) -> Option<String>;

    fn data(&self, id: ElementId, key: &str) -> Option<String>;
    fn set_data(&mut self, id: ElementId, key: &str, value: &str);

    /// Flip membership of `class`; returns true when the class is now set.
    fn toggle_class(&mut self, id: ElementId, class: &str) -> bool {
        if self.has_class(id, class) {
            self.remove_class(id, class);
            false
        } else {
            self.add_class(id, class);
            true
        }
    }
}
