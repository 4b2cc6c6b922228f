use std::collections::BTreeSet;

use crate::core::ElementId;
use crate::observe::IntersectionWatch;
use crate::sched::FrameRequestId;

/// The two observer positions the engine ever holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SlotName {
    Scroll,
    Progress,
}

/// Fixed observer slots. A slot is released before it is replaced, so two
/// watches never track the same concern at once.
#[derive(Clone, Debug, Default)]
pub struct ObserverSlots {
    scroll: Option<IntersectionWatch>,
    progress: Option<IntersectionWatch>,
}

impl ObserverSlots {
    fn slot_mut(&mut self, name: SlotName) -> &mut Option<IntersectionWatch> {
        match name {
            SlotName::Scroll => &mut self.scroll,
            SlotName::Progress => &mut self.progress,
        }
    }

    /// Install a watch, handing back whatever occupied the slot.
    pub fn install(&mut self, name: SlotName, watch: IntersectionWatch) -> Option<IntersectionWatch> {
        self.slot_mut(name).replace(watch)
    }

    pub fn release(&mut self, name: SlotName) -> Option<IntersectionWatch> {
        self.slot_mut(name).take()
    }

    pub fn release_all(&mut self) {
        self.scroll = None;
        self.progress = None;
    }

    pub fn get(&self, name: SlotName) -> Option<&IntersectionWatch> {
        match name {
            SlotName::Scroll => self.scroll.as_ref(),
            SlotName::Progress => self.progress.as_ref(),
        }
    }

    pub fn get_mut(&mut self, name: SlotName) -> Option<&mut IntersectionWatch> {
        self.slot_mut(name).as_mut()
    }
}

/// Read-only copy of the registry's bookkeeping at one instant.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RegistrySnapshot {
    pub breathing_active: bool,
    pub breathing: Vec<ElementId>,
    pub scroll_watched: Vec<ElementId>,
    pub progress_watched: Vec<ElementId>,
    pub hovered: Option<ElementId>,
    pub frame_request_pending: bool,
}

/// Owned bookkeeping for everything the engine is currently animating:
/// whether the shared pulse is in its inhale half, which elements breathe,
/// which are watched, who is hovered, and whether an animation frame is
/// outstanding. Pure data; all stage writes happen in the components.
#[derive(Clone, Debug, Default)]
pub struct MotionRegistry {
    breathing_active: bool,
    breathing: BTreeSet<ElementId>,
    slots: ObserverSlots,
    hovered: Option<ElementId>,
    frame_request: Option<FrameRequestId>,
}

impl MotionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the shared pulse is in its inhale half.
    pub fn breathing_active(&self) -> bool {
        self.breathing_active
    }

    pub fn set_breathing_active(&mut self, active: bool) {
        self.breathing_active = active;
    }

    /// Returns false if the element was already enrolled.
    pub fn enroll_breathing(&mut self, id: ElementId) -> bool {
        self.breathing.insert(id)
    }

    /// Returns false if the element was not enrolled.
    pub fn withdraw_breathing(&mut self, id: ElementId) -> bool {
        self.breathing.remove(&id)
    }

    pub fn breathing_contains(&self, id: ElementId) -> bool {
        self.breathing.contains(&id)
    }

    /// Enrolled elements in id order.
    pub fn breathing_elements(&self) -> Vec<ElementId> {
        self.breathing.iter().copied().collect()
    }

    pub fn clear_breathing(&mut self) {
        self.breathing.clear();
    }

    pub fn slots(&self) -> &ObserverSlots {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut ObserverSlots {
        &mut self.slots
    }

    pub fn hovered(&self) -> Option<ElementId> {
        self.hovered
    }

    pub fn set_hovered(&mut self, id: Option<ElementId>) {
        self.hovered = id;
    }

    pub fn frame_request(&self) -> Option<FrameRequestId> {
        self.frame_request
    }

    /// Arm the single frame-request slot, dropping any stale request.
    pub fn set_frame_request(&mut self, id: FrameRequestId) -> Option<FrameRequestId> {
        self.frame_request.replace(id)
    }

    pub fn take_frame_request(&mut self) -> Option<FrameRequestId> {
        self.frame_request.take()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            breathing_active: self.breathing_active,
            breathing: self.breathing_elements(),
            scroll_watched: self
                .slots
                .get(SlotName::Scroll)
                .map(IntersectionWatch::watched)
                .unwrap_or_default(),
            progress_watched: self
                .slots
                .get(SlotName::Progress)
                .map(IntersectionWatch::watched)
                .unwrap_or_default(),
            hovered: self.hovered,
            frame_request_pending: self.frame_request.is_some(),
        }
    }
}
