use std::collections::BTreeMap;

use crate::config::MotionConfig;
use crate::core::ElementId;
use crate::ease::CubicBezier;
use crate::observe::ObserverOptions;
use crate::stage::{Stage, StyleProp};
use crate::style;

/// One-shot fill reveal. The first time a progress fill is seen, it is
/// frozen at zero width, then launched toward its target width one frame
/// later so the transition has a fixed point to animate from.
///
/// The target is resolved once per element: a `data-width` attribute wins,
/// then any inline width, then `0%`. Whatever is resolved is written back
/// to `data-width` so the element survives re-renders.
#[derive(Clone, Debug)]
pub struct Progress {
    fill_duration_ms: u64,
    fill_curve: CubicBezier,
    pending: BTreeMap<ElementId, String>,
}

impl Progress {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            fill_duration_ms: config.fill_duration_ms,
            fill_curve: config.fill_curve,
            pending: BTreeMap::new(),
        }
    }

    /// Watch options for the progress slot. No root inset; a single
    /// threshold at the config's trigger ratio.
    pub fn observer_options(config: &MotionConfig) -> ObserverOptions {
        ObserverOptions::new(vec![config.progress_threshold], 0.0)
    }

    /// Setup-time capture: promote an inline width into `data-width` before
    /// anything animates, so the target survives even if a later render
    /// rewrites the inline style. A fill that already carries a non-empty
    /// `data-width` is left alone.
    pub fn capture(stage: &mut dyn Stage, element: ElementId) {
        if stage
            .data(element, style::WIDTH_DATA_KEY)
            .filter(|s| !s.is_empty())
            .is_some()
        {
            return;
        }
        let target = stage
            .inline_style(element, StyleProp::Width)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| style::DEFAULT_FILL_WIDTH.to_string());
        stage.set_data(element, style::WIDTH_DATA_KEY, &target);
    }

    /// First sight: persist the target, freeze the fill at zero. Returns
    /// true when a launch frame should be requested.
    pub fn trigger(&mut self, stage: &mut dyn Stage, element: ElementId) -> bool {
        if self.pending.contains_key(&element) {
            return false;
        }
        let target = stage
            .data(element, style::WIDTH_DATA_KEY)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                stage
                    .inline_style(element, StyleProp::Width)
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or_else(|| style::DEFAULT_FILL_WIDTH.to_string());

        stage.set_data(element, style::WIDTH_DATA_KEY, &target);
        // Kill any leftover transition before zeroing, so the reset lands
        // instantly and only the launch animates.
        stage.set_style(element, StyleProp::Transition, "none");
        stage.set_style(element, StyleProp::Width, style::DEFAULT_FILL_WIDTH);
        self.pending.insert(element, target);
        true
    }

    /// Launch frame: arm the width transition and release the fill toward
    /// its target. Returns false when the element has nothing pending.
    pub fn launch(&mut self, stage: &mut dyn Stage, element: ElementId) -> bool {
        let Some(target) = self.pending.remove(&element) else {
            return false;
        };
        stage.set_style(
            element,
            StyleProp::Transition,
            &style::fill_transition(self.fill_duration_ms, self.fill_curve),
        );
        stage.set_style(element, StyleProp::Width, &target);
        true
    }

    /// Launch every pending fill, in id order.
    pub fn launch_all(&mut self, stage: &mut dyn Stage) -> Vec<ElementId> {
        let ids: Vec<ElementId> = self.pending.keys().copied().collect();
        for &id in &ids {
            self.launch(stage, id);
        }
        ids
    }

    /// Drop a pending launch without touching the stage.
    pub fn abandon(&mut self, element: ElementId) -> bool {
        self.pending.remove(&element).is_some()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
