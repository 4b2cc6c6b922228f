use crate::breathing::{BreathApply, Breathing};
use crate::config::MotionConfig;
use crate::core::{ElementId, Point, Timestamp};
use crate::error::VetroResult;
use crate::observe::IntersectionWatch;
use crate::parallax::Parallax;
use crate::pointer::Pointer;
use crate::progress::Progress;
use crate::rate::{Debounce, Throttle, ThrottleDecision};
use crate::registry::{MotionRegistry, RegistrySnapshot, SlotName};
use crate::sched::{FrameRequestId, Scheduler, TimerId};
use crate::stage::{Stage, StyleProp};
use crate::style;

/// Work the scheduler hands back to the engine.
#[derive(Clone, Copy, Debug)]
enum Task {
    BreathTick,
    BreathApply(BreathApply),
    PointerTrailing,
    ResizeSettled,
}

/// The orchestrator. Owns every component, the registry, and the virtual
/// clock's timer queue; the host feeds it events and drives time forward
/// with [`MotionEngine::advance_to`].
///
/// Nothing here reads a wall clock. All timing flows through the
/// timestamps the host passes in, so a whole session can be replayed
/// deterministically.
#[derive(Debug)]
pub struct MotionEngine {
    config: MotionConfig,
    registry: MotionRegistry,
    sched: Scheduler<Task>,
    breathing: Breathing,
    parallax: Parallax,
    pointer: Pointer,
    progress: Progress,
    pointer_throttle: Throttle,
    breath_timer: Option<TimerId>,
    pointer_timer: Option<TimerId>,
    pending_pointer: Option<Point>,
    resize_debounce: Debounce,
    resize_timer: Option<TimerId>,
    next_frame_id: u64,
    initialized: bool,
}

impl MotionEngine {
    pub fn new(config: MotionConfig) -> VetroResult<Self> {
        config.validate()?;
        Ok(Self {
            breathing: Breathing::new(
                config.breath_period_ms,
                config.breath_jitter_ms,
                config.seed,
            ),
            parallax: Parallax::new(&config),
            pointer: Pointer::new(&config),
            progress: Progress::new(&config),
            pointer_throttle: Throttle::new(config.pointer_throttle_ms),
            resize_debounce: Debounce::new(config.resize_debounce_ms),
            registry: MotionRegistry::new(),
            sched: Scheduler::new(),
            breath_timer: None,
            pointer_timer: None,
            pending_pointer: None,
            resize_timer: None,
            next_frame_id: 0,
            initialized: false,
            config,
        })
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Bring every component up against the stage as it stands now:
    /// breathing first, then the scroll watch, then pointer tilt (which
    /// needs no setup), then the progress watch. Components that need a
    /// capability the stage lacks stay dormant. Runs once; further calls
    /// are no-ops until [`MotionEngine::teardown`].
    #[tracing::instrument(skip_all)]
    pub fn init(&mut self, stage: &mut dyn Stage, now: Timestamp) {
        if self.initialized {
            tracing::debug!("init skipped; engine already initialized");
            return;
        }
        self.initialized = true;

        let glass = stage.elements_with_class(style::GLASS_CLASS);
        for &id in &glass {
            self.register(stage, id);
        }
        // One clock for the whole page; the first cycle fires right away.
        let first = self.breathing.start(now);
        self.breath_timer = Some(self.sched.schedule(first, Task::BreathTick));

        if stage.capabilities().intersection_observation {
            let mut watch = IntersectionWatch::new(Parallax::observer_options(&self.config));
            for &id in &glass {
                watch.observe(id);
            }
            self.install_watch(SlotName::Scroll, watch);

            let mut watch = IntersectionWatch::new(Progress::observer_options(&self.config));
            for id in stage.elements_with_class(style::PROGRESS_FILL_CLASS) {
                Progress::capture(stage, id);
                watch.observe(id);
            }
            self.install_watch(SlotName::Progress, watch);

            self.sweep_scroll(stage);
            self.sweep_progress(stage);
        } else {
            tracing::warn!(
                "stage cannot observe intersections; parallax and progress reveals stay off"
            );
        }

        tracing::debug!(
            glass = glass.len(),
            breathing = self.registry.breathing_elements().len(),
            "motion engine initialized"
        );
    }

    fn install_watch(&mut self, name: SlotName, watch: IntersectionWatch) {
        if let Some(old) = self.registry.slots_mut().install(name, watch) {
            tracing::debug!(?name, released = old.len(), "released occupied observer slot");
        }
    }

    /// Run every timer due at or before `now`, in due order.
    pub fn advance_to(&mut self, stage: &mut dyn Stage, now: Timestamp) {
        while let Some((due, task)) = self.sched.pop_due(now) {
            self.run_task(stage, due, task);
        }
    }

    /// Due time of the next pending timer, if any.
    pub fn next_due(&mut self) -> Option<Timestamp> {
        self.sched.next_due()
    }

    fn run_task(&mut self, stage: &mut dyn Stage, due: Timestamp, task: Task) {
        match task {
            Task::BreathTick => {
                if let Some(outcome) = self.breathing.tick() {
                    self.registry
                        .set_breathing_active(self.breathing.phase().class_on());
                    // Each member's toggle is its own task, cancellable
                    // until it lands.
                    for planned in outcome.applies {
                        let timer = self
                            .sched
                            .schedule(planned.at, Task::BreathApply(planned.apply));
                        self.breathing.set_timer(planned.apply.element, timer);
                    }
                    self.breath_timer =
                        Some(self.sched.schedule(outcome.next_tick_at, Task::BreathTick));
                }
            }
            Task::BreathApply(apply) => {
                if self.breathing.accept(&apply) {
                    if apply.phase.class_on() {
                        stage.add_class(apply.element, style::BREATHING_CLASS);
                    } else {
                        stage.remove_class(apply.element, style::BREATHING_CLASS);
                    }
                }
            }
            Task::PointerTrailing => {
                self.pointer_timer = None;
                self.pointer_throttle.ran(due);
                if let Some(pos) = self.pending_pointer.take() {
                    self.apply_pointer(stage, pos);
                }
            }
            Task::ResizeSettled => {
                self.resize_timer = None;
                self.resize_debounce.settle();
                for id in stage.elements_with_class(style::GLASS_CLASS) {
                    Parallax::clear_overrides(stage, id);
                }
                if let Some(w) = self.registry.slots_mut().get_mut(SlotName::Scroll) {
                    w.mark_all_dirty();
                }
                if let Some(w) = self.registry.slots_mut().get_mut(SlotName::Progress) {
                    w.mark_all_dirty();
                }
                self.sweep_scroll(stage);
                self.sweep_progress(stage);
            }
        }
    }

    /// Enroll one surface in the shared pulse. Silently refuses anything
    /// without the glass class, so callers can forward arbitrary nodes.
    /// A surface registered mid-cycle is measured at once but starts
    /// breathing at the next shared boundary.
    pub fn register(&mut self, stage: &mut dyn Stage, id: ElementId) -> bool {
        if !stage.has_class(id, style::GLASS_CLASS) {
            return false;
        }
        if !self.registry.enroll_breathing(id) {
            return false;
        }
        self.breathing.join(id);

        let entry = match self.registry.slots_mut().get_mut(SlotName::Scroll) {
            Some(watch) => {
                watch.observe(id);
                watch.measure(id, stage.bounds(id), stage.viewport())
            }
            None => None,
        };
        if let Some(entry) = entry {
            self.parallax.apply(stage, &entry);
        }
        tracing::debug!(element = id.0, "registered glass surface");
        true
    }

    /// Withdraw a surface: out of breathing, out of every watch, and any
    /// pending reveal launch is forgotten. Its breath class is cleared;
    /// other styles are left as they stand. Returns false when the surface
    /// was never enrolled, though the sweeps still run either way.
    pub fn deregister(&mut self, stage: &mut dyn Stage, id: ElementId) -> bool {
        let was_enrolled = self.registry.withdraw_breathing(id);
        if was_enrolled {
            if let Some(timer) = self.breathing.end(id) {
                self.sched.cancel(timer);
            }
            stage.remove_class(id, style::BREATHING_CLASS);
        }
        for name in [SlotName::Scroll, SlotName::Progress] {
            if let Some(watch) = self.registry.slots_mut().get_mut(name) {
                watch.unobserve(id);
            }
        }
        self.progress.abandon(id);
        if self.registry.hovered() == Some(id) {
            self.registry.set_hovered(None);
        }
        if was_enrolled {
            tracing::debug!(element = id.0, "deregistered glass surface");
        }
        was_enrolled
    }

    /// Flip the breath class on every enrolled surface right now, without
    /// touching the cycle schedule. The next scheduled toggle wins again.
    pub fn trigger_breath(&mut self, stage: &mut dyn Stage) {
        for id in self.registry.breathing_elements() {
            stage.toggle_class(id, style::BREATHING_CLASS);
        }
    }

    /// Geometry moved: re-measure both watches and apply what changed.
    pub fn on_scroll(&mut self, stage: &mut dyn Stage) {
        self.sweep_scroll(stage);
        self.sweep_progress(stage);
    }

    fn sweep_scroll(&mut self, stage: &mut dyn Stage) {
        let viewport = stage.viewport();
        let entries = match self.registry.slots_mut().get_mut(SlotName::Scroll) {
            Some(watch) => {
                let mut entries = Vec::new();
                for id in watch.watched() {
                    if let Some(entry) = watch.measure(id, stage.bounds(id), viewport) {
                        entries.push(entry);
                    }
                }
                entries
            }
            None => Vec::new(),
        };
        for entry in &entries {
            self.parallax.apply(stage, entry);
        }
    }

    fn sweep_progress(&mut self, stage: &mut dyn Stage) {
        let viewport = stage.viewport();
        let hits = match self.registry.slots_mut().get_mut(SlotName::Progress) {
            Some(watch) => {
                let mut hits = Vec::new();
                for id in watch.watched() {
                    if let Some(entry) = watch.measure(id, stage.bounds(id), viewport) {
                        if entry.is_intersecting {
                            hits.push(id);
                        }
                    }
                }
                // One-shot: stop watching before the launch frame runs.
                for &id in &hits {
                    watch.unobserve(id);
                }
                hits
            }
            None => Vec::new(),
        };
        let mut want_frame = false;
        for id in hits {
            want_frame |= self.progress.trigger(stage, id);
        }
        if want_frame {
            self.request_frame();
        }
    }

    /// Throttled pointer tracking: a quiet-window move applies at once,
    /// a burst keeps only its newest position for the trailing run.
    pub fn on_pointer_move(&mut self, stage: &mut dyn Stage, pos: Point, now: Timestamp) {
        match self.pointer_throttle.arm(now) {
            ThrottleDecision::Run => {
                if let Some(timer) = self.pointer_timer.take() {
                    self.sched.cancel(timer);
                }
                self.pending_pointer = None;
                self.apply_pointer(stage, pos);
            }
            ThrottleDecision::Defer { at } => {
                self.pending_pointer = Some(pos);
                if self.pointer_timer.is_none() {
                    self.pointer_timer = Some(self.sched.schedule(at, Task::PointerTrailing));
                }
            }
        }
    }

    fn apply_pointer(&mut self, stage: &mut dyn Stage, pos: Point) {
        match Pointer::hovered_glass(stage, pos) {
            Some(id) => {
                self.registry.set_hovered(Some(id));
                self.pointer.apply(stage, id, pos);
            }
            None => self.registry.set_hovered(None),
        }
    }

    /// Pointer left the stage: level every surface and drop any trailing
    /// run so a stale burst cannot tilt after the exit.
    pub fn on_pointer_leave(&mut self, stage: &mut dyn Stage) {
        if let Some(timer) = self.pointer_timer.take() {
            self.sched.cancel(timer);
        }
        self.pending_pointer = None;
        self.registry.set_hovered(None);
        Pointer::reset_all(stage);
    }

    /// Viewport is changing: hold off until it settles, then clear the
    /// parallax overrides and re-measure everything.
    pub fn on_resize(&mut self, now: Timestamp) {
        let at = self.resize_debounce.arm(now);
        if let Some(timer) = self.resize_timer.take() {
            self.sched.cancel(timer);
        }
        self.resize_timer = Some(self.sched.schedule(at, Task::ResizeSettled));
    }

    /// Pause or resume stylesheet animations on every glass surface.
    pub fn on_visibility_change(&mut self, stage: &mut dyn Stage, hidden: bool) {
        let state = if hidden {
            style::PLAY_STATE_PAUSED
        } else {
            style::PLAY_STATE_RUNNING
        };
        for id in stage.elements_with_class(style::GLASS_CLASS) {
            stage.set_style(id, StyleProp::AnimationPlayState, state);
        }
    }

    fn request_frame(&mut self) -> FrameRequestId {
        let id = FrameRequestId(self.next_frame_id);
        self.next_frame_id += 1;
        if let Some(stale) = self.registry.set_frame_request(id) {
            tracing::trace!(stale = stale.0, "replaced outstanding frame request");
        }
        id
    }

    /// The frame request the host should deliver next, if one is armed.
    pub fn pending_frame(&self) -> Option<FrameRequestId> {
        self.registry.frame_request()
    }

    /// Host delivered an animation frame. Requests the engine no longer
    /// recognizes are ignored.
    pub fn animation_frame(&mut self, stage: &mut dyn Stage, id: FrameRequestId) {
        if self.registry.frame_request() != Some(id) {
            return;
        }
        self.registry.take_frame_request();
        self.progress.launch_all(stage);
    }

    /// Stop everything: timers, watches, pending launches, bookkeeping.
    /// Styles already on the stage are left in place.
    pub fn teardown(&mut self) {
        for timer in self.breathing.clear() {
            self.sched.cancel(timer);
        }
        if let Some(timer) = self.breath_timer.take() {
            self.sched.cancel(timer);
        }
        self.registry.clear_breathing();
        self.registry.set_breathing_active(false);
        self.registry.slots_mut().release_all();
        self.registry.take_frame_request();
        self.registry.set_hovered(None);
        if let Some(timer) = self.pointer_timer.take() {
            self.sched.cancel(timer);
        }
        self.pending_pointer = None;
        self.pointer_throttle.reset();
        if let Some(timer) = self.resize_timer.take() {
            self.sched.cancel(timer);
        }
        self.resize_debounce.settle();
        self.progress.clear();
        self.sched.clear();
        self.initialized = false;
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.registry.snapshot()
    }
}
