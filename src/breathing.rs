use std::collections::BTreeMap;

use crate::core::{CycleId, ElementId, Timestamp};
use crate::sched::TimerId;

/// Which half of the shared breath cycle the engine is in. `Inhale` has the
/// breathing class set, `Exhale` has it cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BreathPhase {
    Inhale,
    Exhale,
}

impl BreathPhase {
    pub fn class_on(self) -> bool {
        matches!(self, BreathPhase::Inhale)
    }

    pub fn flipped(self) -> BreathPhase {
        match self {
            BreathPhase::Inhale => BreathPhase::Exhale,
            BreathPhase::Exhale => BreathPhase::Inhale,
        }
    }
}

/// One class toggle to land on the stage. Carries the cycle it was issued
/// for so a toggle from a superseded cycle can be dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BreathApply {
    pub element: ElementId,
    pub cycle: CycleId,
    pub phase: BreathPhase,
}

/// A toggle and the jittered instant it should land at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduledApply {
    pub apply: BreathApply,
    pub at: Timestamp,
}

/// What one cycle boundary asks the engine to do: land a jittered toggle
/// per member and come back at the next boundary.
#[derive(Clone, Debug)]
pub struct TickOutcome {
    pub applies: Vec<ScheduledApply>,
    pub next_tick_at: Timestamp,
}

/// Slow breathing pulse. One shared clock flips the phase every period;
/// boundaries sit on a fixed grid from the start instant. At each boundary
/// every member draws a fresh random delay, so a page of surfaces follows
/// one pulse without toggling in lockstep, and a member added mid-cycle
/// waits for the next boundary instead of pulsing on its own.
///
/// The component only computes; the engine owns the scheduler and reports
/// toggle-timer handles back through [`Breathing::set_timer`].
#[derive(Clone, Debug)]
pub struct Breathing {
    period_ms: u64,
    jitter_ms: u64,
    rng: fastrand::Rng,
    cycle: CycleId,
    phase: BreathPhase,
    next_boundary: Option<Timestamp>,
    members: BTreeMap<ElementId, Option<TimerId>>,
}

impl Breathing {
    pub fn new(period_ms: u64, jitter_ms: u64, seed: u64) -> Self {
        Self {
            period_ms,
            jitter_ms,
            rng: fastrand::Rng::with_seed(seed),
            cycle: CycleId(0),
            phase: BreathPhase::Exhale,
            next_boundary: None,
            members: BTreeMap::new(),
        }
    }

    fn draw_jitter(&mut self) -> u64 {
        if self.jitter_ms == 0 {
            0
        } else {
            self.rng.u64(0..self.jitter_ms)
        }
    }

    /// Anchor the cycle grid at `now` and return the immediate first
    /// boundary.
    pub fn start(&mut self, now: Timestamp) -> Timestamp {
        self.next_boundary = Some(now);
        now
    }

    /// Enroll an element in the shared pulse. It stays untouched until the
    /// next boundary. Returns false when it is already a member.
    pub fn join(&mut self, element: ElementId) -> bool {
        if self.members.contains_key(&element) {
            return false;
        }
        self.members.insert(element, None);
        true
    }

    /// Run one cycle boundary: flip the shared phase and hand back a
    /// jittered toggle for every member. Returns None before `start`.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        let boundary = self.next_boundary?;
        self.phase = self.phase.flipped();
        self.cycle = self.cycle.next();
        let (cycle, phase) = (self.cycle, self.phase);

        let elements: Vec<ElementId> = self.members.keys().copied().collect();
        let mut applies = Vec::with_capacity(elements.len());
        for element in elements {
            applies.push(ScheduledApply {
                apply: BreathApply { element, cycle, phase },
                at: boundary.plus(self.draw_jitter()),
            });
        }

        let next_tick_at = boundary.plus(self.period_ms);
        self.next_boundary = Some(next_tick_at);
        Some(TickOutcome { applies, next_tick_at })
    }

    /// Take delivery of a toggle. True when it belongs to the newest cycle
    /// and its element is still a member.
    pub fn accept(&mut self, apply: &BreathApply) -> bool {
        let Some(timer) = self.members.get_mut(&apply.element) else {
            return false;
        };
        *timer = None;
        apply.cycle == self.cycle
    }

    /// Phase the newest cycle toggles toward.
    pub fn phase(&self) -> BreathPhase {
        self.phase
    }

    pub fn set_timer(&mut self, element: ElementId, timer: TimerId) {
        if let Some(slot) = self.members.get_mut(&element) {
            *slot = Some(timer);
        }
    }

    /// Withdraw a member. Returns its pending toggle timer for
    /// cancellation.
    pub fn end(&mut self, element: ElementId) -> Option<TimerId> {
        self.members.remove(&element).flatten()
    }

    /// Withdraw everything and stop the clock, handing back every pending
    /// timer. The next `start` begins a fresh pulse from `Exhale`.
    pub fn clear(&mut self) -> Vec<TimerId> {
        let timers = self.members.values().copied().flatten().collect();
        self.members.clear();
        self.next_boundary = None;
        self.phase = BreathPhase::Exhale;
        timers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breath_phase_flips() {
        assert_eq!(BreathPhase::Inhale.flipped(), BreathPhase::Exhale);
        assert!(BreathPhase::Inhale.class_on());
        assert!(!BreathPhase::Exhale.class_on());
    }

    #[test]
    fn first_cycle_fires_at_the_start_instant() {
        let mut b = Breathing::new(6500, 0, 0);
        b.join(ElementId(1));
        assert_eq!(b.start(Timestamp(50)), Timestamp(50));

        let out = b.tick().unwrap();
        assert_eq!(out.applies.len(), 1);
        assert_eq!(out.applies[0].at, Timestamp(50));
        assert_eq!(out.applies[0].apply.phase, BreathPhase::Inhale);
        assert_eq!(out.next_tick_at, Timestamp(6550));
    }

    #[test]
    fn tick_before_start_is_a_noop() {
        let mut b = Breathing::new(6500, 0, 0);
        b.join(ElementId(1));
        assert!(b.tick().is_none());
    }

    #[test]
    fn members_share_every_boundary() {
        let mut b = Breathing::new(6500, 0, 0);
        for id in 1..=3 {
            b.join(ElementId(id));
        }
        b.start(Timestamp::ZERO);

        let first = b.tick().unwrap();
        assert_eq!(first.applies.len(), 3);
        assert!(first.applies.iter().all(|s| s.apply.phase == BreathPhase::Inhale));
        assert!(first.applies.iter().all(|s| s.at == Timestamp::ZERO));

        let second = b.tick().unwrap();
        assert!(second.applies.iter().all(|s| s.apply.phase == BreathPhase::Exhale));
        assert!(second.applies.iter().all(|s| s.at == Timestamp(6500)));
        assert_ne!(first.applies[0].apply.cycle, second.applies[0].apply.cycle);
    }

    #[test]
    fn toggles_land_inside_the_jitter_window() {
        let mut b = Breathing::new(6500, 200, 7);
        for id in 1..=4 {
            b.join(ElementId(id));
        }
        b.start(Timestamp::ZERO);

        for k in 0..6u64 {
            let boundary = Timestamp(k * 6500);
            let out = b.tick().unwrap();
            for s in &out.applies {
                assert!(s.at >= boundary, "cycle {k} fired early: {:?}", s.at);
                assert!(s.at < boundary.plus(200), "cycle {k} fired late: {:?}", s.at);
            }
        }
    }

    #[test]
    fn jitter_is_fresh_per_member_and_cycle() {
        let mut b = Breathing::new(6500, 200, 11);
        for id in 1..=4 {
            b.join(ElementId(id));
        }
        b.start(Timestamp::ZERO);

        let mut offsets = Vec::new();
        for k in 0..8u64 {
            for s in b.tick().unwrap().applies {
                offsets.push(s.at.0 - k * 6500);
            }
        }
        offsets.sort();
        offsets.dedup();
        assert!(offsets.len() > 1, "every toggle reused one offset");
    }

    #[test]
    fn jitter_is_deterministic_per_seed() {
        let mut a = Breathing::new(6500, 200, 42);
        let mut b = Breathing::new(6500, 200, 42);
        for id in 1..=5 {
            a.join(ElementId(id));
            b.join(ElementId(id));
        }
        a.start(Timestamp::ZERO);
        b.start(Timestamp::ZERO);
        assert_eq!(a.tick().unwrap().applies, b.tick().unwrap().applies);
    }

    #[test]
    fn late_member_waits_for_the_next_boundary() {
        let mut b = Breathing::new(6500, 0, 0);
        b.join(ElementId(1));
        b.start(Timestamp::ZERO);
        b.tick();

        // Joined mid-cycle: nothing lands for it until the shared boundary.
        b.join(ElementId(2));
        let out = b.tick().unwrap();
        assert_eq!(out.applies.len(), 2);
        assert!(out.applies.iter().all(|s| s.at == Timestamp(6500)));
        assert!(out.applies.iter().all(|s| s.apply.phase == BreathPhase::Exhale));
    }

    #[test]
    fn rejoining_is_a_noop() {
        let mut b = Breathing::new(6500, 0, 0);
        assert!(b.join(ElementId(1)));
        assert!(!b.join(ElementId(1)));
        b.start(Timestamp::ZERO);
        assert_eq!(b.tick().unwrap().applies.len(), 1);
    }

    #[test]
    fn stale_apply_is_rejected() {
        let mut b = Breathing::new(6500, 0, 0);
        b.join(ElementId(1));
        b.start(Timestamp::ZERO);

        let old = b.tick().unwrap().applies[0].apply;
        assert!(b.accept(&old));

        let new = b.tick().unwrap().applies[0].apply;
        assert!(!b.accept(&old));
        assert!(b.accept(&new));
    }

    #[test]
    fn apply_for_withdrawn_member_is_rejected() {
        let mut b = Breathing::new(6500, 0, 0);
        b.join(ElementId(1));
        b.start(Timestamp::ZERO);
        let apply = b.tick().unwrap().applies[0].apply;
        b.end(ElementId(1));
        assert!(!b.accept(&apply));
        assert!(b.tick().unwrap().applies.is_empty());
    }

    #[test]
    fn delivery_clears_the_pending_timer() {
        let mut b = Breathing::new(6500, 0, 0);
        b.join(ElementId(1));
        b.start(Timestamp::ZERO);
        let apply = b.tick().unwrap().applies[0].apply;
        b.set_timer(ElementId(1), TimerId(5));
        assert!(b.accept(&apply));
        assert_eq!(b.end(ElementId(1)), None);
    }

    #[test]
    fn end_returns_the_pending_timer() {
        let mut b = Breathing::new(6500, 0, 0);
        b.join(ElementId(1));
        b.set_timer(ElementId(1), TimerId(12));
        assert_eq!(b.end(ElementId(1)), Some(TimerId(12)));
        assert_eq!(b.end(ElementId(1)), None);
    }

    #[test]
    fn clear_stops_the_clock_and_hands_back_every_timer() {
        let mut b = Breathing::new(6500, 200, 0);
        for id in 1..=3 {
            b.join(ElementId(id));
            b.set_timer(ElementId(id), TimerId(id));
        }
        b.start(Timestamp::ZERO);

        let mut timers = b.clear();
        timers.sort();
        assert_eq!(timers, vec![TimerId(1), TimerId(2), TimerId(3)]);
        assert!(b.tick().is_none());

        // A restart begins a fresh pulse from the cleared phase.
        b.join(ElementId(9));
        b.start(Timestamp(100));
        let out = b.tick().unwrap();
        assert_eq!(out.applies[0].apply.phase, BreathPhase::Inhale);
    }
}
