use crate::core::Timestamp;

/// Leading-edge rate limiter with a single trailing slot.
///
/// The first arm in a quiet window runs immediately. Arms inside the window
/// defer to one trailing run at `last_run + interval`; only the newest
/// deferred payload survives. The caller owns the timer: on [`ThrottleDecision::Defer`]
/// it schedules (or re-targets) a trailing timer, and reports the fire back
/// through [`Throttle::ran`].
#[derive(Clone, Copy, Debug)]
pub struct Throttle {
    interval_ms: u64,
    last_run: Option<Timestamp>,
    trailing_armed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Run now. Any pending trailing timer is stale and must be cancelled.
    Run,
    /// Hold the payload for a trailing run at `at`.
    Defer { at: Timestamp },
}

impl Throttle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_run: None,
            trailing_armed: false,
        }
    }

    pub fn arm(&mut self, now: Timestamp) -> ThrottleDecision {
        match self.last_run {
            Some(last) if now.since(last) < self.interval_ms => {
                self.trailing_armed = true;
                ThrottleDecision::Defer {
                    at: last.plus(self.interval_ms),
                }
            }
            _ => {
                self.last_run = Some(now);
                self.trailing_armed = false;
                ThrottleDecision::Run
            }
        }
    }

    /// Record a trailing run fired by the caller's timer.
    pub fn ran(&mut self, now: Timestamp) {
        self.last_run = Some(now);
        self.trailing_armed = false;
    }

    pub fn trailing_armed(&self) -> bool {
        self.trailing_armed
    }

    /// Forget history so the next arm runs immediately.
    pub fn reset(&mut self) {
        self.last_run = None;
        self.trailing_armed = false;
    }
}

/// Trailing-edge rate limiter. Every arm pushes the deadline out to
/// `now + delay`; the caller cancels the previous timer and schedules the
/// returned deadline.
#[derive(Clone, Copy, Debug)]
pub struct Debounce {
    delay_ms: u64,
    deadline: Option<Timestamp>,
}

impl Debounce {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            deadline: None,
        }
    }

    pub fn arm(&mut self, now: Timestamp) -> Timestamp {
        let at = now.plus(self.delay_ms);
        self.deadline = Some(at);
        at
    }

    pub fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }

    /// Mark the pending run as delivered (or abandoned).
    pub fn settle(&mut self) {
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::{Scheduler, TimerId};

    // Drives a Throttle the way the engine does: one pending trailing timer,
    // re-targeted on every defer.
    struct ThrottleRig {
        throttle: Throttle,
        timer: Option<TimerId>,
        runs: Vec<Timestamp>,
    }

    impl ThrottleRig {
        fn call(&mut self, sched: &mut Scheduler<()>, now: Timestamp) {
            match self.throttle.arm(now) {
                ThrottleDecision::Run => {
                    if let Some(t) = self.timer.take() {
                        sched.cancel(t);
                    }
                    self.runs.push(now);
                }
                ThrottleDecision::Defer { at } => {
                    if let Some(t) = self.timer.take() {
                        sched.cancel(t);
                    }
                    self.timer = Some(sched.schedule(at, ()));
                }
            }
        }

        fn drain(&mut self, sched: &mut Scheduler<()>, now: Timestamp) {
            while let Some((due, ())) = sched.pop_due(now) {
                self.timer = None;
                self.throttle.ran(due);
                self.runs.push(due);
            }
        }
    }

    #[test]
    fn throttle_runs_leading_and_one_trailing() {
        let mut sched = Scheduler::new();
        let mut rig = ThrottleRig {
            throttle: Throttle::new(16),
            timer: None,
            runs: Vec::new(),
        };

        for ms in [0, 5, 10] {
            rig.drain(&mut sched, Timestamp(ms));
            rig.call(&mut sched, Timestamp(ms));
        }
        rig.drain(&mut sched, Timestamp(20));
        rig.call(&mut sched, Timestamp(20));
        rig.drain(&mut sched, Timestamp(30));

        // Leading run at 0; calls at 5 and 10 collapse into one trailing
        // run at 16; the call at 20 defers to 32, past this window.
        assert_eq!(rig.runs, vec![Timestamp(0), Timestamp(16)]);
    }

    #[test]
    fn throttle_runs_immediately_after_quiet_window() {
        let mut t = Throttle::new(16);
        assert_eq!(t.arm(Timestamp(0)), ThrottleDecision::Run);
        assert_eq!(t.arm(Timestamp(40)), ThrottleDecision::Run);
        assert_eq!(
            t.arm(Timestamp(41)),
            ThrottleDecision::Defer { at: Timestamp(56) }
        );
    }

    #[test]
    fn throttle_defer_keeps_one_deadline() {
        let mut t = Throttle::new(16);
        assert_eq!(t.arm(Timestamp(0)), ThrottleDecision::Run);
        assert_eq!(
            t.arm(Timestamp(5)),
            ThrottleDecision::Defer { at: Timestamp(16) }
        );
        assert_eq!(
            t.arm(Timestamp(10)),
            ThrottleDecision::Defer { at: Timestamp(16) }
        );
        assert!(t.trailing_armed());
        t.ran(Timestamp(16));
        assert!(!t.trailing_armed());
    }

    #[test]
    fn throttle_reset_restores_leading_edge() {
        let mut t = Throttle::new(16);
        assert_eq!(t.arm(Timestamp(0)), ThrottleDecision::Run);
        t.reset();
        assert_eq!(t.arm(Timestamp(1)), ThrottleDecision::Run);
    }

    #[test]
    fn debounce_collapses_bursts_to_last_deadline() {
        let mut sched: Scheduler<()> = Scheduler::new();
        let mut d = Debounce::new(250);
        let mut timer: Option<TimerId> = None;
        let mut runs = Vec::new();

        for ms in [0, 100, 150] {
            let at = d.arm(Timestamp(ms));
            if let Some(t) = timer.take() {
                sched.cancel(t);
            }
            timer = Some(sched.schedule(at, ()));
        }
        while let Some((due, ())) = sched.pop_due(Timestamp(1000)) {
            d.settle();
            runs.push(due);
        }

        assert_eq!(runs, vec![Timestamp(400)]);
        assert_eq!(d.deadline(), None);
    }
}
