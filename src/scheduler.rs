//! Render scheduling.
//!
//! Mutations never render synchronously. The first request in an idle
//! window arms a tick; further requests before the tick fires coalesce
//! into it. After a render the scheduler enters a cooldown of one debounce
//! interval; requests landing inside the cooldown render once at its
//! trailing edge. Steady-state mutation pressure therefore renders at most
//! once per interval without dropping the final state.
//!
//! All transitions take the current `Instant` as a parameter so tests can
//! drive the machine deterministically.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerState {
    Idle,
    /// A tick is armed; the next take_tick() consumes it.
    TickPending,
    /// A render just happened; further requests wait for the trailing edge.
    Cooldown { until: Instant },
}

#[derive(Debug)]
pub struct RenderScheduler {
    state: SchedulerState,
    /// At least one request has arrived since the last render.
    pending: bool,
    debounce: Duration,
}

impl RenderScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: SchedulerState::Idle,
            pending: false,
            debounce,
        }
    }

    /// Record that the tree changed. Idempotent between renders.
    pub fn request(&mut self) {
        self.pending = true;
        if self.state == SchedulerState::Idle {
            self.state = SchedulerState::TickPending;
        }
    }

    /// Consume the armed tick, if any. Returns true when the caller should
    /// render now. Inside a cooldown the tick stays suppressed; the request
    /// is answered by poll() at the trailing edge instead.
    pub fn take_tick(&mut self, now: Instant) -> bool {
        match self.state {
            SchedulerState::TickPending => {
                self.state = SchedulerState::Idle;
                self.pending
            }
            SchedulerState::Cooldown { until } if now >= until => {
                self.state = SchedulerState::Idle;
                self.pending
            }
            _ => false,
        }
    }

    /// Record a completed render and open the cooldown window.
    pub fn mark_rendered(&mut self, now: Instant) {
        self.pending = false;
        self.state = SchedulerState::Cooldown {
            until: now + self.debounce,
        };
    }

    /// Check for a trailing-edge render. Returns true when a cooldown has
    /// elapsed with requests still pending.
    pub fn poll(&mut self, now: Instant) -> bool {
        if let SchedulerState::Cooldown { until } = self.state {
            if now >= until {
                self.state = SchedulerState::Idle;
                return self.pending;
            }
        }
        false
    }

    /// The next moment the caller must call poll(), if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::Cooldown { until } if self.pending => Some(until),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_millis(16);

    #[test]
    fn test_first_request_arms_tick() {
        let mut s = RenderScheduler::new(DEBOUNCE);
        let t0 = Instant::now();
        assert!(!s.take_tick(t0));
        s.request();
        assert!(s.take_tick(t0));
        // Consumed.
        assert!(!s.take_tick(t0));
    }

    #[test]
    fn test_many_requests_coalesce_into_one_tick() {
        let mut s = RenderScheduler::new(DEBOUNCE);
        let t0 = Instant::now();
        for _ in 0..100 {
            s.request();
        }
        assert!(s.take_tick(t0));
        s.mark_rendered(t0);
        assert!(!s.take_tick(t0));
        assert!(!s.poll(t0 + DEBOUNCE));
    }

    #[test]
    fn test_request_during_cooldown_waits_for_trailing_edge() {
        let mut s = RenderScheduler::new(DEBOUNCE);
        let t0 = Instant::now();
        s.request();
        assert!(s.take_tick(t0));
        s.mark_rendered(t0);

        // Burst of mutations right after the render.
        s.request();
        s.request();
        assert!(!s.take_tick(t0 + Duration::from_millis(1)));
        assert!(!s.poll(t0 + Duration::from_millis(15)));
        // Trailing edge fires exactly once.
        assert!(s.poll(t0 + DEBOUNCE));
        s.mark_rendered(t0 + DEBOUNCE);
        assert!(!s.poll(t0 + DEBOUNCE * 2));
    }

    #[test]
    fn test_two_renders_at_least_debounce_apart() {
        let mut s = RenderScheduler::new(DEBOUNCE);
        let t0 = Instant::now();
        s.request();
        assert!(s.take_tick(t0));
        s.mark_rendered(t0);
        s.request();
        // No path to a second render before t0 + debounce.
        for ms in 0..16 {
            let t = t0 + Duration::from_millis(ms);
            assert!(!s.take_tick(t));
            assert!(!s.poll(t));
        }
        assert!(s.poll(t0 + DEBOUNCE));
    }

    #[test]
    fn test_request_after_cooldown_arms_fresh_tick() {
        let mut s = RenderScheduler::new(DEBOUNCE);
        let t0 = Instant::now();
        s.request();
        assert!(s.take_tick(t0));
        s.mark_rendered(t0);
        // Quiet through the cooldown.
        assert!(!s.poll(t0 + DEBOUNCE));
        s.request();
        assert!(s.take_tick(t0 + DEBOUNCE + Duration::from_millis(1)));
    }

    #[test]
    fn test_deadline_only_while_pending_in_cooldown() {
        let mut s = RenderScheduler::new(DEBOUNCE);
        let t0 = Instant::now();
        assert!(s.next_deadline().is_none());
        s.request();
        s.take_tick(t0);
        s.mark_rendered(t0);
        assert!(s.next_deadline().is_none());
        s.request();
        assert_eq!(s.next_deadline(), Some(t0 + DEBOUNCE));
    }
}
