use std::time::{Duration, Instant};

/// Identifies one requested paint. Handles are never reused.
pub type FrameHandle = u64;

/// Source of "next paint" boundaries for the detection loop.
pub trait FrameClock: Send {
    /// Blocks until the next paint boundary.
    fn wait_for_next_paint(&mut self);
}

/// Paces paints at a fixed rate, like a display refresh. A late caller is
/// not made to catch up with a burst of immediate paints.
pub struct PacedClock {
    interval: Duration,
    next: Option<Instant>,
}

impl PacedClock {
    pub fn new(rate_hz: f64) -> Self {
        let rate = if rate_hz.is_finite() && rate_hz > 0.0 {
            rate_hz
        } else {
            1.0
        };
        Self {
            interval: Duration::from_secs_f64(1.0 / rate),
            next: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl FrameClock for PacedClock {
    fn wait_for_next_paint(&mut self) {
        let now = Instant::now();
        let deadline = match self.next {
            Some(next) if next > now => next,
            _ => now,
        };
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        self.next = Some(deadline + self.interval);
    }
}

/// Never waits; paints happen as fast as the caller ticks.
#[derive(Default)]
pub struct ImmediateClock;

impl FrameClock for ImmediateClock {
    fn wait_for_next_paint(&mut self) {}
}

/// At most one pending paint request, cancellable by handle.
///
/// The detection loop requests a paint at the end of every cycle and the
/// webcam controller cancels it on stop. Only the session's control thread
/// touches the scheduler.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    next_handle: FrameHandle,
    pending: Option<FrameHandle>,
    requested: usize,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the next paint. If one is already pending its handle is
    /// returned instead, so the loop never overlaps itself.
    pub fn request(&mut self) -> FrameHandle {
        if let Some(handle) = self.pending {
            return handle;
        }
        self.next_handle += 1;
        self.requested += 1;
        self.pending = Some(self.next_handle);
        self.next_handle
    }

    /// Returns `false` if `handle` is not the pending request.
    pub fn cancel(&mut self, handle: FrameHandle) -> bool {
        if self.pending == Some(handle) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn cancel_pending(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Consumes the pending request so it can fire.
    pub fn take_due(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }

    /// Total requests issued, including cancelled ones.
    pub fn requested_count(&self) -> usize {
        self.requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_then_fire() {
        let mut scheduler = FrameScheduler::new();
        let handle = scheduler.request();
        assert!(scheduler.is_pending());
        assert_eq!(scheduler.take_due(), Some(handle));
        assert!(!scheduler.is_pending());
        assert_eq!(scheduler.take_due(), None);
    }

    #[test]
    fn test_duplicate_request_reuses_pending_handle() {
        let mut scheduler = FrameScheduler::new();
        let a = scheduler.request();
        let b = scheduler.request();
        assert_eq!(a, b);
        assert_eq!(scheduler.requested_count(), 1);
    }

    #[test]
    fn test_cancel_only_matches_pending_handle() {
        let mut scheduler = FrameScheduler::new();
        let first = scheduler.request();
        scheduler.take_due();
        let second = scheduler.request();
        assert_ne!(first, second);
        assert!(!scheduler.cancel(first));
        assert!(scheduler.cancel(second));
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_cancel_pending_is_idempotent() {
        let mut scheduler = FrameScheduler::new();
        scheduler.request();
        assert!(scheduler.cancel_pending().is_some());
        assert!(scheduler.cancel_pending().is_none());
    }

    #[test]
    fn test_paced_clock_interval() {
        let clock = PacedClock::new(50.0);
        assert!((clock.interval().as_secs_f64() - 0.02).abs() < 1e-9);
        assert_eq!(PacedClock::new(0.0).interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_paced_clock_spaces_paints() {
        let mut clock = PacedClock::new(100.0);
        let start = Instant::now();
        for _ in 0..3 {
            clock.wait_for_next_paint();
        }
        // First paint is immediate; the next two wait one interval each.
        assert!(start.elapsed() >= Duration::from_millis(19));
    }
}
