use std::time::{Duration, Instant};

/// Dwell time before a hovered character is looked up.
pub const HOVER_OPEN_DELAY: Duration = Duration::from_millis(300);
/// Grace period after the pointer leaves before the hover popup closes.
pub const HOVER_CLOSE_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
struct Pending<T> {
    deadline: Instant,
    payload: T,
}

/// Single-slot timer that coalesces bursts of input into one signal.
///
/// The host event loop owns the clock: it schedules with the time of the
/// input event and calls [`Debouncer::poll`] once [`Debouncer::next_deadline`]
/// has passed. Scheduling again before the deadline replaces the pending
/// payload and restarts the delay, so the last event of a burst wins.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Start the delay from `now`, superseding any pending payload.
    /// Returns true when a pending payload was superseded.
    pub fn schedule(&mut self, now: Instant, payload: T) -> bool {
        self.pending
            .replace(Pending {
                deadline: now + self.delay,
                payload,
            })
            .is_some()
    }

    /// Drop the pending payload, if any. Returns true when one was dropped.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }

    /// Yield the payload once its deadline has been reached. Fires at most
    /// once per schedule.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(pending) if now >= pending.deadline => {
                self.pending.take().map(|pending| pending.payload)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_fires_after_delay() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(HOVER_OPEN_DELAY);

        debouncer.schedule(start, 1);
        assert_eq!(debouncer.poll(start + ms(299)), None);
        assert_eq!(debouncer.poll(start + ms(300)), Some(1));
        assert_eq!(debouncer.poll(start + ms(600)), None);
        assert_eq!(debouncer.next_deadline(), None);
    }

    #[test]
    fn test_burst_coalesces_to_last_payload() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(HOVER_OPEN_DELAY);

        let mut fired = Vec::new();
        for step in 0..10u64 {
            let now = start + ms(step * 50);
            debouncer.schedule(now, step);
            if let Some(value) = debouncer.poll(now) {
                fired.push(value);
            }
        }
        // Last schedule was at 450ms.
        assert_eq!(debouncer.next_deadline(), Some(start + ms(750)));
        if let Some(value) = debouncer.poll(start + ms(749)) {
            fired.push(value);
        }
        if let Some(value) = debouncer.poll(start + ms(750)) {
            fired.push(value);
        }
        assert_eq!(fired, vec![9]);
    }

    #[test]
    fn test_schedule_reports_superseded() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(HOVER_CLOSE_GRACE);
        assert!(!debouncer.schedule(start, ()));
        assert!(debouncer.schedule(start + ms(10), ()));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(HOVER_CLOSE_GRACE);
        debouncer.schedule(start, "leave");
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());
        assert_eq!(debouncer.poll(start + ms(1000)), None);
        assert_eq!(debouncer.next_deadline(), None);
    }
}
