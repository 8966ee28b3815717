//! Monotonic millisecond clock
//!
//! The session compares deadlines against a wrapping 32-bit millisecond
//! counter, the way small hosts expose their uptime. All comparisons go
//! through the signed difference so a wrap of the counter is harmless.

use std::time::Instant;

/// Source of the wrapping millisecond counter read once per poll.
pub trait Clock {
    fn now_millis(&self) -> u32;
}

/// `Clock` backed by `std::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u32 {
        // Truncation is the wrap.
        self.origin.elapsed().as_millis() as u32
    }
}

/// Returns the instant `delay_ms` after `now`, wrapping.
pub fn deadline_after(now: u32, delay_ms: u32) -> u32 {
    now.wrapping_add(delay_ms)
}

/// True once `now` has reached or passed `deadline`.
pub fn has_elapsed(now: u32, deadline: u32) -> bool {
    (deadline.wrapping_sub(now) as i32) <= 0
}

/// Milliseconds from `start` to `now`, wrapping.
pub fn elapsed_since(start: u32, now: u32) -> u32 {
    now.wrapping_sub(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_in_future_has_not_elapsed() {
        let deadline = deadline_after(1_000, 500);
        assert!(!has_elapsed(1_499, deadline));
        assert!(has_elapsed(1_500, deadline));
        assert!(has_elapsed(9_000, deadline));
    }

    #[test]
    fn comparisons_survive_counter_wrap() {
        let now = u32::MAX - 100;
        let deadline = deadline_after(now, 1_000);
        assert!(deadline < now);
        assert!(!has_elapsed(now, deadline));
        assert!(!has_elapsed(now.wrapping_add(999), deadline));
        assert!(has_elapsed(now.wrapping_add(1_000), deadline));
        assert_eq!(elapsed_since(now, now.wrapping_add(250)), 250);
    }
}
