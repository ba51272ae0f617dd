//! Shared simulated clock

use field_node_core::traits::time::{TimeSource, WallClock};
use std::cell::Cell;
use std::rc::Rc;

struct ClockInner {
    ms: Cell<u64>,
    epoch_offset_s: Cell<i64>,
    valid: Cell<bool>,
}

/// Simulated monotonic + wall clock.
///
/// Clones share the same underlying time, so the power controller can
/// advance it through a sleep and every other simulated peripheral sees
/// the jump.
#[derive(Clone)]
pub struct SimClock {
    inner: Rc<ClockInner>,
}

impl SimClock {
    /// A valid clock starting at the given epoch second.
    pub fn starting_at(epoch_s: i64) -> Self {
        Self {
            inner: Rc::new(ClockInner {
                ms: Cell::new(0),
                epoch_offset_s: Cell::new(epoch_s),
                valid: Cell::new(true),
            }),
        }
    }

    /// An unsynchronized clock (cold RTC), epoch 0.
    pub fn unsynchronized() -> Self {
        let clock = Self::starting_at(0);
        clock.inner.valid.set(false);
        clock
    }

    /// Advance simulated time.
    pub fn advance_ms(&self, ms: u64) {
        self.inner.ms.set(self.inner.ms.get() + ms);
    }

    /// Advance simulated time by whole seconds.
    pub fn advance_s(&self, seconds: u64) {
        self.advance_ms(seconds * 1000);
    }

    /// Synchronize the wall clock to an epoch second, marking it valid.
    pub fn sync_epoch(&self, epoch_s: i64) {
        let elapsed_s = (self.inner.ms.get() / 1000) as i64;
        self.inner.epoch_offset_s.set(epoch_s - elapsed_s);
        self.inner.valid.set(true);
    }
}

impl TimeSource for SimClock {
    fn now_ms(&self) -> u64 {
        self.inner.ms.get()
    }
}

impl WallClock for SimClock {
    fn now(&self) -> i64 {
        self.inner.epoch_offset_s.get() + (self.inner.ms.get() / 1000) as i64
    }

    fn is_valid(&self) -> bool {
        self.inner.valid.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_time() {
        let a = SimClock::starting_at(100);
        let b = a.clone();
        a.advance_s(5);
        assert_eq!(b.now_ms(), 5_000);
        assert_eq!(b.now(), 105);
    }

    #[test]
    fn unsynchronized_is_invalid_until_synced() {
        let clock = SimClock::unsynchronized();
        assert!(!clock.is_valid());
        clock.sync_epoch(1_000);
        assert!(clock.is_valid());
        assert_eq!(clock.now(), 1_000);
    }
}
