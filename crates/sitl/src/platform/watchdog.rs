//! Simulated hardware watchdog

use crate::platform::SimClock;
use field_node_core::traits::time::TimeSource;
use field_node_core::traits::watchdog::WatchdogInterface;

/// Simulated watchdog that detects starvation instead of resetting.
///
/// The world asserts [`SimWatchdog::starved`] stayed false over a run,
/// which is the simulation's stand-in for the hardware reset.
pub struct SimWatchdog {
    clock: SimClock,
    armed: bool,
    timeout_ms: u32,
    last_service_ms: u64,
    /// Set as soon as the countdown is ever observed expired
    starved: bool,
    /// Total kicks observed
    pub kicks: u64,
}

impl SimWatchdog {
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            armed: false,
            timeout_ms: 0,
            last_service_ms: 0,
            starved: false,
            kicks: 0,
        }
    }

    /// Whether the countdown ever expired while armed.
    pub fn starved(&self) -> bool {
        self.starved
    }

    /// Check the countdown; called by the world after every step.
    pub fn observe(&mut self) {
        if self.armed
            && self
                .clock
                .now_ms()
                .saturating_sub(self.last_service_ms)
                > u64::from(self.timeout_ms)
        {
            self.starved = true;
        }
    }
}

impl WatchdogInterface for SimWatchdog {
    fn arm(&mut self, timeout_ms: u32) {
        self.armed = true;
        self.timeout_ms = timeout_ms;
        self.last_service_ms = self.clock.now_ms();
    }

    fn kick(&mut self) {
        self.observe();
        self.kicks += 1;
        self.last_service_ms = self.clock.now_ms();
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}
