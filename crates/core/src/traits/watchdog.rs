//! Hardware watchdog interface trait
//!
//! The watchdog is an external timer that hard-resets the device unless it
//! is periodically acknowledged. It is the last-resort liveness guarantee:
//! the duty-cycle controller must kick it once per control-loop iteration
//! in every reachable state except the deliberately-disarmed window around
//! deep-sleep entry.

use core::cell::Cell;

/// Hardware watchdog interface
pub trait WatchdogInterface {
    /// Start (or restart) the countdown with the given timeout.
    fn arm(&mut self, timeout_ms: u32);

    /// Acknowledge the watchdog, resetting the countdown.
    fn kick(&mut self);

    /// Stop the countdown.
    ///
    /// Used only around operations that must not be interrupted by a
    /// spurious reset, such as deep-sleep negotiation.
    fn disarm(&mut self);
}

// ============================================================================
// Mock Implementation (always available for testing)
// ============================================================================

/// Mock watchdog that records arm/kick/disarm activity.
#[derive(Clone, Default)]
pub struct MockWatchdog {
    armed: Cell<bool>,
    timeout_ms: Cell<u32>,
    kicks: Cell<u32>,
    disarms: Cell<u32>,
}

impl MockWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the countdown is currently running.
    pub fn is_armed(&self) -> bool {
        self.armed.get()
    }

    /// Timeout passed to the most recent `arm` call.
    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms.get()
    }

    /// Total number of `kick` calls.
    pub fn kicks(&self) -> u32 {
        self.kicks.get()
    }

    /// Total number of `disarm` calls.
    pub fn disarms(&self) -> u32 {
        self.disarms.get()
    }
}

impl WatchdogInterface for MockWatchdog {
    fn arm(&mut self, timeout_ms: u32) {
        self.armed.set(true);
        self.timeout_ms.set(timeout_ms);
    }

    fn kick(&mut self) {
        self.kicks.set(self.kicks.get() + 1);
    }

    fn disarm(&mut self) {
        self.armed.set(false);
        self.disarms.set(self.disarms.get() + 1);
    }
}
