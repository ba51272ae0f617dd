//! Interrupt-raised flags
//!
//! Concurrency in this system exists only at the hardware-interrupt
//! boundary: the user switch, the out-of-memory notification, and the
//! cloud response handler each set a flag from interrupt/handler context.
//! The control loop is the sole reader, consuming each flag at one
//! designated point per tick, so atomicity is the only synchronization
//! needed.

use core::sync::atomic::{AtomicBool, Ordering};

/// Single-producer single-consumer event flags.
#[derive(Debug, Default)]
pub struct InterruptFlags {
    user_override: AtomicBool,
    out_of_memory: AtomicBool,
    response_received: AtomicBool,
}

impl InterruptFlags {
    pub const fn new() -> Self {
        Self {
            user_override: AtomicBool::new(false),
            out_of_memory: AtomicBool::new(false),
            response_received: AtomicBool::new(false),
        }
    }

    /// Signal a user-switch edge (interrupt context).
    pub fn raise_user_override(&self) {
        self.user_override.store(true, Ordering::Release);
    }

    /// Consume a pending user-switch edge (control loop only).
    pub fn take_user_override(&self) -> bool {
        self.user_override.swap(false, Ordering::AcqRel)
    }

    /// Signal the out-of-memory condition (handler context).
    pub fn raise_out_of_memory(&self) {
        self.out_of_memory.store(true, Ordering::Release);
    }

    /// Consume a pending out-of-memory signal (control loop only).
    pub fn take_out_of_memory(&self) -> bool {
        self.out_of_memory.swap(false, Ordering::AcqRel)
    }

    /// Signal that the cloud acknowledged the last report (handler
    /// context).
    pub fn raise_response_received(&self) {
        self.response_received.store(true, Ordering::Release);
    }

    /// Consume a pending response acknowledgement (control loop only).
    pub fn take_response_received(&self) -> bool {
        self.response_received.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_clears_the_flag() {
        let flags = InterruptFlags::new();
        assert!(!flags.take_user_override());

        flags.raise_user_override();
        assert!(flags.take_user_override());
        assert!(!flags.take_user_override());
    }

    #[test]
    fn flags_are_independent() {
        let flags = InterruptFlags::new();
        flags.raise_out_of_memory();
        assert!(!flags.take_user_override());
        assert!(!flags.take_response_received());
        assert!(flags.take_out_of_memory());
    }
}
