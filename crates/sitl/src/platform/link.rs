//! Simulated radio/cloud link

use crate::platform::SimClock;
use field_node_core::traits::link::{NetworkLink, SignalQuality};
use field_node_core::traits::time::TimeSource;
use std::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session {
    Down,
    Connecting { ready_at_ms: u64 },
    Up,
    Detaching { down_at_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Radio {
    On,
    PoweringOff { off_at_ms: u64 },
    Off,
}

/// Scripted link: each request completes after a configured delay, or
/// never when the delay is `None` (fault injection).
pub struct SimLink {
    clock: SimClock,
    /// Time for a connection attempt to come up; `None` = never connects
    pub connect_delay_ms: Option<u64>,
    /// Time for the cloud session to detach; `None` = hangs
    pub detach_delay_ms: Option<u64>,
    /// Time for the radio to power down; `None` = hangs
    pub radio_off_delay_ms: Option<u64>,
    /// Signal telemetry reported once connected
    pub signal: Option<SignalQuality>,
    /// Number of connection requests issued by the core
    pub connect_requests: u32,
    session: Cell<Session>,
    radio: Cell<Radio>,
}

impl SimLink {
    /// A link that completes every request after short realistic delays.
    pub fn responsive(clock: SimClock) -> Self {
        Self {
            clock,
            connect_delay_ms: Some(5_000),
            detach_delay_ms: Some(500),
            radio_off_delay_ms: Some(1_000),
            signal: Some(SignalQuality {
                strength_pct: 72,
                quality_pct: 88,
            }),
            connect_requests: 0,
            session: Cell::new(Session::Down),
            radio: Cell::new(Radio::Off),
        }
    }

    /// A link whose connection attempts never complete.
    pub fn unreachable(clock: SimClock) -> Self {
        Self {
            connect_delay_ms: None,
            ..Self::responsive(clock)
        }
    }

    fn refresh(&self) {
        let now = self.clock.now_ms();
        if let Session::Connecting { ready_at_ms } = self.session.get() {
            if now >= ready_at_ms {
                self.session.set(Session::Up);
            }
        }
        if let Session::Detaching { down_at_ms } = self.session.get() {
            if now >= down_at_ms {
                self.session.set(Session::Down);
            }
        }
        if let Radio::PoweringOff { off_at_ms } = self.radio.get() {
            if now >= off_at_ms {
                self.radio.set(Radio::Off);
            }
        }
    }
}

impl NetworkLink for SimLink {
    fn request_connect(&mut self) {
        self.connect_requests += 1;
        self.radio.set(Radio::On);
        match self.connect_delay_ms {
            Some(delay) => self.session.set(Session::Connecting {
                ready_at_ms: self.clock.now_ms() + delay,
            }),
            // Radio is up but the session never establishes
            None => self.session.set(Session::Connecting {
                ready_at_ms: u64::MAX,
            }),
        }
    }

    fn cloud_connected(&self) -> bool {
        self.refresh();
        self.session.get() == Session::Up
    }

    fn request_cloud_detach(&mut self) {
        self.refresh();
        if matches!(self.session.get(), Session::Up | Session::Connecting { .. }) {
            match self.detach_delay_ms {
                Some(delay) => self.session.set(Session::Detaching {
                    down_at_ms: self.clock.now_ms() + delay,
                }),
                None => self.session.set(Session::Detaching {
                    down_at_ms: u64::MAX,
                }),
            }
        }
    }

    fn request_radio_off(&mut self) {
        match self.radio_off_delay_ms {
            Some(delay) => self.radio.set(Radio::PoweringOff {
                off_at_ms: self.clock.now_ms() + delay,
            }),
            None => self.radio.set(Radio::PoweringOff { off_at_ms: u64::MAX }),
        }
    }

    fn radio_off(&self) -> bool {
        self.refresh();
        self.radio.get() == Radio::Off
    }

    fn signal_quality(&mut self) -> Option<SignalQuality> {
        self.signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connects_after_delay() {
        let clock = SimClock::starting_at(0);
        let mut link = SimLink::responsive(clock.clone());
        link.request_connect();
        assert!(!link.cloud_connected());

        clock.advance_ms(5_000);
        assert!(link.cloud_connected());
        assert!(!link.radio_off());
    }

    #[test]
    fn unreachable_never_connects() {
        let clock = SimClock::starting_at(0);
        let mut link = SimLink::unreachable(clock.clone());
        link.request_connect();
        clock.advance_s(3_600);
        assert!(!link.cloud_connected());
    }

    #[test]
    fn teardown_completes_in_phases() {
        let clock = SimClock::starting_at(0);
        let mut link = SimLink::responsive(clock.clone());
        link.request_connect();
        clock.advance_ms(5_000);
        assert!(link.cloud_connected());

        link.request_cloud_detach();
        clock.advance_ms(500);
        assert!(!link.cloud_connected());

        link.request_radio_off();
        clock.advance_ms(1_000);
        assert!(link.radio_off());
    }
}
