//! Radio/cloud link interface trait
//!
//! The seam between the connectivity supervisor and the actual modem and
//! cloud session driver. All operations are request/confirm pairs: the
//! supervisor issues a request and polls the matching query once per tick
//! until it confirms or the supervisor's ceiling expires.

/// Best-effort signal telemetry in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignalQuality {
    pub strength_pct: u8,
    pub quality_pct: u8,
}

/// Radio and cloud-session driver interface
pub trait NetworkLink {
    /// Begin bringing up the radio and cloud session.
    fn request_connect(&mut self);

    /// Whether the cloud session is established.
    fn cloud_connected(&self) -> bool;

    /// Begin tearing down the cloud session (teardown phase 1).
    fn request_cloud_detach(&mut self);

    /// Begin powering down the radio (teardown phase 2).
    ///
    /// Must only be requested after the cloud session is confirmed down;
    /// powering off a radio with a live session leaves the modem in an
    /// undefined state.
    fn request_radio_off(&mut self);

    /// Whether the radio is fully powered down.
    fn radio_off(&self) -> bool;

    /// Current signal telemetry, if the radio can report it.
    fn signal_quality(&mut self) -> Option<SignalQuality>;
}

// ============================================================================
// Mock Implementation (always available for testing)
// ============================================================================

/// Mock link with directly scriptable connection state.
///
/// Tests flip the public fields between ticks to simulate the modem.
pub struct MockLink {
    /// Reported cloud-session state.
    pub cloud_up: bool,
    /// Reported radio power state.
    pub radio_is_off: bool,
    /// When set, `request_connect` immediately establishes the session.
    pub connect_instantly: bool,
    /// When set, `request_cloud_detach` immediately drops the session.
    pub detach_instantly: bool,
    /// When set, `request_radio_off` immediately powers down.
    pub power_off_instantly: bool,
    /// Signal telemetry returned by `signal_quality`.
    pub signal: Option<SignalQuality>,
    /// Number of `request_connect` calls.
    pub connect_requests: u32,
    /// Number of `request_cloud_detach` calls.
    pub detach_requests: u32,
    /// Number of `request_radio_off` calls.
    pub radio_off_requests: u32,
}

impl MockLink {
    /// A link that is down with the radio off (post-boot state).
    pub fn new() -> Self {
        Self {
            cloud_up: false,
            radio_is_off: true,
            connect_instantly: false,
            detach_instantly: false,
            power_off_instantly: false,
            signal: Some(SignalQuality {
                strength_pct: 60,
                quality_pct: 80,
            }),
            connect_requests: 0,
            detach_requests: 0,
            radio_off_requests: 0,
        }
    }

    /// A link that completes every request on the next poll.
    pub fn responsive() -> Self {
        Self {
            connect_instantly: true,
            detach_instantly: true,
            power_off_instantly: true,
            ..Self::new()
        }
    }
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkLink for MockLink {
    fn request_connect(&mut self) {
        self.connect_requests += 1;
        self.radio_is_off = false;
        if self.connect_instantly {
            self.cloud_up = true;
        }
    }

    fn cloud_connected(&self) -> bool {
        self.cloud_up
    }

    fn request_cloud_detach(&mut self) {
        self.detach_requests += 1;
        if self.detach_instantly {
            self.cloud_up = false;
        }
    }

    fn request_radio_off(&mut self) {
        self.radio_off_requests += 1;
        if self.power_off_instantly {
            self.radio_is_off = true;
        }
    }

    fn radio_off(&self) -> bool {
        self.radio_is_off
    }

    fn signal_quality(&mut self) -> Option<SignalQuality> {
        self.signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responsive_link_connects_on_request() {
        let mut link = MockLink::responsive();
        assert!(!link.cloud_connected());
        link.request_connect();
        assert!(link.cloud_connected());
        assert!(!link.radio_off());
    }

    #[test]
    fn responsive_link_tears_down_in_order() {
        let mut link = MockLink::responsive();
        link.request_connect();

        link.request_cloud_detach();
        assert!(!link.cloud_connected());
        assert!(!link.radio_off());

        link.request_radio_off();
        assert!(link.radio_off());
    }

    #[test]
    fn unresponsive_link_stays_pending() {
        let mut link = MockLink::new();
        link.request_connect();
        assert!(!link.cloud_connected());
        assert_eq!(link.connect_requests, 1);
    }
}
