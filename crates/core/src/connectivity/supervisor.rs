//! Connect / teardown supervisor
//!
//! Non-blocking sequencing over the radio link. The caller polls once per
//! control-loop tick; every operation carries its own ceiling and every
//! ceiling expiry has a defined outcome. Teardown is strictly ordered:
//! the cloud session must confirm down before the radio is powered off,
//! because powering off a radio with a live session leaves the modem in an
//! undefined state that only a full reset clears.

use crate::traits::link::{NetworkLink, SignalQuality};
use log::{info, warn};

/// Ceiling on a connection attempt.
pub const CONNECT_TIMEOUT_MS: u64 = 600_000;

/// Ceiling on teardown phase 1 (cloud session detach).
pub const CLOUD_DETACH_TIMEOUT_MS: u64 = 15_000;

/// Ceiling on teardown phase 2 (radio power-down).
pub const RADIO_OFF_TIMEOUT_MS: u64 = 30_000;

/// Result of polling an in-flight connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStatus {
    /// Still waiting on the link
    Pending,
    /// Cloud session established
    Connected,
    /// Ceiling expired without a session
    TimedOut,
}

/// Result of polling an in-flight teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStatus {
    /// A phase is still waiting for confirmation
    InProgress,
    /// Both phases confirmed; the radio is down
    Done,
    /// A phase missed its ceiling; the link state is unsafe
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TeardownPhase {
    CloudDetach { started_ms: u64 },
    RadioOff { started_ms: u64 },
}

/// Stateful supervisor for connect and teardown sequencing.
///
/// Holds only timing and phase state; the link itself is passed into each
/// call so the supervisor stays free of platform types.
pub struct ConnectivitySupervisor {
    connect_started_ms: Option<u64>,
    teardown: Option<TeardownPhase>,
}

impl ConnectivitySupervisor {
    pub fn new() -> Self {
        Self {
            connect_started_ms: None,
            teardown: None,
        }
    }

    /// Issue a connection request and start the timeout clock.
    pub fn start_connect(&mut self, now_ms: u64, link: &mut dyn NetworkLink) {
        link.request_connect();
        self.connect_started_ms = Some(now_ms);
    }

    /// Poll the in-flight connection attempt.
    ///
    /// Terminal results clear the attempt; a new `start_connect` is needed
    /// to try again.
    pub fn poll_connect(&mut self, now_ms: u64, link: &dyn NetworkLink) -> ConnectStatus {
        let Some(started_ms) = self.connect_started_ms else {
            return ConnectStatus::Pending;
        };

        if link.cloud_connected() {
            self.connect_started_ms = None;
            return ConnectStatus::Connected;
        }
        if now_ms.saturating_sub(started_ms) > CONNECT_TIMEOUT_MS {
            warn!("connection attempt exceeded {} s", CONNECT_TIMEOUT_MS / 1000);
            self.connect_started_ms = None;
            return ConnectStatus::TimedOut;
        }
        ConnectStatus::Pending
    }

    /// Seconds elapsed since the current connection attempt began.
    pub fn connect_elapsed_s(&self, now_ms: u64) -> u16 {
        match self.connect_started_ms {
            Some(started_ms) => (now_ms.saturating_sub(started_ms) / 1000) as u16,
            None => 0,
        }
    }

    /// Begin the ordered two-phase teardown.
    pub fn start_disconnect(&mut self, now_ms: u64, link: &mut dyn NetworkLink) {
        info!("disconnecting from the cloud");
        self.connect_started_ms = None;
        link.request_cloud_detach();
        self.teardown = Some(TeardownPhase::CloudDetach { started_ms: now_ms });
    }

    /// Drive the in-flight teardown one step.
    ///
    /// Phase 1 waits up to 15 s for the cloud session to confirm down, and
    /// only then requests radio power-off; phase 2 waits up to 30 s for the
    /// radio to confirm off. A missed ceiling yields `Failed` and the
    /// caller must treat the link as an error condition rather than retry.
    pub fn poll_disconnect(&mut self, now_ms: u64, link: &mut dyn NetworkLink) -> TeardownStatus {
        match self.teardown {
            None => TeardownStatus::Done,
            Some(TeardownPhase::CloudDetach { started_ms }) => {
                if !link.cloud_connected() {
                    link.request_radio_off();
                    self.teardown = Some(TeardownPhase::RadioOff { started_ms: now_ms });
                    return TeardownStatus::InProgress;
                }
                if now_ms.saturating_sub(started_ms) > CLOUD_DETACH_TIMEOUT_MS {
                    warn!("failed to disconnect the cloud session");
                    self.teardown = None;
                    return TeardownStatus::Failed;
                }
                TeardownStatus::InProgress
            }
            Some(TeardownPhase::RadioOff { started_ms }) => {
                if link.radio_off() {
                    info!("radio powered down");
                    self.teardown = None;
                    return TeardownStatus::Done;
                }
                if now_ms.saturating_sub(started_ms) > RADIO_OFF_TIMEOUT_MS {
                    warn!("failed to power down the radio");
                    self.teardown = None;
                    return TeardownStatus::Failed;
                }
                TeardownStatus::InProgress
            }
        }
    }

    /// Whether a teardown is mid-flight.
    pub fn teardown_in_progress(&self) -> bool {
        self.teardown.is_some()
    }

    /// Best-effort signal telemetry; unknown (zeros) when the radio cannot
    /// report.
    pub fn signal_quality(&self, link: &mut dyn NetworkLink) -> SignalQuality {
        link.signal_quality().unwrap_or_default()
    }
}

impl Default for ConnectivitySupervisor {
    fn default() -> Self {
        Self::new()
    }
}
