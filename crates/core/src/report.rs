//! Outbound report event and publish sink
//!
//! The publish queue and wire format are external; this module defines the
//! fields the core hands off and the seam it hands them through. Sending
//! never blocks the control loop: `send_report` only enqueues, and the
//! delivery acknowledgement comes back later through the response flag.

use crate::persist::{BatteryState, CurrentState, SystemConfig};
use crate::traits::sensors::Measurements;

/// One outbound telemetry event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub distance_cm: u16,
    pub state_of_charge: f32,
    pub battery_state: BatteryState,
    pub internal_temp_c: f32,
    pub reset_count: u8,
    pub alert_code: u8,
    pub connect_duration_s: u16,
    /// Epoch seconds at emission
    pub timestamp: i64,
}

impl Report {
    /// Assemble a report from the two durable records.
    pub fn from_records(config: &SystemConfig, current: &CurrentState, timestamp: i64) -> Self {
        Self {
            distance_cm: current.distance_cm,
            state_of_charge: current.state_of_charge,
            battery_state: current.battery_state,
            internal_temp_c: current.internal_temp_c,
            reset_count: config.reset_count,
            alert_code: current.alert_code,
            connect_duration_s: config.last_connection_duration_s,
            timestamp,
        }
    }
}

/// Publish queue interface
pub trait ReportSink {
    /// Hand a report to the publish queue. Returns whether it was
    /// enqueued; delivery is asynchronous.
    fn send_report(&mut self, report: &Report) -> bool;

    /// Best-effort diagnostic publish (verbose notices, command replies).
    fn publish(&mut self, topic: &str, message: &str);
}

/// Assemble the hourly event, hand it to the publish queue, and clear the
/// alert code now that it has been reported.
///
/// Returns whether the queue accepted the event; either way the in-memory
/// alert is cleared, matching the at-most-once alert semantics.
pub fn emit_report(
    config: &SystemConfig,
    current: &mut crate::persist::RecordStore<CurrentState>,
    sink: &mut dyn ReportSink,
    wall_now: i64,
    now_ms: u64,
) -> bool {
    let event = Report::from_records(config, current.get(), wall_now);
    let queued = sink.send_report(&event);
    if !queued {
        log::warn!("publish queue refused the report");
    }
    log::info!(
        "report queued: distance {} cm, battery {}% ({})",
        event.distance_cm,
        event.state_of_charge,
        event.battery_state.label()
    );
    current.set(now_ms, |c| c.alert_code = 0);
    queued
}

/// Apply a fresh set of readings to the runtime record fields.
///
/// The caller stamps `last_sample_time` itself since only it knows the
/// wall clock.
pub fn apply_measurements(current: &mut CurrentState, readings: &Measurements) {
    current.distance_cm = readings.distance_cm;
    current.internal_temp_c = readings.internal_temp_c;
    current.external_temp_c = readings.external_temp_c;
    current.state_of_charge = readings.state_of_charge;
    current.battery_state = readings.battery_state;
}

// ============================================================================
// Mock Implementation (always available for testing)
// ============================================================================

/// Mock sink recording enqueued reports.
pub struct MockSink {
    /// Reports handed to `send_report`, newest last.
    pub reports: heapless::Vec<Report, 64>,
    /// Number of `publish` calls.
    pub publishes: u32,
    /// Value returned by `send_report`.
    pub accept: bool,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            reports: heapless::Vec::new(),
            publishes: 0,
            accept: true,
        }
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportSink for MockSink {
    fn send_report(&mut self, report: &Report) -> bool {
        self.reports.push(*report).ok();
        self.accept
    }

    fn publish(&mut self, _topic: &str, _message: &str) {
        self.publishes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::store::PersistentRecord;

    #[test]
    fn report_pulls_fields_from_both_records() {
        let mut config = SystemConfig::defaults();
        config.reset_count = 2;
        config.last_connection_duration_s = 17;

        let mut current = CurrentState::defaults();
        current.distance_cm = 300;
        current.alert_code = 4;
        current.state_of_charge = 66.0;

        let report = Report::from_records(&config, &current, 1_700_000_000);
        assert_eq!(report.distance_cm, 300);
        assert_eq!(report.alert_code, 4);
        assert_eq!(report.reset_count, 2);
        assert_eq!(report.connect_duration_s, 17);
        assert_eq!(report.timestamp, 1_700_000_000);
    }

    #[test]
    fn apply_measurements_writes_all_fields() {
        let mut current = CurrentState::defaults();
        let readings = Measurements {
            distance_cm: 250,
            internal_temp_c: 30.0,
            external_temp_c: 28.5,
            state_of_charge: 72.0,
            battery_state: BatteryState::Charged,
        };
        apply_measurements(&mut current, &readings);
        assert_eq!(current.distance_cm, 250);
        assert_eq!(current.battery_state, BatteryState::Charged);
        assert_eq!(current.state_of_charge, 72.0);
    }
}
