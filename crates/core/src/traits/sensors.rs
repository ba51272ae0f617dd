//! Measurement provider interface trait
//!
//! The sensor subsystem (analog sampling, temperature compensation, fuel
//! gauge) is an external collaborator. The controller asks it for a fresh
//! set of readings and writes the results into the runtime state record
//! itself, keeping the record single-owner.

use crate::persist::BatteryState;

/// One complete set of sensor readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurements {
    /// Temperature-compensated distance in centimeters.
    pub distance_cm: u16,
    /// Enclosure temperature in degrees C.
    pub internal_temp_c: f32,
    /// Sensor-head temperature in degrees C.
    pub external_temp_c: f32,
    /// Battery state of charge, 0-100, or -1.0 when unknown.
    pub state_of_charge: f32,
    /// Battery charging state.
    pub battery_state: BatteryState,
}

impl Default for Measurements {
    fn default() -> Self {
        Self {
            distance_cm: 0,
            internal_temp_c: 0.0,
            external_temp_c: 0.0,
            state_of_charge: -1.0,
            battery_state: BatteryState::Unknown,
        }
    }
}

/// Measurement subsystem interface
pub trait MeasurementProvider {
    /// Sample all sensors and return the readings.
    fn take_measurements(&mut self) -> Measurements;
}

// ============================================================================
// Mock Implementation (always available for testing)
// ============================================================================

/// Mock provider returning a configurable reading.
pub struct MockSensors {
    /// Readings returned by every `take_measurements` call.
    pub readings: Measurements,
    /// Number of `take_measurements` calls.
    pub samples: u32,
}

impl MockSensors {
    pub fn new() -> Self {
        Self {
            readings: Measurements {
                distance_cm: 120,
                internal_temp_c: 21.5,
                external_temp_c: 19.0,
                state_of_charge: 80.0,
                battery_state: BatteryState::Discharging,
            },
            samples: 0,
        }
    }
}

impl Default for MockSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurementProvider for MockSensors {
    fn take_measurements(&mut self) -> Measurements {
        self.samples += 1;
        self.readings
    }
}
