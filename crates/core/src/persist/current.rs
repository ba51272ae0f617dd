//! Runtime state record
//!
//! Last-observed sensor and battery state, rewritten every duty cycle and
//! persisted so a reboot resumes from the last known readings rather than
//! zeros. Same header/layout discipline as the configuration record.

use super::store::PersistentRecord;

/// Runtime-state record magic ("CURS")
pub const CURRENT_STATE_MAGIC: u32 = 0x4355_5253;

/// Current runtime-state format version
pub const CURRENT_STATE_VERSION: u16 = 2;

/// Version 1 payload: fields through `last_alert_time`
const V1_PAYLOAD_LEN: usize = 28;

/// Version 2 payload: v1 plus `state_of_charge`
const V2_PAYLOAD_LEN: usize = 32;

/// Validation bound: the rangefinder cannot report past 1024 cm
pub const MAX_DISTANCE_CM: u16 = 1024;

/// Sentinel state of charge when the fuel gauge has no reading
pub const SOC_UNKNOWN: f32 = -1.0;

/// Battery charging state as reported by the power management IC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryState {
    Unknown = 0,
    NotCharging = 1,
    Charging = 2,
    Charged = 3,
    Discharging = 4,
    Fault = 5,
    Disconnected = 6,
}

impl BatteryState {
    /// Convert from a raw byte, defaulting to `Unknown` for unmapped values
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::NotCharging,
            2 => Self::Charging,
            3 => Self::Charged,
            4 => Self::Discharging,
            5 => Self::Fault,
            6 => Self::Disconnected,
            _ => Self::Unknown,
        }
    }

    /// Human-readable label for status messages and reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::NotCharging => "Not Charging",
            Self::Charging => "Charging",
            Self::Charged => "Charged",
            Self::Discharging => "Discharging",
            Self::Fault => "Fault",
            Self::Disconnected => "Disconnected",
        }
    }
}

/// Runtime state record
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentState {
    /// Last measured distance in centimeters (0-1024)
    pub distance_cm: u16,
    /// When the last measurement was taken (epoch s)
    pub last_sample_time: i64,
    /// Enclosure temperature in degrees C
    pub internal_temp_c: f32,
    /// Sensor-head temperature in degrees C
    pub external_temp_c: f32,
    /// Current alert code, 0 when clear
    pub alert_code: u8,
    /// Battery charging state
    pub battery_state: BatteryState,
    /// When the current alert was raised (epoch s)
    pub last_alert_time: i64,
    /// Battery state of charge, 0-100, or -1 when unknown
    pub state_of_charge: f32,
}

impl PersistentRecord for CurrentState {
    const MAGIC: u32 = CURRENT_STATE_MAGIC;
    const VERSION: u16 = CURRENT_STATE_VERSION;
    const PAYLOAD_LEN: usize = V2_PAYLOAD_LEN;
    const SAVE_DELAY_MS: u32 = 250;
    const NAME: &'static str = "current";

    fn defaults() -> Self {
        Self {
            distance_cm: 0,
            last_sample_time: 0,
            internal_temp_c: 0.0,
            external_temp_c: 0.0,
            alert_code: 0,
            battery_state: BatteryState::Unknown,
            last_alert_time: 0,
            state_of_charge: SOC_UNKNOWN,
        }
    }

    fn encode(&self, buf: &mut [u8]) {
        buf[0..2].copy_from_slice(&self.distance_cm.to_le_bytes());
        buf[2..10].copy_from_slice(&self.last_sample_time.to_le_bytes());
        buf[10..14].copy_from_slice(&self.internal_temp_c.to_le_bytes());
        buf[14..18].copy_from_slice(&self.external_temp_c.to_le_bytes());
        buf[18] = self.alert_code;
        buf[19] = self.battery_state as u8;
        buf[20..28].copy_from_slice(&self.last_alert_time.to_le_bytes());
        buf[28..32].copy_from_slice(&self.state_of_charge.to_le_bytes());
    }

    fn decode(buf: &[u8], version: u16) -> Option<Self> {
        let expected = match version {
            1 => V1_PAYLOAD_LEN,
            2 => V2_PAYLOAD_LEN,
            _ => return None,
        };
        if buf.len() != expected {
            return None;
        }

        let battery_raw = buf[19];
        if battery_raw > BatteryState::Disconnected as u8 {
            return None;
        }

        let mut state = Self::defaults();
        state.distance_cm = u16::from_le_bytes([buf[0], buf[1]]);
        state.last_sample_time = i64::from_le_bytes(buf[2..10].try_into().ok()?);
        state.internal_temp_c = f32::from_le_bytes(buf[10..14].try_into().ok()?);
        state.external_temp_c = f32::from_le_bytes(buf[14..18].try_into().ok()?);
        state.alert_code = buf[18];
        state.battery_state = BatteryState::from_u8(battery_raw);
        state.last_alert_time = i64::from_le_bytes(buf[20..28].try_into().ok()?);

        // state_of_charge was appended in version 2; older records report
        // the unknown sentinel until the next measurement
        if version >= 2 {
            state.state_of_charge = f32::from_le_bytes(buf[28..32].try_into().ok()?);
        }

        Some(state)
    }

    fn validate(&self) -> bool {
        if self.distance_cm > MAX_DISTANCE_CM {
            log::info!("current state not valid: distance = {} cm", self.distance_cm);
            return false;
        }
        let soc = self.state_of_charge;
        if soc != SOC_UNKNOWN && !(0.0..=100.0).contains(&soc) {
            log::info!("current state not valid: state of charge = {}", soc);
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let state = CurrentState::defaults();
        assert!(state.validate());
        assert_eq!(state.state_of_charge, SOC_UNKNOWN);
        assert_eq!(state.battery_state, BatteryState::Unknown);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let state = CurrentState {
            distance_cm: 512,
            last_sample_time: 1_700_003_600,
            internal_temp_c: 23.75,
            external_temp_c: -4.5,
            alert_code: 12,
            battery_state: BatteryState::Charging,
            last_alert_time: 1_700_000_000,
            state_of_charge: 87.5,
        };

        let mut buf = [0u8; CurrentState::PAYLOAD_LEN];
        state.encode(&mut buf);
        let decoded = CurrentState::decode(&buf, CURRENT_STATE_VERSION).unwrap();

        assert_eq!(state, decoded);
    }

    #[test]
    fn v1_payload_defaults_state_of_charge() {
        let state = CurrentState {
            distance_cm: 100,
            state_of_charge: 55.0,
            ..CurrentState::defaults()
        };
        let mut buf = [0u8; CurrentState::PAYLOAD_LEN];
        state.encode(&mut buf);

        let decoded = CurrentState::decode(&buf[..28], 1).unwrap();
        assert_eq!(decoded.distance_cm, 100);
        assert_eq!(decoded.state_of_charge, SOC_UNKNOWN);
    }

    #[test]
    fn invalid_battery_byte_rejected() {
        let state = CurrentState::defaults();
        let mut buf = [0u8; CurrentState::PAYLOAD_LEN];
        state.encode(&mut buf);
        buf[19] = 9;
        assert!(CurrentState::decode(&buf, 2).is_none());
    }

    #[test]
    fn distance_out_of_bound_invalid() {
        let mut state = CurrentState::defaults();
        state.distance_cm = 1025;
        assert!(!state.validate());
    }

    #[test]
    fn soc_bounds() {
        let mut state = CurrentState::defaults();
        state.state_of_charge = 100.0;
        assert!(state.validate());
        state.state_of_charge = 101.0;
        assert!(!state.validate());
        state.state_of_charge = -0.5;
        assert!(!state.validate());
        state.state_of_charge = SOC_UNKNOWN;
        assert!(state.validate());
    }

    #[test]
    fn battery_state_from_u8_defaults_unknown() {
        assert_eq!(BatteryState::from_u8(4), BatteryState::Discharging);
        assert_eq!(BatteryState::from_u8(200), BatteryState::Unknown);
    }

    #[test]
    fn battery_state_labels() {
        assert_eq!(BatteryState::NotCharging.label(), "Not Charging");
        assert_eq!(BatteryState::Disconnected.label(), "Disconnected");
    }
}
