//! System configuration record
//!
//! Rarely-changing durable configuration: power policy flags, operating
//! window, sensor selection, and the connection bookkeeping the duty cycle
//! consumes at boot. Serialized at fixed little-endian offsets; the layout
//! is append-only across versions, so existing offsets never change
//! meaning.

use super::store::PersistentRecord;
use bitflags::bitflags;
use heapless::String;

/// Configuration record magic ("SYSC")
pub const SYS_CONFIG_MAGIC: u32 = 0x5359_5343;

/// Current configuration format version
pub const SYS_CONFIG_VERSION: u16 = 2;

/// Version 1 payload: fields through `last_connection`
const V1_PAYLOAD_LEN: usize = 24;

/// Version 2 payload: v1 plus `last_cloud_response` and the timezone slot
const V2_PAYLOAD_LEN: usize = 72;

/// Maximum timezone identifier length (POSIX TZ string)
pub const TIMEZONE_MAX_LEN: usize = 38;

/// Validation bound: open hour is a morning hour
pub const MAX_OPEN_HOUR: u8 = 12;

/// Validation bound: close hour
pub const MAX_CLOSE_HOUR: u8 = 24;

/// Validation bound: connection attempts are capped at 600 s, so anything
/// past 900 s can only be corruption
pub const MAX_CONNECTION_DURATION_S: u16 = 900;

/// Validation bound: reset counter
pub const MAX_RESET_COUNT: u8 = 200;

const DEFAULT_TIMEZONE: &str = "ANAT-12";

bitflags! {
    /// Persisted boolean configuration, packed into one byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SystemFlags: u8 {
        /// Extra messaging to the cloud
        const VERBOSE = 0b0000_0001;
        /// Powered by a solar panel rather than utility power
        const SOLAR_POWER = 0b0000_0010;
        /// Run disconnected between reports to save battery
        const LOW_POWER = 0b0000_0100;
        /// Battery too low to permit connecting at all
        const LOW_BATTERY = 0b0000_1000;
        /// Device carries the alternate-carrier SIM
        const CARRIER_SIM = 0b0001_0000;
    }
}

/// System configuration record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemConfig {
    /// Version of the application data layout (distinct from the header
    /// format version)
    pub structures_version: u8,
    /// Packed boolean configuration
    pub flags: SystemFlags,
    /// Abnormal-reset counter
    pub reset_count: u8,
    /// Hour the operating window opens (0-12)
    pub open_hour: u8,
    /// Hour the operating window closes (13-24)
    pub close_hour: u8,
    /// Sensor type selector: 0 = axle counter, 1 = presence counter
    pub sensor_type: u8,
    /// How long the last cloud connection took, in seconds (0-900)
    pub last_connection_duration_s: u16,
    /// When the last report was handed to the publish queue (epoch s)
    pub last_report: i64,
    /// When the cloud session was last established (epoch s)
    pub last_connection: i64,
    /// When the cloud last acknowledged a report (epoch s)
    pub last_cloud_response: i64,
    /// POSIX timezone identifier, carried for the local-time subsystem
    pub timezone: String<TIMEZONE_MAX_LEN>,
}

impl SystemConfig {
    pub fn verbose(&self) -> bool {
        self.flags.contains(SystemFlags::VERBOSE)
    }

    pub fn set_verbose(&mut self, on: bool) {
        self.flags.set(SystemFlags::VERBOSE, on);
    }

    pub fn solar_power_mode(&self) -> bool {
        self.flags.contains(SystemFlags::SOLAR_POWER)
    }

    pub fn set_solar_power_mode(&mut self, on: bool) {
        self.flags.set(SystemFlags::SOLAR_POWER, on);
    }

    pub fn low_power_mode(&self) -> bool {
        self.flags.contains(SystemFlags::LOW_POWER)
    }

    pub fn set_low_power_mode(&mut self, on: bool) {
        self.flags.set(SystemFlags::LOW_POWER, on);
    }

    pub fn low_battery_mode(&self) -> bool {
        self.flags.contains(SystemFlags::LOW_BATTERY)
    }

    pub fn set_low_battery_mode(&mut self, on: bool) {
        self.flags.set(SystemFlags::LOW_BATTERY, on);
    }

    pub fn carrier_sim(&self) -> bool {
        self.flags.contains(SystemFlags::CARRIER_SIM)
    }

    pub fn set_carrier_sim(&mut self, on: bool) {
        self.flags.set(SystemFlags::CARRIER_SIM, on);
    }

    /// Replace the timezone identifier. Rejects strings that do not fit
    /// the persisted slot, leaving the current value untouched.
    pub fn set_timezone(&mut self, tz: &str) -> bool {
        if tz.len() > TIMEZONE_MAX_LEN {
            return false;
        }
        self.timezone.clear();
        let _ = self.timezone.push_str(tz);
        true
    }
}

impl PersistentRecord for SystemConfig {
    const MAGIC: u32 = SYS_CONFIG_MAGIC;
    const VERSION: u16 = SYS_CONFIG_VERSION;
    const PAYLOAD_LEN: usize = V2_PAYLOAD_LEN;
    const SAVE_DELAY_MS: u32 = 100;
    const NAME: &'static str = "sysStatus";

    fn defaults() -> Self {
        let mut timezone = String::new();
        // DEFAULT_TIMEZONE is shorter than the slot
        let _ = timezone.push_str(DEFAULT_TIMEZONE);
        Self {
            structures_version: 1,
            flags: SystemFlags::SOLAR_POWER,
            reset_count: 0,
            open_hour: 0,
            close_hour: 24,
            sensor_type: 1,
            last_connection_duration_s: 0,
            last_report: 0,
            last_connection: 0,
            last_cloud_response: 0,
            timezone,
        }
    }

    fn encode(&self, buf: &mut [u8]) {
        buf[0] = self.structures_version;
        buf[1] = self.flags.bits();
        buf[2] = self.reset_count;
        buf[3] = self.open_hour;
        buf[4] = self.close_hour;
        buf[5] = self.sensor_type;
        buf[6..8].copy_from_slice(&self.last_connection_duration_s.to_le_bytes());
        buf[8..16].copy_from_slice(&self.last_report.to_le_bytes());
        buf[16..24].copy_from_slice(&self.last_connection.to_le_bytes());
        buf[24..32].copy_from_slice(&self.last_cloud_response.to_le_bytes());
        buf[32] = self.timezone.len() as u8;
        buf[33..33 + TIMEZONE_MAX_LEN].fill(0);
        buf[33..33 + self.timezone.len()].copy_from_slice(self.timezone.as_bytes());
        buf[71] = 0; // reserved
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

        let mut config = Self::defaults();
        config.structures_version = buf[0];
        config.flags = SystemFlags::from_bits_truncate(buf[1]);
        config.reset_count = buf[2];
        config.open_hour = buf[3];
        config.close_hour = buf[4];
        config.sensor_type = buf[5];
        config.last_connection_duration_s = u16::from_le_bytes([buf[6], buf[7]]);
        config.last_report = i64::from_le_bytes(buf[8..16].try_into().ok()?);
        config.last_connection = i64::from_le_bytes(buf[16..24].try_into().ok()?);

        // Fields appended in version 2 keep their defaults on older records
        if version >= 2 {
            config.last_cloud_response = i64::from_le_bytes(buf[24..32].try_into().ok()?);
            let tz_len = buf[32] as usize;
            if tz_len > TIMEZONE_MAX_LEN {
                return None;
            }
            let tz = core::str::from_utf8(&buf[33..33 + tz_len]).ok()?;
            config.timezone.clear();
            config.timezone.push_str(tz).ok()?;
        }

        Some(config)
    }

    fn validate(&self) -> bool {
        if self.open_hour > MAX_OPEN_HOUR {
            log::info!("config not valid: open hour = {}", self.open_hour);
            return false;
        }
        if self.close_hour > MAX_CLOSE_HOUR {
            log::info!("config not valid: close hour = {}", self.close_hour);
            return false;
        }
        if self.reset_count > MAX_RESET_COUNT {
            log::info!("config not valid: reset count = {}", self.reset_count);
            return false;
        }
        if self.last_connection < 0 {
            log::info!("config not valid: last connection = {}", self.last_connection);
            return false;
        }
        if self.last_connection_duration_s > MAX_CONNECTION_DURATION_S {
            log::info!(
                "config not valid: last connection duration = {}",
                self.last_connection_duration_s
            );
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
        let config = SystemConfig::defaults();
        assert!(config.validate());
        assert!(config.solar_power_mode());
        assert!(!config.low_power_mode());
        assert!(!config.verbose());
        assert_eq!(config.sensor_type, 1);
        assert_eq!(config.open_hour, 0);
        assert_eq!(config.close_hour, 24);
        assert_eq!(config.timezone.as_str(), "ANAT-12");
    }

    #[test]
    fn encode_decode_roundtrip() {
        let mut config = SystemConfig::defaults();
        config.set_verbose(true);
        config.set_low_power_mode(true);
        config.reset_count = 3;
        config.open_hour = 6;
        config.close_hour = 21;
        config.last_connection_duration_s = 42;
        config.last_report = 1_700_000_000;
        config.last_connection = 1_700_000_100;
        config.last_cloud_response = 1_700_000_200;
        assert!(config.set_timezone("EST5EDT"));

        let mut buf = [0u8; SystemConfig::PAYLOAD_LEN];
        config.encode(&mut buf);
        let decoded = SystemConfig::decode(&buf, SYS_CONFIG_VERSION).unwrap();

        assert_eq!(config, decoded);
    }

    #[test]
    fn v1_payload_keeps_fields_and_defaults_tail() {
        let mut config = SystemConfig::defaults();
        config.open_hour = 7;
        config.last_connection = 1_600_000_000;

        let mut buf = [0u8; SystemConfig::PAYLOAD_LEN];
        config.encode(&mut buf);

        // A version-1 writer only produced the 24-byte prefix
        let decoded = SystemConfig::decode(&buf[..24], 1).unwrap();
        assert_eq!(decoded.open_hour, 7);
        assert_eq!(decoded.last_connection, 1_600_000_000);
        assert_eq!(decoded.last_cloud_response, 0);
        assert_eq!(decoded.timezone.as_str(), "ANAT-12");
    }

    #[test]
    fn wrong_length_rejected() {
        let buf = [0u8; SystemConfig::PAYLOAD_LEN];
        assert!(SystemConfig::decode(&buf[..30], 2).is_none());
        assert!(SystemConfig::decode(&buf, 3).is_none());
        assert!(SystemConfig::decode(&buf, 0).is_none());
    }

    #[test]
    fn oversized_timezone_length_rejected() {
        let config = SystemConfig::defaults();
        let mut buf = [0u8; SystemConfig::PAYLOAD_LEN];
        config.encode(&mut buf);
        buf[32] = (TIMEZONE_MAX_LEN + 1) as u8;
        assert!(SystemConfig::decode(&buf, 2).is_none());
    }

    #[test]
    fn open_hour_out_of_bound_invalid() {
        let mut config = SystemConfig::defaults();
        config.open_hour = 15;
        assert!(!config.validate());
    }

    #[test]
    fn connection_duration_out_of_bound_invalid() {
        let mut config = SystemConfig::defaults();
        config.last_connection_duration_s = 901;
        assert!(!config.validate());
    }

    #[test]
    fn reset_count_out_of_bound_invalid() {
        let mut config = SystemConfig::defaults();
        config.reset_count = 201;
        assert!(!config.validate());
    }

    #[test]
    fn negative_last_connection_invalid() {
        let mut config = SystemConfig::defaults();
        config.last_connection = -1;
        assert!(!config.validate());
    }

    #[test]
    fn timezone_truncation_reports_failure() {
        let mut config = SystemConfig::defaults();
        let long = "X".repeat(TIMEZONE_MAX_LEN + 1);
        assert!(!config.set_timezone(&long));
    }

    #[test]
    fn flag_accessors_toggle_bits() {
        let mut config = SystemConfig::defaults();
        config.set_low_battery_mode(true);
        assert!(config.low_battery_mode());
        config.set_low_battery_mode(false);
        assert!(!config.low_battery_mode());
        config.set_carrier_sim(true);
        assert!(config.carrier_sim());
    }
}
