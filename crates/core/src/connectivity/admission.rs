//! Battery-aware connection admission policy
//!
//! Pure predicate, no state. The schedule thins connection attempts as the
//! battery drains: a healthy battery connects every hour, a sagging one
//! every other hour, a low one every fourth hour, and low-battery mode
//! refuses outright. The manual override is the physical user switch and
//! wins over every refusal.

use crate::persist::SystemConfig;

/// State-of-charge above which low-power mode always connects.
pub const SOC_FULL_SCHEDULE: f32 = 65.0;

/// State-of-charge at or below which low-power mode drops to the
/// four-hour schedule.
pub const SOC_QUARTER_SCHEDULE: f32 = 50.0;

/// Decide whether a connection attempt is permitted.
///
/// `hour` is the current hour of day (0-23); `manual_override` is the
/// user-switch signal passed in by the controller.
pub fn admit(config: &SystemConfig, state_of_charge: f32, hour: u8, manual_override: bool) -> bool {
    if manual_override {
        return true;
    }

    // Battery too low to connect at all
    if config.low_battery_mode() {
        log::info!("not connecting - low battery mode");
        return false;
    }

    if config.low_power_mode() {
        if state_of_charge > SOC_FULL_SCHEDULE {
            return true;
        }
        if state_of_charge <= SOC_QUARTER_SCHEDULE {
            // Below half charge: connect every fourth hour only
            if hour % 4 != 0 {
                log::info!("not connecting - <50% charge - four hour schedule");
                return false;
            }
            return true;
        }
        // Between 50% and 65%: connect every other hour only
        if hour % 2 != 0 {
            log::info!("not connecting - 50-65% charge - two hour schedule");
            return false;
        }
        return true;
    }

    true
}
