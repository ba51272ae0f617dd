//! Civil-time arithmetic on epoch seconds
//!
//! Hour and day derivation for the duty cycle. All arithmetic is UTC; the
//! configured timezone string is carried for the local-time subsystem and
//! is not interpreted here.

/// Seconds per hour.
pub const SECONDS_PER_HOUR: i64 = 3600;

/// Seconds per day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Reporting period: the duty cycle wakes on every hour boundary.
pub const WAKE_BOUNDARY_S: i64 = SECONDS_PER_HOUR;

/// Hour of day (0-23) for an epoch timestamp.
pub fn hour_of(epoch: i64) -> u8 {
    (epoch.rem_euclid(SECONDS_PER_DAY) / SECONDS_PER_HOUR) as u8
}

/// Day index (days since the epoch) for an epoch timestamp.
pub fn day_index(epoch: i64) -> i64 {
    epoch.div_euclid(SECONDS_PER_DAY)
}

/// Whether two epoch timestamps fall on the same calendar day.
pub fn same_day(a: i64, b: i64) -> bool {
    day_index(a) == day_index(b)
}

/// Seconds until the next wake boundary, in 1..=3600.
///
/// An extra second is added so the device wakes just past the boundary
/// rather than just before it.
pub fn seconds_to_next_wake(epoch: i64) -> u32 {
    let remaining = WAKE_BOUNDARY_S - epoch.rem_euclid(WAKE_BOUNDARY_S);
    remaining.clamp(1, WAKE_BOUNDARY_S) as u32 + 1
}
