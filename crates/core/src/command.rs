//! Remote command dispatch
//!
//! The cloud sends a list of `{variable, function}` items; the JSON wire
//! decoding happens upstream and this module receives the decoded items.
//! Every mutation is range-checked before it lands: an out-of-range value
//! or unrecognized function is rejected with a failure message and no
//! state change. The overall result is failure if any item was rejected.

use crate::persist::store::PersistentRecord;
use crate::persist::{CurrentState, RecordStore, SystemConfig};
use crate::report::{self, ReportSink};
use crate::traits::sensors::MeasurementProvider;
use crate::traits::time::WallClock;
use core::fmt::Write;
use heapless::String;
use log::info;

/// One decoded command item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandItem<'a> {
    pub variable: &'a str,
    pub function: &'a str,
}

/// Collaborators the commands act through.
pub struct CommandContext<'a> {
    pub sensors: &'a mut dyn MeasurementProvider,
    pub sink: &'a mut dyn ReportSink,
    pub clock: &'a dyn WallClock,
}

/// Execute a command list against the records.
///
/// Returns `true` only if every item was recognized and in range; an
/// empty list is a failure, matching the wire protocol's return code.
pub fn dispatch(
    items: &[CommandItem<'_>],
    sys: &mut RecordStore<SystemConfig>,
    current: &mut RecordStore<CurrentState>,
    ctx: &mut CommandContext<'_>,
    now_ms: u64,
) -> bool {
    if items.is_empty() {
        return false;
    }

    let mut success = true;
    for item in items {
        if !apply_item(item, sys, current, ctx, now_ms) {
            success = false;
        }
    }
    success
}

fn apply_item(
    item: &CommandItem<'_>,
    sys: &mut RecordStore<SystemConfig>,
    current: &mut RecordStore<CurrentState>,
    ctx: &mut CommandContext<'_>,
    now_ms: u64,
) -> bool {
    let mut messaging: String<96> = String::new();
    let mut success = true;
    let wall_now = ctx.clock.now();

    match item.function {
        "reset" => {
            if item.variable == "all" {
                let _ = write!(messaging, "Resetting the system and current data");
                sys.set(now_ms, |c| *c = SystemConfig::defaults());
            } else {
                let _ = write!(messaging, "Resetting the current data");
            }
            day_reset(sys, current, wall_now, now_ms);
        }

        "status" => {
            refresh_measurements(current, ctx, wall_now, now_ms);
            let config = sys.get();
            let state = current.get();
            let _ = write!(
                messaging,
                "Distance: {} cm, Sensor: {}, Battery: {}% and {}",
                state.distance_cm,
                if config.sensor_type != 0 { "Level" } else { "Trail" },
                state.state_of_charge,
                state.battery_state.label()
            );
            if item.variable == "long" {
                let mut detail: String<96> = String::new();
                let _ = write!(
                    detail,
                    "Time: {}, open: {}, close: {}, mode {}",
                    wall_now,
                    config.open_hour,
                    config.close_hour,
                    if config.low_power_mode() {
                        "low power"
                    } else {
                        "not low power"
                    }
                );
                info!("{}", detail.as_str());
                ctx.sink.publish("status", detail.as_str());
            }
            info!("{}", messaging.as_str());
            ctx.sink.publish("status", messaging.as_str());
            messaging.clear();
        }

        "send" => {
            refresh_measurements(current, ctx, wall_now, now_ms);
            report::emit_report(sys.get(), current, ctx.sink, wall_now, now_ms);
        }

        "stay" => {
            if item.variable == "true" {
                let _ = write!(messaging, "Going to keep the device online");
                sys.set(now_ms, |c| c.set_low_power_mode(false));
            } else {
                let _ = write!(messaging, "Going back to normal connectivity");
                sys.set(now_ms, |c| c.set_low_power_mode(true));
            }
        }

        "open" => match item.variable.parse::<i32>() {
            Ok(hour @ 0..=12) => {
                let _ = write!(messaging, "Setting opening hour to {}:00", hour);
                sys.set(now_ms, |c| c.open_hour = hour as u8);
            }
            _ => {
                let _ = write!(messaging, "Open hour - must be 0-12");
                success = false;
            }
        },

        "close" => match item.variable.parse::<i32>() {
            Ok(hour @ 13..=24) => {
                let _ = write!(messaging, "Setting closing hour to {}:00", hour);
                sys.set(now_ms, |c| c.close_hour = hour as u8);
            }
            _ => {
                let _ = write!(messaging, "Close hour - must be 13-24");
                success = false;
            }
        },

        "type" => match item.variable.parse::<i32>() {
            Ok(kind @ 0..=2) => {
                let _ = write!(
                    messaging,
                    "Setting sensor type to {} counter",
                    if kind == 0 { "car" } else { "person" }
                );
                sys.set(now_ms, |c| c.sensor_type = kind as u8);
            }
            _ => {
                let _ = write!(messaging, "Sensor type out of range (0-2)");
                success = false;
            }
        },

        _ => {
            let _ = write!(messaging, "Not a valid command");
            success = false;
        }
    }

    if !messaging.is_empty() {
        info!("{}", messaging.as_str());
        ctx.sink.publish("cmd", messaging.as_str());
    }
    success
}

/// New-day reset shared by `reset` commands and the daily cleanup.
fn day_reset(
    sys: &mut RecordStore<SystemConfig>,
    current: &mut RecordStore<CurrentState>,
    wall_now: i64,
    now_ms: u64,
) {
    current.set(now_ms, |c| c.last_sample_time = wall_now);
    sys.set(now_ms, |c| c.reset_count = 0);
}

fn refresh_measurements(
    current: &mut RecordStore<CurrentState>,
    ctx: &mut CommandContext<'_>,
    wall_now: i64,
    now_ms: u64,
) {
    let readings = ctx.sensors.take_measurements();
    current.set(now_ms, |c| {
        report::apply_measurements(c, &readings);
        c.last_sample_time = wall_now;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::{CONFIG_BLOCK_BASE, STATE_BLOCK_BASE};
    use crate::report::MockSink;
    use crate::traits::sensors::MockSensors;
    use crate::traits::storage::MemoryStorage;
    use crate::traits::time::MockClock;

    struct Fixture {
        sys: RecordStore<SystemConfig>,
        current: RecordStore<CurrentState>,
        sensors: MockSensors,
        sink: MockSink,
        clock: MockClock,
    }

    impl Fixture {
        fn new() -> Self {
            let mut storage = MemoryStorage::new();
            let (sys, _) = RecordStore::load_or_init(&mut storage, CONFIG_BLOCK_BASE, 0);
            let (current, _) = RecordStore::load_or_init(&mut storage, STATE_BLOCK_BASE, 0);
            Self {
                sys,
                current,
                sensors: MockSensors::new(),
                sink: MockSink::new(),
                clock: MockClock::with_epoch(1_700_000_000),
            }
        }

        fn run(&mut self, items: &[CommandItem<'_>]) -> bool {
            let mut ctx = CommandContext {
                sensors: &mut self.sensors,
                sink: &mut self.sink,
                clock: &self.clock,
            };
            dispatch(items, &mut self.sys, &mut self.current, &mut ctx, 0)
        }
    }

    #[test]
    fn close_in_range_is_applied() {
        // Scenario: {"var":"13","fn":"close"} is accepted
        let mut f = Fixture::new();
        assert!(f.run(&[CommandItem {
            variable: "13",
            function: "close"
        }]));
        assert_eq!(f.sys.get().close_hour, 13);
    }

    #[test]
    fn close_out_of_range_is_rejected_without_mutation() {
        // Scenario: {"var":"25","fn":"close"} is rejected
        let mut f = Fixture::new();
        let before = f.sys.get().close_hour;
        assert!(!f.run(&[CommandItem {
            variable: "25",
            function: "close"
        }]));
        assert_eq!(f.sys.get().close_hour, before);
    }

    #[test]
    fn open_bounds() {
        let mut f = Fixture::new();
        assert!(f.run(&[CommandItem {
            variable: "12",
            function: "open"
        }]));
        assert_eq!(f.sys.get().open_hour, 12);

        assert!(!f.run(&[CommandItem {
            variable: "13",
            function: "open"
        }]));
        assert_eq!(f.sys.get().open_hour, 12);

        assert!(!f.run(&[CommandItem {
            variable: "junk",
            function: "open"
        }]));
    }

    #[test]
    fn type_bounds() {
        let mut f = Fixture::new();
        assert!(f.run(&[CommandItem {
            variable: "0",
            function: "type"
        }]));
        assert_eq!(f.sys.get().sensor_type, 0);

        assert!(!f.run(&[CommandItem {
            variable: "3",
            function: "type"
        }]));
        assert_eq!(f.sys.get().sensor_type, 0);
    }

    #[test]
    fn stay_toggles_low_power_mode() {
        let mut f = Fixture::new();
        assert!(f.run(&[CommandItem {
            variable: "true",
            function: "stay"
        }]));
        assert!(!f.sys.get().low_power_mode());

        assert!(f.run(&[CommandItem {
            variable: "false",
            function: "stay"
        }]));
        assert!(f.sys.get().low_power_mode());
    }

    #[test]
    fn reset_all_restores_defaults() {
        let mut f = Fixture::new();
        f.sys.set(0, |c| {
            c.open_hour = 9;
            c.reset_count = 4;
        });
        assert!(f.run(&[CommandItem {
            variable: "all",
            function: "reset"
        }]));
        assert_eq!(f.sys.get().open_hour, 0);
        assert_eq!(f.sys.get().reset_count, 0);
        assert_eq!(f.current.get().last_sample_time, 1_700_000_000);
    }

    #[test]
    fn reset_current_keeps_config() {
        let mut f = Fixture::new();
        f.sys.set(0, |c| {
            c.open_hour = 9;
            c.reset_count = 4;
        });
        assert!(f.run(&[CommandItem {
            variable: "current",
            function: "reset"
        }]));
        assert_eq!(f.sys.get().open_hour, 9);
        assert_eq!(f.sys.get().reset_count, 0);
    }

    #[test]
    fn send_measures_and_queues_report() {
        let mut f = Fixture::new();
        f.sensors.readings.distance_cm = 333;
        assert!(f.run(&[CommandItem {
            variable: "",
            function: "send"
        }]));
        assert_eq!(f.sensors.samples, 1);
        assert_eq!(f.sink.reports.len(), 1);
        assert_eq!(f.sink.reports[0].distance_cm, 333);
    }

    #[test]
    fn status_publishes_summary() {
        let mut f = Fixture::new();
        assert!(f.run(&[CommandItem {
            variable: "short",
            function: "status"
        }]));
        assert_eq!(f.sink.publishes, 1);

        assert!(f.run(&[CommandItem {
            variable: "long",
            function: "status"
        }]));
        assert_eq!(f.sink.publishes, 3);
    }

    #[test]
    fn unknown_function_is_rejected() {
        let mut f = Fixture::new();
        assert!(!f.run(&[CommandItem {
            variable: "1",
            function: "blink"
        }]));
    }

    #[test]
    fn empty_list_is_a_failure() {
        let mut f = Fixture::new();
        assert!(!f.run(&[]));
    }

    #[test]
    fn one_bad_item_fails_the_batch_but_good_items_apply() {
        let mut f = Fixture::new();
        let items = [
            CommandItem {
                variable: "14",
                function: "close",
            },
            CommandItem {
                variable: "99",
                function: "open",
            },
        ];
        assert!(!f.run(&items));
        assert_eq!(f.sys.get().close_hour, 14);
        assert_eq!(f.sys.get().open_hour, 0);
    }
}
