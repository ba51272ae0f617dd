//! Duty-cycle controller
//!
//! The top-level state machine. One `tick` runs per control-loop
//! iteration: a one-time entry action fires on each transition (guarded by
//! comparing current against previous state), followed by a level-triggered
//! per-tick body that may immediately re-transition. Cross-cutting work
//! runs on every transit regardless of state: debounced record flushes,
//! the watchdog kick, and the two interrupt flags.
//!
//! Nodes spend most of their life asleep and transit Idle only once or
//! twice per reporting period.

mod flags;
mod state;

pub use flags::InterruptFlags;
pub use state::NodeState;

use crate::clock;
use crate::connectivity::{admission, ConnectStatus, ConnectivitySupervisor, TeardownStatus};
use crate::persist::store::PersistentRecord;
use crate::persist::{CurrentState, RecordStore, SystemConfig};
use crate::report::{self, ReportSink};
use crate::traits::link::NetworkLink;
use crate::traits::power::{PowerControl, WakeReason};
use crate::traits::sensors::{MeasurementProvider, Measurements};
use crate::traits::storage::StorageInterface;
use crate::traits::time::{TimeSource, WallClock};
use crate::traits::watchdog::WatchdogInterface;
use log::{info, warn};

/// In low power mode, how long to stay awake after a wake or connect.
pub const STAY_AWAKE_LONG_MS: u64 = 90_000;

/// How long to wait for the cloud to acknowledge a report.
pub const RESPONSE_WAIT_MS: u64 = 30_000;

/// How long the error state dwells before requesting a reset.
pub const ERROR_RESET_WAIT_MS: u64 = 30_000;

/// Watchdog countdown; the hardware maximum for the external RTC/watchdog.
pub const WATCHDOG_TIMEOUT_MS: u32 = 124_000;

/// Settle delay after a timer wake so the battery reading stabilizes.
pub const SETTLE_DELAY_MS: u32 = 2_000;

/// State of charge at or below which a valid reading engages low power
/// mode.
pub const LOW_POWER_ENGAGE_SOC: f32 = 60.0;

/// Platform services handed to the controller each tick.
///
/// The controller owns no platform state; everything it touches outside
/// the records arrives through this context.
pub struct TickContext<'a> {
    pub time: &'a dyn TimeSource,
    pub clock: &'a dyn WallClock,
    pub watchdog: &'a mut dyn WatchdogInterface,
    pub power: &'a mut dyn PowerControl,
    pub link: &'a mut dyn NetworkLink,
    pub sensors: &'a mut dyn MeasurementProvider,
    pub sink: &'a mut dyn ReportSink,
    pub storage: &'a mut dyn StorageInterface,
    pub flags: &'a InterruptFlags,
}

/// The duty-cycle state machine.
pub struct DutyCycleController {
    state: NodeState,
    old_state: NodeState,
    /// Current stay-awake window length; 0 until the first wake/connect
    stay_awake_ms: u64,
    stay_awake_stamp_ms: u64,
    /// Whether the in-flight connect was entered from Reporting
    connect_from_reporting: bool,
    response_wait_start_ms: u64,
    error_entered_ms: u64,
    /// One-shot admission bypass latched by the user switch
    override_latched: bool,
    reset_requested: bool,
}

impl DutyCycleController {
    pub fn new() -> Self {
        Self {
            state: NodeState::Init,
            old_state: NodeState::Init,
            stay_awake_ms: 0,
            stay_awake_stamp_ms: 0,
            connect_from_reporting: false,
            response_wait_start_ms: 0,
            error_entered_ms: 0,
            override_latched: false,
            reset_requested: false,
        }
    }

    /// Current state, for telemetry and tests.
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Route the machine into explicit teardown.
    pub fn request_disconnect(&mut self) {
        self.state = NodeState::Disconnecting;
    }

    /// Run one control-loop iteration.
    pub fn tick(
        &mut self,
        sys: &mut RecordStore<SystemConfig>,
        current: &mut RecordStore<CurrentState>,
        conn: &mut ConnectivitySupervisor,
        ctx: &mut TickContext<'_>,
    ) {
        let now = ctx.time.now_ms();
        let entered = self.state != self.old_state;
        let prev = self.old_state;
        if entered {
            self.log_transition(prev, self.state, ctx.clock.is_valid());
            self.old_state = self.state;
        }

        match self.state {
            NodeState::Init => self.init_tick(sys, current, ctx, now),

            NodeState::Idle => {
                if sys.get().low_power_mode()
                    && now.saturating_sub(self.stay_awake_stamp_ms) > self.stay_awake_ms
                {
                    self.state = NodeState::Sleeping;
                }
                // Report on the hour; this wins over going to sleep
                if clock::hour_of(ctx.clock.now()) != clock::hour_of(sys.get().last_report) {
                    self.state = NodeState::Reporting;
                }
            }

            NodeState::Sleeping => {
                if entered && (ctx.link.cloud_connected() || !ctx.link.radio_off()) {
                    conn.start_disconnect(now, ctx.link);
                }
                if conn.teardown_in_progress() {
                    match conn.poll_disconnect(now, ctx.link) {
                        TeardownStatus::InProgress => {}
                        TeardownStatus::Done => {}
                        TeardownStatus::Failed => self.state = NodeState::Error,
                    }
                }
                if self.state == NodeState::Sleeping && !conn.teardown_in_progress() {
                    self.sleep_until_boundary(sys, ctx);
                }
            }

            NodeState::Reporting => {
                let wall_now = ctx.clock.now();
                sys.set(now, |c| c.last_report = wall_now);

                let readings = ctx.sensors.take_measurements();
                self.apply_readings(sys, current, &readings, wall_now, now);

                // Once a day, at opening time, clean house
                if clock::hour_of(wall_now) == sys.get().open_hour {
                    self.daily_cleanup(sys, current, ctx, wall_now, now);
                }

                self.emit_report(sys, current, ctx, wall_now, now);

                if ctx.link.cloud_connected() {
                    self.reset_stay_awake(now);
                    self.state = NodeState::ResponseWait;
                } else {
                    let manual = self.override_latched;
                    self.override_latched = false;
                    let hour = clock::hour_of(wall_now);
                    if admission::admit(sys.get(), current.get().state_of_charge, hour, manual) {
                        self.state = NodeState::Connecting;
                    } else {
                        self.state = NodeState::Idle;
                    }
                }
            }

            NodeState::Connecting => {
                if entered {
                    self.connect_from_reporting = prev == NodeState::Reporting;
                    sys.set(now, |c| c.last_connection_duration_s = 0);
                    conn.start_connect(now, ctx.link);
                }

                // Record the running duration; it survives as the final
                // figure on the tick the session comes up
                let elapsed_s = conn.connect_elapsed_s(now);
                if elapsed_s != sys.get().last_connection_duration_s {
                    sys.set(now, |c| c.last_connection_duration_s = elapsed_s);
                }

                match conn.poll_connect(now, ctx.link) {
                    ConnectStatus::Pending => {}
                    ConnectStatus::Connected => {
                        let wall_now = ctx.clock.now();
                        sys.set(now, |c| c.last_connection = wall_now);
                        self.reset_stay_awake(now);

                        let quality = conn.signal_quality(ctx.link);
                        let duration_s = sys.get().last_connection_duration_s;
                        info!(
                            "connected in {} s, signal {}%, quality {}%",
                            duration_s, quality.strength_pct, quality.quality_pct
                        );
                        if sys.get().verbose() {
                            let mut message: heapless::String<64> = heapless::String::new();
                            let _ = core::fmt::write(
                                &mut message,
                                format_args!("Connected in {} secs", duration_s),
                            );
                            ctx.sink.publish("Cellular", message.as_str());
                        }

                        self.state = if self.connect_from_reporting {
                            NodeState::ResponseWait
                        } else {
                            NodeState::Idle
                        };
                    }
                    ConnectStatus::TimedOut => self.state = NodeState::Error,
                }
            }

            NodeState::ResponseWait => {
                if entered {
                    self.response_wait_start_ms = now;
                    // A stale acknowledgement from before this report
                    // does not count
                    ctx.flags.take_response_received();
                }
                if ctx.flags.take_response_received() {
                    info!("response received");
                    let wall_now = ctx.clock.now();
                    sys.set(now, |c| c.last_cloud_response = wall_now);
                    self.reset_stay_awake(now);
                    self.state = NodeState::Idle;
                } else if now.saturating_sub(self.response_wait_start_ms) > RESPONSE_WAIT_MS {
                    warn!("response timeout - resetting");
                    self.state = NodeState::Error;
                }
            }

            NodeState::Disconnecting => {
                if entered {
                    conn.start_disconnect(now, ctx.link);
                }
                match conn.poll_disconnect(now, ctx.link) {
                    TeardownStatus::InProgress => {}
                    TeardownStatus::Done => self.state = NodeState::Idle,
                    TeardownStatus::Failed => self.state = NodeState::Error,
                }
            }

            NodeState::Error => {
                if entered {
                    self.error_entered_ms = now;
                    warn!("error state - resetting after {} s", ERROR_RESET_WAIT_MS / 1000);
                }
                if !self.reset_requested
                    && now.saturating_sub(self.error_entered_ms) > ERROR_RESET_WAIT_MS
                {
                    self.reset_requested = true;
                    ctx.power.request_reset();
                }
            }
        }

        // Housekeeping on every transit of the loop
        let now = ctx.time.now_ms();
        if let Err(e) = sys.flush(ctx.storage, false, now) {
            warn!("config flush failed: {}", e);
        }
        if let Err(e) = current.flush(ctx.storage, false, now) {
            warn!("state flush failed: {}", e);
        }
        ctx.watchdog.kick();

        if ctx.flags.take_out_of_memory() {
            warn!("resetting due to low memory");
            self.state = NodeState::Error;
        }
        if ctx.flags.take_user_override() {
            info!("user switch pressed - sending data");
            self.override_latched = true;
            self.state = NodeState::Reporting;
        }
    }

    /// Boot policy, run once out of `Init`.
    fn init_tick(
        &mut self,
        sys: &mut RecordStore<SystemConfig>,
        current: &mut RecordStore<CurrentState>,
        ctx: &mut TickContext<'_>,
        now: u64,
    ) {
        ctx.watchdog.arm(WATCHDOG_TIMEOUT_MS);

        let reason = ctx.power.reset_reason();
        if reason.is_abnormal() {
            warn!("abnormal reset: {:?}", reason);
            sys.set(now, |c| c.reset_count = c.reset_count.saturating_add(1));
        }

        // Populate readings so they can be reported before the hour
        let wall_now = ctx.clock.now();
        let readings = ctx.sensors.take_measurements();
        self.apply_readings(sys, current, &readings, wall_now, now);

        let mut next = NodeState::Sleeping;
        if ctx.power.factory_reset_requested() {
            info!("factory reset requested at startup - loading defaults");
            sys.set(now, |c| *c = SystemConfig::defaults());
            next = NodeState::Connecting;
        }
        if !ctx.clock.is_valid() {
            info!("clock is not valid - connecting");
            next = NodeState::Connecting;
        } else if !clock::same_day(sys.get().last_connection, wall_now) {
            info!("new day since last connection - connecting");
            self.daily_cleanup(sys, current, ctx, wall_now, now);
            next = NodeState::Connecting;
        }

        info!("startup complete");
        self.state = next;
    }

    /// Disconnect is complete; negotiate the suspension itself.
    fn sleep_until_boundary(
        &mut self,
        sys: &mut RecordStore<SystemConfig>,
        ctx: &mut TickContext<'_>,
    ) {
        let wake_in_s = clock::seconds_to_next_wake(ctx.clock.now());

        // No watchdog interrupting our slumber; re-arm before anything
        // else can suspend again
        ctx.watchdog.disarm();
        let wake = ctx.power.sleep(wake_in_s, true);
        ctx.watchdog.arm(WATCHDOG_TIMEOUT_MS);

        let now = ctx.time.now_ms();
        match wake {
            WakeReason::Input => {
                info!("woke with user switch - staying awake and connecting");
                sys.set(now, |c| c.set_low_power_mode(false));
                self.reset_stay_awake(now);
                self.state = NodeState::Reporting;
            }
            WakeReason::Timer => {
                // Give the fuel gauge a moment before the next reading
                ctx.power.settle_delay(SETTLE_DELAY_MS);
                info!("hourly wake");
                self.state = NodeState::Idle;
            }
        }
    }

    /// Write fresh readings into the runtime record and apply the battery
    /// policy: a valid reading at or below the threshold engages low
    /// power mode.
    fn apply_readings(
        &self,
        sys: &mut RecordStore<SystemConfig>,
        current: &mut RecordStore<CurrentState>,
        readings: &Measurements,
        wall_now: i64,
        now: u64,
    ) {
        current.set(now, |c| {
            report::apply_measurements(c, readings);
            c.last_sample_time = wall_now;
        });

        let soc = readings.state_of_charge;
        if (0.0..=LOW_POWER_ENGAGE_SOC).contains(&soc) && !sys.get().low_power_mode() {
            info!("battery at {}% - engaging low power mode", soc);
            sys.set(now, |c| c.set_low_power_mode(true));
        }
    }

    /// Hand the hourly event to the publish queue and clear the alert.
    fn emit_report(
        &self,
        sys: &mut RecordStore<SystemConfig>,
        current: &mut RecordStore<CurrentState>,
        ctx: &mut TickContext<'_>,
        wall_now: i64,
        now: u64,
    ) {
        report::emit_report(sys.get(), current, ctx.sink, wall_now, now);
    }

    /// Morning housekeeping: quiet the verbose chatter and zero the
    /// counters for the new day.
    fn daily_cleanup(
        &self,
        sys: &mut RecordStore<SystemConfig>,
        current: &mut RecordStore<CurrentState>,
        ctx: &mut TickContext<'_>,
        wall_now: i64,
        now: u64,
    ) {
        info!("running daily cleanup");
        if ctx.link.cloud_connected() {
            ctx.sink.publish("Daily Cleanup", "Running");
        }
        sys.set(now, |c| {
            c.set_verbose(false);
            c.reset_count = 0;
        });
        current.set(now, |c| c.last_sample_time = wall_now);
    }

    fn reset_stay_awake(&mut self, now: u64) {
        self.stay_awake_ms = STAY_AWAKE_LONG_MS;
        self.stay_awake_stamp_ms = now;
    }

    fn log_transition(&self, from: NodeState, to: NodeState, clock_valid: bool) {
        if to == NodeState::Idle && !clock_valid {
            info!("From {} to {} with invalid time", from.name(), to.name());
        } else {
            info!("From {} to {}", from.name(), to.name());
        }
    }
}

impl Default for DutyCycleController {
    fn default() -> Self {
        Self::new()
    }
}
