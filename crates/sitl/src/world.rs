//! Simulated world
//!
//! Assembles the control core with the simulated platform and steps it in
//! simulated time. One `step` is one control-loop tick followed by one
//! tick's worth of simulated time; sleeps inside the tick advance the
//! clock further on their own.

use crate::error::SimulatorError;
use crate::platform::{SimClock, SimLink, SimPower, SimWatchdog};
use field_node_core::controller::{InterruptFlags, NodeState, TickContext};
use field_node_core::node::Node;
use field_node_core::report::MockSink;
use field_node_core::traits::power::ResetReason;
use field_node_core::traits::sensors::MockSensors;
use field_node_core::traits::storage::MemoryStorage;
use field_node_core::traits::time::{TimeSource, WallClock};
use std::path::Path;

/// Default epoch at world start.
pub const DEFAULT_START_EPOCH: i64 = 1_700_000_000;

/// Simulated time consumed by one awake control-loop tick.
pub const TICK_MS: u64 = 1_000;

/// The assembled simulation.
pub struct SimWorld {
    pub clock: SimClock,
    pub watchdog: SimWatchdog,
    pub power: SimPower,
    pub link: SimLink,
    pub sensors: MockSensors,
    pub sink: MockSink,
    pub storage: MemoryStorage,
    pub flags: InterruptFlags,
    pub node: Node,
    /// When set, the cloud acknowledges each report after
    /// `response_delay_ms` of response-wait
    pub auto_respond: bool,
    pub response_delay_ms: u64,
    respond_at_ms: Option<u64>,
    steps: u64,
}

impl SimWorld {
    /// A fresh world over erased storage.
    pub fn new() -> Self {
        Self::with_storage(MemoryStorage::new())
    }

    /// A world booting from an existing storage image.
    pub fn with_storage(mut storage: MemoryStorage) -> Self {
        let clock = SimClock::starting_at(DEFAULT_START_EPOCH);
        let node = Node::boot(&mut storage, clock.now_ms());
        Self {
            watchdog: SimWatchdog::new(clock.clone()),
            power: SimPower::new(clock.clone()),
            link: SimLink::responsive(clock.clone()),
            sensors: MockSensors::new(),
            sink: MockSink::new(),
            storage,
            flags: InterruptFlags::new(),
            node,
            auto_respond: true,
            response_delay_ms: 2_000,
            respond_at_ms: None,
            steps: 0,
            clock,
        }
    }

    /// Run one control-loop tick.
    pub fn step(&mut self) {
        self.drive_cloud_response();

        let mut ctx = TickContext {
            time: &self.clock,
            clock: &self.clock,
            watchdog: &mut self.watchdog,
            power: &mut self.power,
            link: &mut self.link,
            sensors: &mut self.sensors,
            sink: &mut self.sink,
            storage: &mut self.storage,
            flags: &self.flags,
        };
        self.node.tick(&mut ctx);

        self.watchdog.observe();
        self.clock.advance_ms(TICK_MS);
        self.steps += 1;
    }

    /// Step until the given amount of simulated time has passed.
    pub fn run_sim_seconds(&mut self, seconds: u64) {
        let deadline = self.clock.now_ms() + seconds * 1_000;
        while self.clock.now_ms() < deadline {
            self.step();
        }
    }

    /// Step through `hours` of simulated time.
    pub fn run_sim_hours(&mut self, hours: u64) {
        self.run_sim_seconds(hours * 3_600);
    }

    /// Simulate a user-switch press (interrupt context).
    pub fn press_user_switch(&self) {
        self.flags.raise_user_override();
    }

    /// Current controller state.
    pub fn state(&self) -> NodeState {
        self.node.state()
    }

    /// Total control-loop iterations executed.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Hard power cycle: everything volatile is lost, storage survives,
    /// and the node boots again reporting `reason`.
    pub fn power_cycle(&mut self, reason: ResetReason) {
        self.node = Node::boot(&mut self.storage, self.clock.now_ms());
        self.watchdog = SimWatchdog::new(self.clock.clone());
        let mut power = SimPower::new(self.clock.clone());
        power.reset_reason = reason;
        self.power = power;
        self.respond_at_ms = None;
    }

    /// Persist the storage image for a later run.
    pub fn save_image(&self, path: &Path) -> Result<(), SimulatorError> {
        std::fs::write(path, self.storage.image())?;
        Ok(())
    }

    /// Load a storage image persisted by [`SimWorld::save_image`].
    pub fn load_image(path: &Path) -> Result<MemoryStorage, SimulatorError> {
        let bytes = std::fs::read(path)?;
        if bytes.len() > field_node_core::traits::storage::MEMORY_STORAGE_CAPACITY {
            return Err(SimulatorError::ImageTooLarge(bytes.len()));
        }
        Ok(MemoryStorage::from_image(&bytes))
    }

    /// The cloud side: acknowledge a report shortly after the node starts
    /// waiting for the response.
    fn drive_cloud_response(&mut self) {
        if !self.auto_respond {
            return;
        }
        if self.node.state() == NodeState::ResponseWait {
            let now = self.clock.now_ms();
            match self.respond_at_ms {
                None => self.respond_at_ms = Some(now + self.response_delay_ms),
                Some(at) if now >= at => {
                    self.flags.raise_response_received();
                    self.respond_at_ms = None;
                }
                Some(_) => {}
            }
        } else {
            self.respond_at_ms = None;
        }
    }

    /// Epoch second in the simulated world.
    pub fn epoch(&self) -> i64 {
        self.clock.now()
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}
