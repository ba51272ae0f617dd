//! Node assembly
//!
//! Owns the two durable records, the connectivity supervisor, and the
//! duty-cycle controller, and wires them together for the platform's
//! control loop. No hidden globals: the platform constructs a `Node` at
//! boot and drives `tick` from its loop.

use crate::command::{self, CommandContext, CommandItem};
use crate::connectivity::ConnectivitySupervisor;
use crate::controller::{DutyCycleController, NodeState, TickContext};
use crate::persist::{
    CurrentState, LoadOutcome, RecordStore, SystemConfig, CONFIG_BLOCK_BASE, STATE_BLOCK_BASE,
};
use crate::traits::storage::StorageInterface;
use log::info;

/// The assembled control core.
pub struct Node {
    pub sys: RecordStore<SystemConfig>,
    pub current: RecordStore<CurrentState>,
    connectivity: ConnectivitySupervisor,
    controller: DutyCycleController,
    config_outcome: LoadOutcome,
    state_outcome: LoadOutcome,
}

impl Node {
    /// Load-or-initialize both records and assemble the controller.
    pub fn boot(storage: &mut dyn StorageInterface, now_ms: u64) -> Self {
        let (sys, sys_outcome) = RecordStore::load_or_init(storage, CONFIG_BLOCK_BASE, now_ms);
        let (current, state_outcome) = RecordStore::load_or_init(storage, STATE_BLOCK_BASE, now_ms);
        info!(
            "records loaded: config {:?}, state {:?}",
            sys_outcome, state_outcome
        );
        Self {
            sys,
            current,
            connectivity: ConnectivitySupervisor::new(),
            controller: DutyCycleController::new(),
            config_outcome: sys_outcome,
            state_outcome,
        }
    }

    /// How the configuration record came up at boot.
    pub fn config_outcome(&self) -> LoadOutcome {
        self.config_outcome
    }

    /// How the runtime-state record came up at boot.
    pub fn state_outcome(&self) -> LoadOutcome {
        self.state_outcome
    }

    /// Current controller state.
    pub fn state(&self) -> NodeState {
        self.controller.state()
    }

    /// Run one control-loop iteration.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) {
        self.controller
            .tick(&mut self.sys, &mut self.current, &mut self.connectivity, ctx);
    }

    /// Route the machine into explicit teardown.
    pub fn request_disconnect(&mut self) {
        self.controller.request_disconnect();
    }

    /// Execute a decoded remote command list.
    pub fn handle_commands(
        &mut self,
        items: &[CommandItem<'_>],
        ctx: &mut CommandContext<'_>,
        now_ms: u64,
    ) -> bool {
        command::dispatch(items, &mut self.sys, &mut self.current, ctx, now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::store::PersistentRecord;
    use crate::traits::storage::MemoryStorage;

    #[test]
    fn boot_initializes_fresh_storage() {
        let mut storage = MemoryStorage::new();
        let node = Node::boot(&mut storage, 0);
        assert_eq!(node.state(), NodeState::Init);
        assert!(node.sys.get().validate());
    }

    #[test]
    fn records_survive_a_power_cycle() {
        let mut storage = MemoryStorage::new();
        {
            let mut node = Node::boot(&mut storage, 0);
            node.sys.set(0, |c| c.open_hour = 6);
            node.current.set(0, |c| c.distance_cm = 444);
            node.sys.flush(&mut storage, true, 0).unwrap();
            node.current.flush(&mut storage, true, 0).unwrap();
        }

        let node = Node::boot(&mut storage, 0);
        assert_eq!(node.sys.get().open_hour, 6);
        assert_eq!(node.current.get().distance_cm, 444);
    }
}
