//! Duty-cycle state machine states

/// States of the duty-cycle controller.
///
/// `Init` is the boot state; there is no terminal state. `Error` is the
/// self-healing absorbing state: its only exit is a full process reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Init,
    Error,
    Idle,
    Sleeping,
    Connecting,
    Disconnecting,
    Reporting,
    ResponseWait,
}

impl NodeState {
    /// State name for transition logging
    pub fn name(&self) -> &'static str {
        match self {
            NodeState::Init => "Initialize",
            NodeState::Error => "Error",
            NodeState::Idle => "Idle",
            NodeState::Sleeping => "Sleeping",
            NodeState::Connecting => "Connecting",
            NodeState::Disconnecting => "Disconnecting",
            NodeState::Reporting => "Reporting",
            NodeState::ResponseWait => "Response Wait",
        }
    }
}
