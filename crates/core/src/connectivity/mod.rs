//! Connectivity admission and supervision
//!
//! Two concerns, kept separate because one is pure policy and the other is
//! stateful sequencing:
//!
//! - [`admission`]: battery-aware policy deciding whether a network attempt
//!   is permitted at all
//! - [`supervisor`]: polled connect and two-phase teardown with explicit
//!   ceilings, driven once per control-loop tick

pub mod admission;
pub mod supervisor;

pub use admission::admit;
pub use supervisor::{
    ConnectStatus, ConnectivitySupervisor, TeardownStatus, CLOUD_DETACH_TIMEOUT_MS,
    CONNECT_TIMEOUT_MS, RADIO_OFF_TIMEOUT_MS,
};
