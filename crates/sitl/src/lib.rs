//! field_node_sitl - Software-in-the-loop harness for the field-node core
//!
//! Runs the real control core against simulated platform services on the
//! host: a controllable clock shared by the scripted radio link, a
//! starvation-checking watchdog, scripted sleep/reset power control, and
//! in-memory storage. The [`world::SimWorld`] assembles everything and
//! steps the control loop in simulated time.

pub mod error;
pub mod platform;
pub mod world;

pub use error::SimulatorError;
pub use platform::{SimClock, SimLink, SimPower, SimWatchdog};
pub use world::SimWorld;
