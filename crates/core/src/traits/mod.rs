//! Core traits for platform-agnostic duty-cycle functionality.
//!
//! This module provides trait abstractions that decouple the control core
//! from platform-specific implementations (device HAL, simulator).
//!
//! # Design
//!
//! - Trait definitions are pure and have no feature gates
//! - Mock implementations are always available for host testing
//! - Real implementations live in the platform crate (SITL or firmware)

pub mod link;
pub mod power;
pub mod sensors;
pub mod storage;
pub mod time;
pub mod watchdog;

pub use link::{MockLink, NetworkLink, SignalQuality};
pub use power::{MockPower, PowerControl, ResetReason, WakeReason};
pub use sensors::{MeasurementProvider, Measurements, MockSensors};
pub use storage::{MemoryStorage, StorageError, StorageInterface};
pub use time::{MockClock, MockTime, TimeSource, WallClock};
pub use watchdog::{MockWatchdog, WatchdogInterface};
