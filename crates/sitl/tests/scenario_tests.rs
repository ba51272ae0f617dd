//! End-to-end scenarios driven through the simulated world.

use field_node_core::command::{CommandContext, CommandItem};
use field_node_core::controller::NodeState;
use field_node_core::persist::crc::calculate_crc32;
use field_node_core::persist::store::PersistentRecord;
use field_node_core::persist::{LoadOutcome, RecordHeader, SystemConfig, CONFIG_BLOCK_BASE};
use field_node_core::traits::storage::MemoryStorage;
use field_node_core::traits::time::TimeSource;
use field_node_sitl::{SimLink, SimWorld};

/// Write a config block with a valid header and checksum but an
/// out-of-range open hour.
fn storage_with_bad_open_hour() -> MemoryStorage {
    let mut config = SystemConfig::defaults();
    config.open_hour = 15;

    let mut payload = [0u8; SystemConfig::PAYLOAD_LEN];
    config.encode(&mut payload);
    let header = RecordHeader::new(
        SystemConfig::MAGIC,
        SystemConfig::VERSION,
        SystemConfig::PAYLOAD_LEN as u16,
        calculate_crc32(&payload),
    );

    let mut storage = MemoryStorage::new();
    let base = CONFIG_BLOCK_BASE as usize;
    storage.image_mut()[base..base + RecordHeader::SIZE].copy_from_slice(&header.to_bytes());
    storage.image_mut()[base + RecordHeader::SIZE..base + RecordHeader::SIZE + payload.len()]
        .copy_from_slice(&payload);
    storage
}

#[test]
fn out_of_range_field_recovers_to_defaults() {
    // The checksum is fine; only domain validation can catch this
    let world = SimWorld::with_storage(storage_with_bad_open_hour());
    assert_eq!(world.node.config_outcome(), LoadOutcome::Defaulted);
    assert_eq!(world.node.sys.get().open_hour, 0);
    assert!(world.node.sys.get().validate());
}

#[test]
fn reports_reuse_a_live_connection() {
    // Mains-powered profile: the node stays connected between reports, so
    // hourly reporting must skip straight to the response wait
    let mut world = SimWorld::new();
    world.run_sim_hours(3);

    assert!(world.sink.reports.len() >= 3, "reports: {}", world.sink.reports.len());
    assert_eq!(world.link.connect_requests, 1);
    assert_eq!(world.power.resets, 0);
    assert!(!world.watchdog.starved());
}

#[test]
fn unreachable_network_times_out_into_reset() {
    let mut world = SimWorld::new();
    world.link = SimLink::unreachable(world.clock.clone());

    // Boot forces a connect; the attempt must die at the 600 s ceiling,
    // dwell 30 s in the error state, then request the reset
    world.run_sim_seconds(590);
    assert_eq!(world.state(), NodeState::Connecting);
    assert_eq!(world.power.resets, 0);

    world.run_sim_seconds(110);
    assert_eq!(world.power.resets, 1);
    assert!(!world.watchdog.starved());
}

#[test]
fn missing_cloud_response_times_out_into_reset() {
    let mut world = SimWorld::new();
    world.auto_respond = false;

    world.run_sim_seconds(200);
    assert_eq!(world.state(), NodeState::Error);
    assert_eq!(world.power.resets, 1);
}

#[test]
fn close_command_applies_and_out_of_range_is_rejected() {
    let mut world = SimWorld::new();
    let now_ms = world.clock.now_ms();

    let accepted = {
        let mut ctx = CommandContext {
            sensors: &mut world.sensors,
            sink: &mut world.sink,
            clock: &world.clock,
        };
        world.node.handle_commands(
            &[CommandItem {
                variable: "13",
                function: "close",
            }],
            &mut ctx,
            now_ms,
        )
    };
    assert!(accepted);
    assert_eq!(world.node.sys.get().close_hour, 13);

    let rejected = {
        let mut ctx = CommandContext {
            sensors: &mut world.sensors,
            sink: &mut world.sink,
            clock: &world.clock,
        };
        world.node.handle_commands(
            &[CommandItem {
                variable: "25",
                function: "close",
            }],
            &mut ctx,
            now_ms,
        )
    };
    assert!(!rejected);
    assert_eq!(world.node.sys.get().close_hour, 13);
}

#[test]
fn commands_affect_the_running_cycle() {
    let mut world = SimWorld::new();
    let now_ms = world.clock.now_ms();

    // "stay false" puts the node into low-power duty cycling
    let ok = {
        let mut ctx = CommandContext {
            sensors: &mut world.sensors,
            sink: &mut world.sink,
            clock: &world.clock,
        };
        world.node.handle_commands(
            &[CommandItem {
                variable: "false",
                function: "stay",
            }],
            &mut ctx,
            now_ms,
        )
    };
    assert!(ok);
    assert!(world.node.sys.get().low_power_mode());

    // The node now naps between reports
    world.run_sim_hours(2);
    assert!(!world.power.sleep_requests.is_empty());
}
