//! field-node-sim: run the control core through a simulated day
//!
//! Boots the node over a storage image (fresh, or loaded from a file so
//! consecutive runs behave like power cycles), runs 24 hours of simulated
//! duty cycling in low-power mode, and prints a summary.
//!
//! Usage: field-node-sim [image-path]

use field_node_sitl::{SimulatorError, SimWorld};
use field_node_core::traits::time::TimeSource;
use std::path::PathBuf;

fn main() -> Result<(), SimulatorError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let image_path: Option<PathBuf> = std::env::args().nth(1).map(PathBuf::from);

    let mut world = match &image_path {
        Some(path) if path.exists() => {
            log::info!("booting from image {}", path.display());
            SimWorld::with_storage(SimWorld::load_image(path)?)
        }
        _ => SimWorld::new(),
    };

    // Duty-cycle the node the way a solar deployment would run it
    let boot_ms = world.clock.now_ms();
    world.node.sys.set(boot_ms, |c| c.set_low_power_mode(true));

    world.run_sim_hours(24);

    println!("simulated 24 h in {} control-loop ticks", world.steps());
    println!("  reports queued:    {}", world.sink.reports.len());
    println!("  connect attempts:  {}", world.link.connect_requests);
    println!("  sleeps:            {}", world.power.sleep_requests.len());
    println!("  resets requested:  {}", world.power.resets);
    println!("  watchdog starved:  {}", world.watchdog.starved());
    println!(
        "  last distance:     {} cm (battery {}%)",
        world.node.current.get().distance_cm,
        world.node.current.get().state_of_charge
    );

    if let Some(path) = image_path {
        world.save_image(&path)?;
        log::info!("image saved to {}", path.display());
    }

    Ok(())
}
