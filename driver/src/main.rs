use std::time::Instant;

use pic_driver::config::read_config;
use pic_driver::{run, DriverError};

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn main() -> Result<(), DriverError> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();
    let config = read_config()?;
    log::debug!("{config:?}");

    let start = Instant::now();
    let summaries = run(&config)?;
    let runtime = start.elapsed();

    let ignored: usize = summaries.iter().map(|s| s.n_ignored).sum();
    if let Some(last) = summaries.last() {
        log::info!(
            "{} steps in {:?}, {} movers ignored, final kinetic energy {:.6e}",
            last.step,
            runtime,
            ignored,
            last.kinetic_energy
        );
    }
    Ok(())
}
