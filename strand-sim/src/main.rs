//! Strand Sim - one cell, many generations
//!
//! Grows a random genome, runs it for a few ticks, mutates it, and repeats,
//! logging what the cell expresses along the way.
//!
//! Usage: `strand-sim [config.json]`. Without a file, configuration comes
//! from `STRAND_*` environment variables. `STRAND_LOG` sets the log level.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{error, info, Level};

use strand_core::{Cell, GaborBasis, Nucleus, StrandConfig, StrandResult};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    // Initialize logging
    let level = std::env::var("STRAND_LOG")
        .ok()
        .and_then(|s| s.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    if let Err(e) = run() {
        error!("strand-sim failed: {}", e);
        std::process::exit(1);
    }
}

fn load_config() -> StrandResult<StrandConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            StrandConfig::load(&path)
        }
        None => {
            let config = StrandConfig::from_env();
            config.validate()?;
            Ok(config)
        }
    }
}

fn run() -> StrandResult<()> {
    let config = load_config()?;
    let seed = config.simulation.seed.unwrap_or_else(rand::random);
    info!("strand-sim v{} (seed {})", VERSION, seed);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let basis = GaborBasis;
    let mut cell = Cell::new(Nucleus::random(&mut rng, &config.genome));

    for generation in 0..config.simulation.generations {
        for _ in 0..config.simulation.ticks_per_generation {
            cell.step(&basis);
        }
        report(generation, &cell);
        cell.mutate(&mut rng)?;
    }

    info!("Done after {} generations", config.simulation.generations);
    Ok(())
}

fn report(generation: u32, cell: &Cell) {
    let genes = cell.nucleus().genes().count();
    let mean_activity = if genes > 0 {
        cell.nucleus()
            .genes()
            .map(|g| g.expression_activity())
            .sum::<f64>()
            / genes as f64
    } else {
        0.0
    };

    info!(
        "Generation {}: {} genes, {} local signals, mean activity {:.4}",
        generation,
        genes,
        cell.concentrations().len(),
        mean_activity
    );

    for (signal, activity) in cell.external_outputs() {
        info!("  exports {} at {:.4}", signal, activity);
    }
}
