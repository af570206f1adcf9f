#[allow(non_snake_case)]
pub mod FedBatch;

use FedBatch::bioreactor_model::{BioreactorError, KineticParameters, StateVector};
use FedBatch::integration_driver::TimeGrid;
use FedBatch::sweep_engine::ParameterSweepEngine;
use log::error;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::path::Path;

/// Nominal fed-batch study: sweep the feed rate and report terminal states
fn run_nominal_study() -> Result<(), BioreactorError> {
    let kinetics = KineticParameters::new(0.4, 0.5, 0.5, 0.1);
    let initial = StateVector::new(0.1, 20.0, 0.0, 100.0);
    let grid = TimeGrid::linspace(0.0, 30.0, 300)?;
    let feed_rates = [0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0];
    let feed_substrate = 100.0;

    let engine = ParameterSweepEngine::default();
    let results = engine.run_sweep(&feed_rates, &initial, &grid, feed_substrate, &kinetics)?;

    results.pretty_print();
    results.save_to_file(Path::new("sweep_results.json"))?;
    Ok(())
}

pub fn main() {
    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .ok();

    if let Err(e) = run_nominal_study() {
        error!("sweep failed: {}", e);
        std::process::exit(1);
    }
}
