//! Process front-end for the SONATA network description layer (spec §6).
//!
//! Single positional argument: a path to a JSON configuration. Builds
//! the recipe the configuration describes, walks every gid to confirm
//! it is fully queryable, and exits 0 on success or 1 on any error
//! (message on standard error) — no subcommands, no interactive state.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sonata_cli::config::SimConfig;
use sonata_cli::error::CliResult;
use sonata_cli::load;
use sonata_model::{CellDescription, Gid};

/// Build and validate a SONATA network description from a JSON
/// configuration.
#[derive(Parser, Debug)]
#[command(name = "sonata", version, about = "SONATA network description front-end")]
struct Args {
    /// Path to the JSON simulation configuration.
    config: PathBuf,
}

fn run(args: Args) -> CliResult<()> {
    let config = SimConfig::load(&args.config)?;
    let base_dir = args.config.parent().unwrap_or_else(|| std::path::Path::new("."));

    let (recipe, num_cells) = load::build_recipe(&config, base_dir)?;
    info!(num_cells, "network loaded");

    let mut num_cable = 0u64;
    let mut num_spike_source = 0u64;
    for gid in (0..num_cells).map(Gid::new) {
        match recipe.cell_description(gid)? {
            CellDescription::Cable { .. } => num_cable += 1,
            CellDescription::SpikeSource { .. } => num_spike_source += 1,
        }
    }
    info!(num_cable, num_spike_source, "cell descriptions resolved");

    let props = recipe.global_properties();
    info!(
        temperature_k = props.temperature_k,
        v_init_mv = props.v_init_mv,
        default_threshold_mv = props.default_threshold_mv,
        "simulation conditions"
    );

    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
