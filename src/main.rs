use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use orbit_mission::config::{Factories, MissionConfig};
use orbit_mission::instrument::BasicSensorModel;
use orbit_mission::logging::init_logging;
use orbit_mission::mission::{run_mission, AccessFileRegistry, DataMetricsCalculator};

#[derive(Parser, Debug)]
#[command(version, about = "orbit propagation and observation data-metrics for mission design")]
struct Args {
    /// trace, debug, info, warn or error (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Propagate every spacecraft of a mission configuration and write state files
    Propagate {
        /// mission configuration (JSON)
        config: PathBuf,

        /// overrides settings.outputDir
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Correlate an access file with a state file and write data metrics
    Datametrics {
        /// Cartesian state file of the spacecraft
        #[arg(long)]
        state: PathBuf,

        /// access-event file of the instrument/mode
        #[arg(long)]
        access: PathBuf,

        #[arg(long, default_value = "instrument")]
        instrument: String,

        #[arg(long, default_value = "")]
        mode: String,

        #[arg(long, default_value = "sat")]
        spacecraft: String,

        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    match args.command {
        Command::Propagate { config, output_dir } => {
            let mut mission = MissionConfig::from_file(&config)
                .with_context(|| format!("loading mission configuration {}", config.display()))?;
            if let Some(dir) = output_dir {
                mission.settings.output_dir = dir;
            }

            let summary = run_mission(&mission, &Factories::default())?;

            println!();
            println!(
                "  Mission epoch: JD {}   step size: {:.3} s",
                summary.epoch, summary.step_size
            );
            println!("  {}", "─".repeat(60));
            for out in &summary.outputs {
                println!(
                    "  {:<20} {:>8} states   {}",
                    out.spacecraft,
                    out.rows,
                    out.cartesian.display()
                );
            }
            println!();
        }

        Command::Datametrics { state, access, instrument, mode, spacecraft, output } => {
            let mut registry = AccessFileRegistry::new();
            registry.add(instrument.as_str(), mode.as_str(), access);
            let model = BasicSensorModel::new(instrument.as_str());
            let mode_id = Some(mode.as_str()).filter(|m| !m.is_empty());

            let summary = DataMetricsCalculator::new(spacecraft, state, &registry)
                .execute(&[&model], Some(instrument.as_str()), mode_id, &output)
                .context("computing data metrics")?;
            println!("  {} data-metric rows written to {}", summary.rows, summary.output.display());
        }
    }

    Ok(())
}
