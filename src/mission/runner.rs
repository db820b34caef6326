use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{bounded, unbounded};

use crate::config::{Factories, MissionConfig};
use crate::error::{MissionError, Result};
use crate::mission::resolution::step_size_for;
use crate::mission::series::StateSeriesGenerator;
use crate::mission::spacecraft::Spacecraft;
use crate::orbital::Propagator;
use crate::time::JulianDate;

pub const CARTESIAN_FILE: &str = "state_cartesian.csv";
pub const KEPLERIAN_FILE: &str = "state_keplerian.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct SpacecraftOutput {
    pub spacecraft: String,
    pub cartesian: PathBuf,
    pub keplerian: Option<PathBuf>,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct MissionSummary {
    pub epoch: JulianDate,
    pub step_size: f64, // s
    pub outputs: Vec<SpacecraftOutput>,
}

/// Directory holding the state files of one spacecraft.
pub fn spacecraft_dir(output_dir: &Path, spacecraft_id: &str) -> PathBuf {
    output_dir.join(format!("sat{}", spacecraft_id))
}

/// Worker threads for a fleet: the configured count, else the available
/// parallelism. At least one, at most one per spacecraft.
pub fn worker_count(configured: Option<usize>, fleet_size: usize) -> usize {
    let workers = configured
        .or_else(|| thread::available_parallelism().ok().map(NonZeroUsize::get))
        .unwrap_or(1);
    workers.clamp(1, fleet_size.max(1))
}

// ---------------------------------------------------------------------------
// Single spacecraft
// ---------------------------------------------------------------------------

/// Propagate one spacecraft and write its state files. Owns nothing shared.
pub fn propagate_spacecraft(
    spacecraft: &Spacecraft,
    propagator: &dyn Propagator,
    epoch: JulianDate,
    step_size: f64,
    duration_days: f64,
    output_dir: &Path,
    keplerian_output: bool,
) -> Result<SpacecraftOutput> {
    let dir = spacecraft_dir(output_dir, &spacecraft.id);
    std::fs::create_dir_all(&dir)?;
    let cartesian = dir.join(CARTESIAN_FILE);
    let keplerian = keplerian_output.then(|| dir.join(KEPLERIAN_FILE));

    let header = StateSeriesGenerator::new(propagator, step_size, duration_days)?
        .start_date(epoch)
        .write_files(spacecraft, Some(&cartesian), keplerian.as_deref())?;

    Ok(SpacecraftOutput {
        spacecraft: spacecraft.id.clone(),
        cartesian,
        keplerian,
        rows: header.num_steps() + 1,
    })
}

// ---------------------------------------------------------------------------
// Full mission
// ---------------------------------------------------------------------------

/// Run the state series generator for every spacecraft of the mission on a
/// bounded pool of worker threads, so at most `workers` spacecraft have state
/// files open at a time. All spacecraft are processed; the first failure (in
/// spacecraft order) is returned afterwards.
pub fn run_mission(config: &MissionConfig, factories: &Factories) -> Result<MissionSummary> {
    let fleet = config.resolve_spacecraft(factories)?;
    let propagator = config.build_propagator(factories)?;
    let epoch = config.mission_epoch();
    let settings = &config.settings;

    let step_size = match settings.step_size {
        Some(step) => step,
        None => step_size_for(&fleet, settings.resolution_factor)?,
    };
    std::fs::create_dir_all(&settings.output_dir)?;
    let workers = worker_count(settings.workers, fleet.len());

    tracing::info!(
        "mission: {} spacecraft, {} days from JD {}, step {:.3} s, {}, {} workers",
        fleet.len(),
        config.duration,
        epoch,
        step_size,
        propagator.name(),
        workers
    );

    let propagator: &dyn Propagator = propagator.as_ref();
    let mut results: Vec<Option<Result<SpacecraftOutput>>> = fleet.iter().map(|_| None).collect();

    thread::scope(|scope| {
        let (job_tx, job_rx) = bounded::<(usize, &Spacecraft)>(workers);
        let (result_tx, result_rx) = unbounded::<(usize, Result<SpacecraftOutput>)>();

        let handles: Vec<_> = (0..workers)
            .map(|worker_id| {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    tracing::debug!("mission worker {} started", worker_id);
                    while let Ok((index, sc)) = job_rx.recv() {
                        let result = propagate_spacecraft(
                            sc,
                            propagator,
                            epoch,
                            step_size,
                            config.duration,
                            &settings.output_dir,
                            settings.keplerian_output,
                        );
                        if result_tx.send((index, result)).is_err() {
                            break;
                        }
                    }
                    tracing::debug!("mission worker {} shutting down", worker_id);
                })
            })
            .collect();
        drop(job_rx);
        drop(result_tx);

        for job in fleet.iter().enumerate() {
            // fails only once every worker is gone
            if job_tx.send(job).is_err() {
                break;
            }
        }
        drop(job_tx);

        for (worker_id, handle) in handles.into_iter().enumerate() {
            if handle.join().is_err() {
                tracing::error!("mission worker {} panicked", worker_id);
            }
        }
        for (index, result) in result_rx.try_iter() {
            results[index] = Some(result);
        }
    });

    let mut outputs = Vec::with_capacity(fleet.len());
    let mut first_error = None;
    for (sc, result) in fleet.iter().zip(results) {
        let result = result.unwrap_or_else(|| {
            Err(MissionError::Propagation {
                spacecraft: sc.id.clone(),
                index: 0,
                reason: "worker thread panicked".to_string(),
            })
        });
        match result {
            Ok(out) => {
                tracing::info!(
                    "'{}': {} states written to {}",
                    out.spacecraft,
                    out.rows,
                    out.cartesian.display()
                );
                outputs.push(out);
            }
            Err(e) => {
                tracing::error!("'{}': {}", sc.id, e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(MissionSummary { epoch, step_size, outputs }),
    }
}
