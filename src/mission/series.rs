use std::path::Path;

use crate::error::{config_error, MissionError, Result};
use crate::io::state_file::{StateFileWriter, StateFrame};
use crate::mission::spacecraft::Spacecraft;
use crate::orbital::{OrbitalState, Propagator};
use crate::time::{JulianDate, SECONDS_PER_DAY};

// ---------------------------------------------------------------------------
// Series metadata
// ---------------------------------------------------------------------------

/// Fixed metadata of a time-indexed series: time of index i is
/// `epoch + i * step_size` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesHeader {
    pub epoch: JulianDate,
    pub step_size: f64, // s
    pub duration_days: f64,
}

impl SeriesHeader {
    /// floor(duration * 86400 / step); the series holds one more row than this.
    pub fn num_steps(&self) -> usize {
        (self.duration_days * SECONDS_PER_DAY / self.step_size).floor() as usize
    }

    pub fn date_at(&self, index: usize) -> JulianDate {
        self.epoch.add_seconds(index as f64 * self.step_size)
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Receiver of a generated series. Records arrive in index order starting at 0.
/// `finish` is also called when a run aborts, after the last written record.
pub trait StateSink {
    fn begin(&mut self, header: &SeriesHeader) -> Result<()>;

    fn record(&mut self, index: usize, state: &OrbitalState) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory series, the position in `states` is the time index.
#[derive(Debug, Clone, Default)]
pub struct TimeIndexedSeries {
    pub header: Option<SeriesHeader>,
    pub states: Vec<OrbitalState>,
}

impl TimeIndexedSeries {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&OrbitalState> {
        self.states.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &OrbitalState)> {
        self.states.iter().enumerate()
    }
}

impl StateSink for TimeIndexedSeries {
    fn begin(&mut self, header: &SeriesHeader) -> Result<()> {
        self.header = Some(*header);
        self.states.clear();
        self.states.reserve(header.num_steps() + 1);
        Ok(())
    }

    fn record(&mut self, index: usize, state: &OrbitalState) -> Result<()> {
        if index != self.states.len() {
            return Err(config_error!(
                "non-contiguous time index {} (expected {})",
                index,
                self.states.len()
            ));
        }
        self.states.push(*state);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Advances one spacecraft through the mission timeline and feeds every
/// time-indexed state to a set of sinks.
pub struct StateSeriesGenerator<'a> {
    propagator: &'a dyn Propagator,
    step_size: f64,
    duration_days: f64,
    start: Option<JulianDate>,
}

impl<'a> StateSeriesGenerator<'a> {
    pub fn new(propagator: &'a dyn Propagator, step_size: f64, duration_days: f64) -> Result<Self> {
        if !(step_size > 0.0 && step_size.is_finite()) {
            return Err(config_error!("step size must be positive and finite, got {}", step_size));
        }
        if !(duration_days >= 0.0 && duration_days.is_finite()) {
            return Err(config_error!(
                "mission duration must be finite and not negative, got {} days",
                duration_days
            ));
        }
        Ok(StateSeriesGenerator { propagator, step_size, duration_days, start: None })
    }

    /// Propagation start (index 0). Defaults to the spacecraft's orbit epoch.
    pub fn start_date(mut self, date: JulianDate) -> Self {
        self.start = Some(date);
        self
    }

    pub fn header_for(&self, spacecraft: &Spacecraft) -> SeriesHeader {
        SeriesHeader {
            epoch: self.start.unwrap_or(spacecraft.orbit.date),
            step_size: self.step_size,
            duration_days: self.duration_days,
        }
    }

    /// Run the timeline, returning the series header. A propagation failure aborts
    /// the run; sinks are still finished so partial output is flushed, and the
    /// propagation error is returned.
    pub fn run(
        &self,
        spacecraft: &Spacecraft,
        sinks: &mut [&mut dyn StateSink],
    ) -> Result<SeriesHeader> {
        let header = self.header_for(spacecraft);
        tracing::info!(
            "propagating '{}' with {}: {} steps of {} s from JD {}",
            spacecraft.id,
            self.propagator.name(),
            header.num_steps(),
            self.step_size,
            header.epoch
        );

        if let Err(e) = self.emit_series(spacecraft, &header, sinks) {
            close_after_abort(&spacecraft.id, sinks);
            return Err(e);
        }
        for sink in sinks.iter_mut() {
            sink.finish()?;
        }
        Ok(header)
    }

    fn emit_series(
        &self,
        spacecraft: &Spacecraft,
        header: &SeriesHeader,
        sinks: &mut [&mut dyn StateSink],
    ) -> Result<()> {
        let fail = |index: usize, e: MissionError| MissionError::Propagation {
            spacecraft: spacecraft.id.clone(),
            index,
            reason: e.to_string(),
        };

        // working copy, the spacecraft's defining state stays untouched
        let mut state = spacecraft.orbit;
        if state.date != header.epoch {
            tracing::debug!(
                "aligning '{}' from JD {} to JD {}",
                spacecraft.id,
                state.date,
                header.epoch
            );
            state = self
                .propagator
                .propagate(&state, header.epoch)
                .map_err(|e| fail(0, e))?;
        }

        for sink in sinks.iter_mut() {
            sink.begin(header)?;
        }
        emit(sinks, 0, &state)?;

        for index in 1..=header.num_steps() {
            let date = header.date_at(index);
            state = self.propagator.propagate(&state, date).map_err(|e| fail(index, e))?;
            emit(sinks, index, &state)?;
        }
        Ok(())
    }

    pub fn collect(&self, spacecraft: &Spacecraft) -> Result<TimeIndexedSeries> {
        let mut series = TimeIndexedSeries::default();
        let mut sinks: [&mut dyn StateSink; 1] = [&mut series];
        self.run(spacecraft, &mut sinks)?;
        Ok(series)
    }

    /// Write the Cartesian and/or Keplerian state files. Files that were already
    /// created are flushed and closed on every exit path.
    pub fn write_files(
        &self,
        spacecraft: &Spacecraft,
        cartesian: Option<&Path>,
        keplerian: Option<&Path>,
    ) -> Result<SeriesHeader> {
        let mut cart_writer = cartesian
            .map(|p| StateFileWriter::create(p, StateFrame::Cartesian))
            .transpose()?;
        let mut kep_writer = keplerian
            .map(|p| StateFileWriter::create(p, StateFrame::Keplerian))
            .transpose()?;

        let mut sinks: Vec<&mut dyn StateSink> = Vec::with_capacity(2);
        if let Some(w) = cart_writer.as_mut() {
            sinks.push(w);
        }
        if let Some(w) = kep_writer.as_mut() {
            sinks.push(w);
        }
        self.run(spacecraft, &mut sinks)
    }
}

fn emit(sinks: &mut [&mut dyn StateSink], index: usize, state: &OrbitalState) -> Result<()> {
    for sink in sinks.iter_mut() {
        sink.record(index, state)?;
    }
    Ok(())
}

/// Flush what an aborted run managed to write. Close failures are only logged.
fn close_after_abort(spacecraft_id: &str, sinks: &mut [&mut dyn StateSink]) {
    for sink in sinks.iter_mut() {
        if let Err(e) = sink.finish() {
            tracing::warn!("'{}': closing partial output failed: {}", spacecraft_id, e);
        }
    }
}
