pub mod datametrics;
pub mod resolution;
pub mod runner;
pub mod series;
pub mod spacecraft;

pub use datametrics::{AccessFileRegistry, DataMetricsCalculator, DataMetricsSummary};
pub use resolution::{select_step_size, step_size_for, FootprintGeometry};
pub use runner::{run_mission, MissionSummary};
pub use series::{SeriesHeader, StateSeriesGenerator, StateSink, TimeIndexedSeries};
pub use spacecraft::{FieldOfRegard, Instrument, InstrumentMode, Spacecraft};
