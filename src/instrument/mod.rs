use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::orbital::OrbitalState;

pub mod basic;

pub use basic::BasicSensorModel;

/// Geodetic target position on a spherical Earth, degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetCoords {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

// ---------------------------------------------------------------------------
// Metric records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Number(f64),
    Flag(bool),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(v) => write!(f, "{}", v),
            MetricValue::Flag(b) => write!(f, "{}", b),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Number(v)
    }
}

impl From<bool> for MetricValue {
    fn from(b: bool) -> Self {
        MetricValue::Flag(b)
    }
}

/// Named metric values in the order the instrument model produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricRecord {
    fields: Vec<(String, MetricValue)>,
}

impl MetricRecord {
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<MetricValue>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &MetricValue> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Instrument models
// ---------------------------------------------------------------------------

/// Instrument-specific observation metrics for one access.
///
/// Implement this to plug a sensor's own metric formulas into the data-metrics
/// correlator. Implementations hold no per-call state, so one model can serve
/// several workers.
pub trait InstrumentModel: Send + Sync {
    /// Instrument id this model answers for.
    fn id(&self) -> &str;

    /// Metrics for observing `target` from `state` in the given mode
    /// (`None` = the instrument's default mode).
    fn calc_data_metrics(
        &self,
        mode_id: Option<&str>,
        state: &OrbitalState,
        target: &TargetCoords,
    ) -> Result<MetricRecord>;

    fn name(&self) -> &str {
        "unnamed"
    }
}
