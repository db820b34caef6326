use std::path::{Path, PathBuf};

use crate::error::{MissionError, Result};
use crate::instrument::{InstrumentModel, TargetCoords};
use crate::io::access_file::read_access_file;
use crate::io::metrics_file::MetricsFileWriter;
use crate::io::state_file::read_state_file;

// ---------------------------------------------------------------------------
// Access file registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct AccessFileEntry {
    pub instru_id: String,
    pub mode_id: String,
    pub path: PathBuf,
}

/// (instrument, mode) -> access file, in registration order.
#[derive(Debug, Clone, Default)]
pub struct AccessFileRegistry {
    entries: Vec<AccessFileEntry>,
}

impl AccessFileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the access file of a finished coverage computation.
    pub fn add(
        &mut self,
        instru_id: impl Into<String>,
        mode_id: impl Into<String>,
        path: impl Into<PathBuf>,
    ) {
        self.entries.push(AccessFileEntry {
            instru_id: instru_id.into(),
            mode_id: mode_id.into(),
            path: path.into(),
        });
    }

    pub fn entries(&self) -> &[AccessFileEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// No instrument: first entry. Instrument only: its first entry.
    /// Instrument and mode: exact match.
    pub fn lookup(
        &self,
        instru_id: Option<&str>,
        mode_id: Option<&str>,
    ) -> Result<&AccessFileEntry> {
        if self.entries.is_empty() {
            return Err(MissionError::EmptyRegistry);
        }
        let found = match (instru_id, mode_id) {
            (None, _) => self.entries.first(),
            (Some(i), None) => self.entries.iter().find(|e| e.instru_id == i),
            (Some(i), Some(m)) => {
                self.entries.iter().find(|e| e.instru_id == i && e.mode_id == m)
            }
        };
        found.ok_or_else(|| MissionError::AccessFileNotFound {
            instru_id: instru_id.map(str::to_owned),
            mode_id: mode_id.map(str::to_owned),
        })
    }
}

// ---------------------------------------------------------------------------
// Correlator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DataMetricsSummary {
    pub instru_id: String,
    pub mode_id: String,
    pub access_file: PathBuf,
    pub output: PathBuf,
    pub rows: usize,
}

/// Joins the access events of one spacecraft with its state file by time
/// index and writes one metrics row per access.
pub struct DataMetricsCalculator<'a> {
    spacecraft_id: String,
    state_file: PathBuf,
    registry: &'a AccessFileRegistry,
}

impl<'a> DataMetricsCalculator<'a> {
    pub fn new(
        spacecraft_id: impl Into<String>,
        state_file: impl Into<PathBuf>,
        registry: &'a AccessFileRegistry,
    ) -> Self {
        DataMetricsCalculator {
            spacecraft_id: spacecraft_id.into(),
            state_file: state_file.into(),
            registry,
        }
    }

    /// Compute the metrics for the selected (or default) instrument/mode and
    /// write them to `output`, overwriting it. `models` supplies the instrument
    /// model by instrument id.
    pub fn execute(
        &self,
        models: &[&dyn InstrumentModel],
        instru_id: Option<&str>,
        mode_id: Option<&str>,
        output: &Path,
    ) -> Result<DataMetricsSummary> {
        let entry = self.registry.lookup(instru_id, mode_id)?;
        let model = models
            .iter()
            .find(|m| m.id() == entry.instru_id)
            .ok_or_else(|| MissionError::InstrumentNotFound(entry.instru_id.clone()))?;

        tracing::info!(
            "data metrics for '{}': instrument '{}', mode '{}', access file {}",
            self.spacecraft_id,
            entry.instru_id,
            entry.mode_id,
            entry.path.display()
        );

        let states = read_state_file(&self.state_file)?;
        let access = read_access_file(&entry.path)?;
        let header = states.header;
        if access.meta.header != header {
            tracing::warn!(
                "access file {} has epoch {} / step {} s, state file has epoch {} / step {} s",
                entry.path.display(),
                access.meta.header.epoch,
                access.meta.header.step_size,
                header.epoch,
                header.step_size
            );
        }

        let mode = Some(entry.mode_id.as_str()).filter(|m| !m.is_empty());
        let mut writer = MetricsFileWriter::create(output, &access.meta)?;
        for event in &access.events {
            let state = states.get(event.time_index).ok_or_else(|| MissionError::MissingTimeIndex {
                index: event.time_index,
                path: self.state_file.clone(),
            })?;
            // absolute time from the state file's own epoch/step
            let mut sc_state = *state;
            sc_state.date = header.date_at(event.time_index);

            let target = TargetCoords { lat_deg: event.lat, lon_deg: event.lon };
            let metrics = model.calc_data_metrics(mode, &sc_state, &target).map_err(|e| {
                MissionError::InstrumentModel {
                    spacecraft: self.spacecraft_id.clone(),
                    instru_id: entry.instru_id.clone(),
                    mode_id: entry.mode_id.clone(),
                    reason: e.to_string(),
                }
            })?;
            writer.write_row(event, &metrics)?;
        }
        let rows = writer.finish()?;

        tracing::debug!("wrote {} data-metric rows to {}", rows, output.display());
        Ok(DataMetricsSummary {
            instru_id: entry.instru_id.clone(),
            mode_id: entry.mode_id.clone(),
            access_file: entry.path.clone(),
            output: output.to_path_buf(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::engine_error;
    use crate::instrument::{BasicSensorModel, MetricRecord};
    use crate::io::access_file::{write_access_file, AccessEvent, AccessTarget, CoverageKind};
    use crate::io::metrics_file::read_metrics_file;
    use crate::mission::series::StateSeriesGenerator;
    use crate::mission::spacecraft::Spacecraft;
    use crate::orbital::{AnalyticalPropagator, KeplerianElements, OrbitalState};
    use crate::time::JulianDate;

    fn registry() -> AccessFileRegistry {
        let mut r = AccessFileRegistry::new();
        r.add("A", "m1", "f1");
        r.add("B", "m2", "f2");
        r.add("B", "m3", "f3");
        r
    }

    #[test]
    fn lookup_rules() {
        let r = registry();
        assert_eq!(r.lookup(None, None).unwrap().path, PathBuf::from("f1"));
        assert_eq!(
            r.lookup(None, Some("m3")).unwrap().path,
            PathBuf::from("f1"),
            "mode alone is ignored"
        );
        assert_eq!(r.lookup(Some("B"), None).unwrap().path, PathBuf::from("f2"));
        assert_eq!(r.lookup(Some("B"), Some("m3")).unwrap().path, PathBuf::from("f3"));
        let not_found = |res: Result<&AccessFileEntry>| {
            matches!(res, Err(MissionError::AccessFileNotFound { .. }))
        };
        assert!(not_found(r.lookup(Some("A"), Some("m2"))));
        assert!(not_found(r.lookup(Some("C"), None)));
        let empty = AccessFileRegistry::new();
        assert!(matches!(empty.lookup(None, None), Err(MissionError::EmptyRegistry)));
    }

    struct Fixture {
        dir: tempfile::TempDir,
        state_path: PathBuf,
        registry: AccessFileRegistry,
    }

    /// 0.05 day of states at 60 s, two access files
    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let state_path = dir.path().join("state_cartesian.csv");
        let kep = KeplerianElements::from_degrees(7078.137, 0.001, 98.0, 10.0, 10.0, 0.0);
        let orbit = OrbitalState::from_keplerian(JulianDate::new(2_458_265.0), &kep);
        let sc = Spacecraft::new("sat1", orbit);
        let prop = AnalyticalPropagator::j2();
        let header = StateSeriesGenerator::new(&prop, 60.0, 0.05)
            .unwrap()
            .write_files(&sc, Some(&state_path), None)
            .unwrap();

        let grid = dir.path().join("access_grid.csv");
        let events: Vec<AccessEvent> = [0, 3, 3, 10, 72]
            .iter()
            .enumerate()
            .map(|(k, &t)| AccessEvent {
                time_index: t,
                target: AccessTarget::GridPoint(k),
                lat: 10.0 + k as f64,
                lon: 20.0,
            })
            .collect();
        write_access_file(&grid, &header, CoverageKind::GridPoint, &events).unwrap();

        let pnt = dir.path().join("access_pnt.csv");
        let events = vec![AccessEvent {
            time_index: 5,
            target: AccessTarget::PointingOption(2),
            lat: -5.0,
            lon: 100.0,
        }];
        write_access_file(&pnt, &header, CoverageKind::PointingOption, &events).unwrap();

        let mut registry = AccessFileRegistry::new();
        registry.add("opt", "wide", grid);
        registry.add("sar", "strip", pnt);
        Fixture { dir, state_path, registry }
    }

    #[test]
    fn default_entry_one_row_per_access() {
        let f = fixture();
        let model = BasicSensorModel::new("opt");
        let out = f.dir.path().join("metrics.csv");
        let calc = DataMetricsCalculator::new("sat1", &f.state_path, &f.registry);
        let summary = calc.execute(&[&model], None, None, &out).unwrap();
        assert_eq!(summary.instru_id, "opt");
        assert_eq!(summary.rows, 5);

        let file = read_metrics_file(&out).unwrap();
        assert_eq!(file.meta_lines[0], "Datametrics computed from: GRID POINT COVERAGE");
        assert_eq!(file.time_indices().unwrap(), vec![0, 3, 3, 10, 72]);
        let states = read_state_file(&f.state_path).unwrap();
        for t in file.time_indices().unwrap() {
            assert!(states.get(t).is_some(), "time index {} missing from state file", t);
        }
        let pnt_col = file.column("pnt-opt index").unwrap();
        assert!(file.rows.iter().all(|r| r.get(pnt_col) == Some("")));
    }

    #[test]
    fn rerun_is_byte_identical() {
        let f = fixture();
        let model = BasicSensorModel::new("sar");
        let out = f.dir.path().join("metrics.csv");
        std::fs::write(&out, "stale content that must disappear\n".repeat(100)).unwrap();

        let calc = DataMetricsCalculator::new("sat1", &f.state_path, &f.registry);
        calc.execute(&[&model], Some("sar"), Some("strip"), &out).unwrap();
        let first = std::fs::read(&out).unwrap();
        calc.execute(&[&model], Some("sar"), Some("strip"), &out).unwrap();
        assert_eq!(first, std::fs::read(&out).unwrap());
        assert!(!String::from_utf8(first).unwrap().contains("stale"));
    }

    #[test]
    fn missing_time_index_is_fatal() {
        let f = fixture();
        let late = f.dir.path().join("access_late.csv");
        let header = read_state_file(&f.state_path).unwrap().header;
        let events = vec![
            AccessEvent { time_index: 1, target: AccessTarget::GridPoint(0), lat: 0.0, lon: 0.0 },
            AccessEvent { time_index: 500, target: AccessTarget::GridPoint(1), lat: 0.0, lon: 0.0 },
        ];
        write_access_file(&late, &header, CoverageKind::GridPoint, &events).unwrap();
        let mut registry = AccessFileRegistry::new();
        registry.add("opt", "wide", late);

        let model = BasicSensorModel::new("opt");
        let calc = DataMetricsCalculator::new("sat1", &f.state_path, &registry);
        let err = calc.execute(&[&model], None, None, &f.dir.path().join("m.csv")).unwrap_err();
        assert!(matches!(err, MissionError::MissingTimeIndex { index: 500, .. }), "{}", err);
    }

    #[test]
    fn unknown_instrument_model() {
        let f = fixture();
        let model = BasicSensorModel::new("other");
        let calc = DataMetricsCalculator::new("sat1", &f.state_path, &f.registry);
        let err = calc.execute(&[&model], None, None, &f.dir.path().join("m.csv")).unwrap_err();
        assert!(matches!(err, MissionError::InstrumentNotFound(ref id) if id == "opt"));
    }

    struct BrokenModel;

    impl InstrumentModel for BrokenModel {
        fn id(&self) -> &str {
            "opt"
        }

        fn calc_data_metrics(
            &self,
            _: Option<&str>,
            _: &OrbitalState,
            _: &TargetCoords,
        ) -> Result<MetricRecord> {
            Err(engine_error!("detector offline"))
        }
    }

    #[test]
    fn model_failure_carries_context() {
        let f = fixture();
        let calc = DataMetricsCalculator::new("sat1", &f.state_path, &f.registry);
        let out = f.dir.path().join("m.csv");
        let err = calc.execute(&[&BrokenModel], Some("opt"), None, &out).unwrap_err();
        match err {
            MissionError::InstrumentModel { spacecraft, instru_id, mode_id, reason } => {
                assert_eq!(
                    (spacecraft.as_str(), instru_id.as_str(), mode_id.as_str()),
                    ("sat1", "opt", "wide")
                );
                assert!(reason.contains("detector offline"));
            }
            other => panic!("unexpected error {}", other),
        }
    }
}
