use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{format_error, Result};
use crate::io::{column, parse_field, read_metadata, write_metadata};
use crate::mission::series::{SeriesHeader, StateSink};
use crate::orbital::{KeplerianElements, OrbitalState};

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFrame {
    Cartesian,
    Keplerian,
}

impl StateFrame {
    pub fn label(&self) -> &'static str {
        match self {
            StateFrame::Cartesian => concat!(
                "Satellite states are in CARTESIAN_EARTH_CENTERED_INERTIAL ",
                "(equatorial-plane) frame."
            ),
            StateFrame::Keplerian => concat!(
                "Satellite states are in KEPLERIAN_EARTH_CENTERED_INERTIAL ",
                "(equatorial-plane) frame."
            ),
        }
    }

    pub fn columns(&self) -> &'static str {
        match self {
            StateFrame::Cartesian => {
                "time index,x [km],y [km],z [km],vx [km/s],vy [km/s],vz [km/s]"
            }
            StateFrame::Keplerian => {
                "time index,sma [km],ecc,inc [deg],raan [deg],aop [deg],ta [deg]"
            }
        }
    }

    fn from_columns(headers: &csv::StringRecord) -> Option<StateFrame> {
        match headers.get(1) {
            Some("x [km]") => Some(StateFrame::Cartesian),
            Some("sma [km]") => Some(StateFrame::Keplerian),
            _ => None,
        }
    }

    /// The six values written after the time index.
    fn values(&self, state: &OrbitalState) -> [f64; 6] {
        match self {
            StateFrame::Cartesian => state.cartesian(),
            StateFrame::Keplerian => state.keplerian().to_degrees(),
        }
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Streams a state series to a file: metadata, column header, then one row per
/// time index. Values use the shortest representation that parses back exactly.
pub struct StateFileWriter<W: Write> {
    writer: W,
    frame: StateFrame,
}

impl StateFileWriter<BufWriter<File>> {
    pub fn create(path: &Path, frame: StateFrame) -> Result<Self> {
        let file = File::create(path)?;
        tracing::debug!("writing {:?} states to {}", frame, path.display());
        Ok(StateFileWriter::new(BufWriter::new(file), frame))
    }
}

impl<W: Write> StateFileWriter<W> {
    pub fn new(writer: W, frame: StateFrame) -> Self {
        StateFileWriter { writer, frame }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> StateSink for StateFileWriter<W> {
    fn begin(&mut self, header: &SeriesHeader) -> Result<()> {
        write_metadata(&mut self.writer, self.frame.label(), header)?;
        writeln!(self.writer, "{}", self.frame.columns())?;
        Ok(())
    }

    fn record(&mut self, index: usize, state: &OrbitalState) -> Result<()> {
        let v = self.frame.values(state);
        writeln!(
            self.writer,
            "{},{},{},{},{},{},{}",
            index, v[0], v[1], v[2], v[3], v[4], v[5]
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StateFile {
    pub path: PathBuf,
    pub header: SeriesHeader,
    pub frame: StateFrame,
    pub states: BTreeMap<usize, OrbitalState>,
}

impl StateFile {
    pub fn get(&self, index: usize) -> Option<&OrbitalState> {
        self.states.get(&index)
    }
}

/// Read a state file written by [`StateFileWriter`]. A truncated file (aborted
/// run) yields the rows that were written. State dates are `epoch + i * step`.
pub fn read_state_file(path: &Path) -> Result<StateFile> {
    let mut reader = BufReader::new(File::open(path)?);
    let meta = read_metadata(&mut reader, path)?;
    let header = meta.header;

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let frame = StateFrame::from_columns(&headers).ok_or_else(|| {
        let found: Vec<&str> = headers.iter().collect();
        format_error!(path, "unrecognised state columns '{}'", found.join(","))
    })?;
    let index_col = column(&headers, "time index")
        .ok_or_else(|| format_error!(path, "missing 'time index' column"))?;

    let mut states = BTreeMap::new();
    for record in csv_reader.records() {
        let record = record?;
        if record.len() < 7 {
            return Err(format_error!(
                path,
                "state row {:?} has {} fields, expected 7",
                record,
                record.len()
            ));
        }
        let index: usize = parse_field(&record, index_col, path)?;
        let mut v = [0.0; 6];
        for (k, value) in v.iter_mut().enumerate() {
            *value = parse_field(&record, k + 1, path)?;
        }

        let date = header.date_at(index);
        let state = match frame {
            StateFrame::Cartesian => OrbitalState::from_cartesian(date, &v),
            StateFrame::Keplerian => {
                let elements = KeplerianElements::from_degrees(v[0], v[1], v[2], v[3], v[4], v[5]);
                OrbitalState::from_keplerian(date, &elements)
            }
        };
        if states.insert(index, state).is_some() {
            return Err(format_error!(path, "duplicate time index {}", index));
        }
    }

    tracing::debug!("read {} {:?} states from {}", states.len(), frame, path.display());
    Ok(StateFile { path: path.to_path_buf(), header, frame, states })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::JulianDate;

    fn header() -> SeriesHeader {
        SeriesHeader {
            epoch: JulianDate::new(2_458_265.0),
            step_size: 60.0,
            duration_days: 1.0,
        }
    }

    fn state() -> OrbitalState {
        let kep = KeplerianElements::from_degrees(7078.137, 0.001, 98.0, 10.0, 10.0, 0.0);
        OrbitalState::from_keplerian(JulianDate::new(2_458_265.0), &kep)
    }

    #[test]
    fn cartesian_layout() {
        let mut w = StateFileWriter::new(Vec::new(), StateFrame::Cartesian);
        w.begin(&header()).unwrap();
        w.record(0, &state()).unwrap();
        w.finish().unwrap();

        let text = String::from_utf8(w.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6); // 4 metadata + column header + 1 row
        assert!(lines[0].contains("CARTESIAN_EARTH_CENTERED_INERTIAL"));
        assert_eq!(lines[1], "Epoch [JDUT1] is 2458265");
        assert_eq!(lines[2], "Step size [s] is 60");
        assert_eq!(lines[3], "Mission Duration [Days] is 1");
        assert_eq!(lines[4], StateFrame::Cartesian.columns());
        assert!(lines[5].starts_with("0,"));
    }

    #[test]
    fn values_are_written_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.csv");
        let s = state();
        let mut w = StateFileWriter::create(&path, StateFrame::Cartesian).unwrap();
        w.begin(&header()).unwrap();
        w.record(0, &s).unwrap();
        w.finish().unwrap();

        let file = read_state_file(&path).unwrap();
        assert_eq!(file.frame, StateFrame::Cartesian);
        assert_eq!(file.get(0), Some(&s));
    }

    #[test]
    fn duplicate_index_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.csv");
        let mut w = StateFileWriter::create(&path, StateFrame::Keplerian).unwrap();
        w.begin(&header()).unwrap();
        w.record(3, &state()).unwrap();
        w.record(3, &state()).unwrap();
        w.finish().unwrap();

        let err = read_state_file(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate time index 3"), "{}", err);
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        let mut f = File::create(&path).unwrap();
        write_metadata(&mut f, "something else", &header()).unwrap();
        writeln!(f, "time index,a,b,c,d,e,f").unwrap();
        drop(f);
        assert!(read_state_file(&path).is_err());
    }
}
