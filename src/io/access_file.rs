use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{format_error, Result};
use crate::io::{column, parse_field, read_metadata, write_metadata, FileMetadata};
use crate::mission::series::SeriesHeader;

pub const GP_INDEX: &str = "GP index";
pub const PNT_OPT_INDEX: &str = "pnt-opt index";

/// Coverage mode that produced an access file, fixes which index column it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageKind {
    GridPoint,
    PointingOption,
}

impl CoverageKind {
    pub fn label(&self) -> &'static str {
        match self {
            CoverageKind::GridPoint => "GRID POINT COVERAGE",
            CoverageKind::PointingOption => "POINTING OPTIONS COVERAGE",
        }
    }

    pub fn index_column(&self) -> &'static str {
        match self {
            CoverageKind::GridPoint => GP_INDEX,
            CoverageKind::PointingOption => PNT_OPT_INDEX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessTarget {
    GridPoint(usize),
    PointingOption(usize),
}

impl AccessTarget {
    pub fn grid_point(&self) -> Option<usize> {
        match *self {
            AccessTarget::GridPoint(i) => Some(i),
            AccessTarget::PointingOption(_) => None,
        }
    }

    pub fn pointing_option(&self) -> Option<usize> {
        match *self {
            AccessTarget::PointingOption(i) => Some(i),
            AccessTarget::GridPoint(_) => None,
        }
    }

    fn kind(&self) -> CoverageKind {
        match self {
            AccessTarget::GridPoint(_) => CoverageKind::GridPoint,
            AccessTarget::PointingOption(_) => CoverageKind::PointingOption,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccessEvent {
    pub time_index: usize,
    pub target: AccessTarget,
    pub lat: f64, // deg
    pub lon: f64, // deg
}

#[derive(Debug, Clone)]
pub struct AccessFile {
    pub path: PathBuf,
    pub meta: FileMetadata,
    pub kind: CoverageKind,
    pub events: Vec<AccessEvent>,
}

/// Read an access-event file. The coverage kind comes from the column header,
/// exactly one of the two index columns must be present.
pub fn read_access_file(path: &Path) -> Result<AccessFile> {
    let mut reader = BufReader::new(File::open(path)?);
    let meta = read_metadata(&mut reader, path)?;

    let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let index_columns = (column(&headers, GP_INDEX), column(&headers, PNT_OPT_INDEX));
    let (kind, target_col) = match index_columns {
        (Some(c), None) => (CoverageKind::GridPoint, c),
        (None, Some(c)) => (CoverageKind::PointingOption, c),
        (Some(_), Some(_)) => {
            return Err(format_error!(
                path,
                "both '{}' and '{}' columns present",
                GP_INDEX,
                PNT_OPT_INDEX
            ));
        }
        (None, None) => {
            return Err(format_error!(
                path,
                "neither '{}' nor '{}' column present",
                GP_INDEX,
                PNT_OPT_INDEX
            ));
        }
    };
    let required = |name: &str| {
        column(&headers, name).ok_or_else(|| format_error!(path, "missing '{}' column", name))
    };
    let time_col = required("time index")?;
    let lat_col = required("lat [deg]")?;
    let lon_col = required("lon [deg]")?;

    let mut events = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let target_idx: usize = parse_field(&record, target_col, path)?;
        events.push(AccessEvent {
            time_index: parse_field(&record, time_col, path)?,
            target: match kind {
                CoverageKind::GridPoint => AccessTarget::GridPoint(target_idx),
                CoverageKind::PointingOption => AccessTarget::PointingOption(target_idx),
            },
            lat: parse_field(&record, lat_col, path)?,
            lon: parse_field(&record, lon_col, path)?,
        });
    }

    tracing::debug!("read {} access events ({:?}) from {}", events.len(), kind, path.display());
    Ok(AccessFile { path: path.to_path_buf(), meta, kind, events })
}

/// Write an access-event file in the layout [`read_access_file`] expects.
pub fn write_access_file(
    path: &Path,
    header: &SeriesHeader,
    kind: CoverageKind,
    events: &[AccessEvent],
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_metadata(&mut writer, kind.label(), header)?;
    writeln!(writer, "time index,{},lat [deg],lon [deg]", kind.index_column())?;

    for e in events {
        if e.target.kind() != kind {
            return Err(format_error!(path, "{:?} event in a {:?} access file", e.target, kind));
        }
        let idx = match e.target {
            AccessTarget::GridPoint(i) | AccessTarget::PointingOption(i) => i,
        };
        writeln!(writer, "{},{},{},{}", e.time_index, idx, e.lat, e.lon)?;
    }
    writer.flush()?;
    Ok(())
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

    fn event(time_index: usize, target: AccessTarget, lat: f64, lon: f64) -> AccessEvent {
        AccessEvent { time_index, target, lat, lon }
    }

    #[test]
    fn grid_point_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.csv");
        let events = vec![
            event(3, AccessTarget::GridPoint(17), 12.5, -45.0),
            event(4, AccessTarget::GridPoint(18), 13.0, -44.25),
        ];
        write_access_file(&path, &header(), CoverageKind::GridPoint, &events).unwrap();

        let file = read_access_file(&path).unwrap();
        assert_eq!(file.kind, CoverageKind::GridPoint);
        assert_eq!(file.meta.label(), "GRID POINT COVERAGE");
        assert_eq!(file.meta.header, header());
        assert_eq!(file.events, events);
        assert_eq!(file.events[0].target.pointing_option(), None);
    }

    #[test]
    fn pointing_option_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.csv");
        let events = vec![event(0, AccessTarget::PointingOption(2), 0.0, 10.0)];
        write_access_file(&path, &header(), CoverageKind::PointingOption, &events).unwrap();

        let file = read_access_file(&path).unwrap();
        assert_eq!(file.kind, CoverageKind::PointingOption);
        assert_eq!(file.events[0].target.pointing_option(), Some(2));
    }

    #[test]
    fn mixed_targets_are_rejected_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.csv");
        let events = vec![event(0, AccessTarget::PointingOption(2), 0.0, 10.0)];
        assert!(write_access_file(&path, &header(), CoverageKind::GridPoint, &events).is_err());
    }

    #[test]
    fn both_index_columns_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.csv");
        let mut f = File::create(&path).unwrap();
        write_metadata(&mut f, "GRID POINT COVERAGE", &header()).unwrap();
        writeln!(f, "time index,GP index,pnt-opt index,lat [deg],lon [deg]").unwrap();
        writeln!(f, "0,1,2,0.0,0.0").unwrap();
        drop(f);

        let err = read_access_file(&path).unwrap_err();
        assert!(err.to_string().contains("both"), "{}", err);
    }
}
