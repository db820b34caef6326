use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::error::{format_error, Result};
use crate::mission::series::SeriesHeader;
use crate::time::JulianDate;

pub mod access_file;
pub mod metrics_file;
pub mod state_file;

const EPOCH_KEY: &str = "Epoch [JDUT1] is";
const STEP_KEY: &str = "Step size [s] is";
const DURATION_KEY: &str = "Mission Duration [Days] is";

// ---------------------------------------------------------------------------
// Descriptive metadata shared by state, access and data-metrics files
// ---------------------------------------------------------------------------

/// The four descriptive lines every series file starts with: a label line,
/// epoch, step size and mission duration. `lines` keeps them verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub lines: [String; 4],
    pub header: SeriesHeader,
}

impl FileMetadata {
    pub fn label(&self) -> &str {
        &self.lines[0]
    }
}

pub fn write_metadata<W: Write>(
    writer: &mut W,
    label: &str,
    header: &SeriesHeader,
) -> io::Result<()> {
    writeln!(writer, "{}", label)?;
    writeln!(writer, "{} {}", EPOCH_KEY, header.epoch)?;
    writeln!(writer, "{} {}", STEP_KEY, header.step_size)?;
    writeln!(writer, "{} {}", DURATION_KEY, header.duration_days)?;
    Ok(())
}

pub fn read_metadata<R: BufRead>(reader: &mut R, path: &Path) -> Result<FileMetadata> {
    let mut lines: [String; 4] = Default::default();
    for (i, line) in lines.iter_mut().enumerate() {
        if reader.read_line(line)? == 0 {
            return Err(format_error!(path, "metadata ends after {} lines", i));
        }
        let trimmed_len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed_len);
    }

    let header = SeriesHeader {
        epoch: JulianDate::new(parse_value(&lines[1], EPOCH_KEY, path)?),
        step_size: parse_value(&lines[2], STEP_KEY, path)?,
        duration_days: parse_value(&lines[3], DURATION_KEY, path)?,
    };
    Ok(FileMetadata { lines, header })
}

fn parse_value(line: &str, key: &str, path: &Path) -> Result<f64> {
    line.strip_prefix(key)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .ok_or_else(|| format_error!(path, "expected '{} <value>', found '{}'", key, line))
}

/// Position of a named column in a CSV header record.
fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn parse_field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    idx: usize,
    path: &Path,
) -> Result<T> {
    record
        .get(idx)
        .and_then(|v| v.parse::<T>().ok())
        .ok_or_else(|| format_error!(path, "bad value in column {} of row {:?}", idx, record))
}
