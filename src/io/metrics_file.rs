use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{format_error, Result};
use crate::instrument::MetricRecord;
use crate::io::access_file::{AccessEvent, GP_INDEX, PNT_OPT_INDEX};
use crate::io::FileMetadata;

pub const PROVENANCE_TAG: &str = "Datametrics computed from:";

const BASE_COLUMNS: [&str; 5] = ["time index", GP_INDEX, PNT_OPT_INDEX, "lat [deg]", "lon [deg]"];

/// Streams data-metric rows. The column header is fixed by the first row's
/// metric names; later rows are written in their own field order.
pub struct MetricsFileWriter<W: Write> {
    writer: csv::Writer<W>,
    path: PathBuf,
    columns: Option<Vec<String>>,
    rows: usize,
}

impl MetricsFileWriter<BufWriter<File>> {
    /// Create (or overwrite) `path` and write the provenance metadata copied
    /// from the access file.
    pub fn create(path: &Path, access_meta: &FileMetadata) -> Result<Self> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "{} {}", PROVENANCE_TAG, access_meta.lines[0])?;
        for line in &access_meta.lines[1..] {
            writeln!(out, "{}", line)?;
        }
        Ok(MetricsFileWriter::new(out, path))
    }
}

impl<W: Write> MetricsFileWriter<W> {
    pub fn new(writer: W, path: &Path) -> Self {
        let writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);
        MetricsFileWriter {
            writer,
            path: path.to_path_buf(),
            columns: None,
            rows: 0,
        }
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn write_row(&mut self, event: &AccessEvent, metrics: &MetricRecord) -> Result<()> {
        let names: Vec<String> = metrics.names().map(str::to_owned).collect();
        if let Some(columns) = &self.columns {
            if *columns != names {
                tracing::warn!(
                    "{}: row for time index {} has metric fields {:?}, header has {:?}",
                    self.path.display(),
                    event.time_index,
                    names,
                    columns
                );
            }
        } else {
            let header: Vec<&str> = BASE_COLUMNS
                .iter()
                .copied()
                .chain(names.iter().map(String::as_str))
                .collect();
            self.writer.write_record(&header)?;
            self.columns = Some(names);
        }

        let mut row: Vec<String> = Vec::with_capacity(BASE_COLUMNS.len() + metrics.len());
        row.push(event.time_index.to_string());
        row.push(event.target.grid_point().map(|i| i.to_string()).unwrap_or_default());
        row.push(event.target.pointing_option().map(|i| i.to_string()).unwrap_or_default());
        row.push(event.lat.to_string());
        row.push(event.lon.to_string());
        row.extend(metrics.values().map(|v| v.to_string()));
        self.writer.write_record(&row)?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and return the number of data rows. A file without rows still
    /// gets the base column header.
    pub fn finish(mut self) -> Result<usize> {
        if self.columns.is_none() {
            self.writer.write_record(BASE_COLUMNS)?;
        }
        self.writer.flush()?;
        Ok(self.rows)
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MetricsFile {
    pub path: PathBuf,
    pub meta_lines: [String; 4],
    pub columns: Vec<String>,
    pub rows: Vec<csv::StringRecord>,
}

impl MetricsFile {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn time_indices(&self) -> Result<Vec<usize>> {
        self.rows
            .iter()
            .map(|r| {
                r.get(0)
                    .and_then(|v| v.parse().ok())
                    .ok_or_else(|| format_error!(&self.path, "bad time index in row {:?}", r))
            })
            .collect()
    }
}

pub fn read_metrics_file(path: &Path) -> Result<MetricsFile> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut meta_lines: [String; 4] = Default::default();
    for line in meta_lines.iter_mut() {
        if reader.read_line(line)? == 0 {
            return Err(format_error!(path, "metadata is truncated"));
        }
        let len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(len);
    }
    if !meta_lines[0].starts_with(PROVENANCE_TAG) {
        return Err(format_error!(
            path,
            "first line does not start with '{}'",
            PROVENANCE_TAG
        ));
    }

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let columns = csv_reader.headers()?.iter().map(str::to_owned).collect();
    let rows = csv_reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(MetricsFile { path: path.to_path_buf(), meta_lines, columns, rows })
}
