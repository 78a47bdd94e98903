//! CSV encoding of [`SeriesFrame`]s.
//!
//! Files carry a `Date` column followed by numeric columns. Empty cells and the
//! usual spellings of "not a number" load as NaN, and NaN is written back as an
//! empty cell.

use crate::domain::model::SeriesFrame;
use crate::utils::error::{PipelineError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

pub const DATE_COLUMN: &str = "Date";

/// Dates as written to cleaned and feature files.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Dates as written to raw downloads: midnight UTC timestamps.
pub const RAW_DATE_FORMAT: &str = "%Y-%m-%d 00:00:00+00:00";

const MISSING_MARKERS: [&str; 6] = ["", "nan", "NaN", "NAN", "null", "None"];

/// Accepts plain dates, naive timestamps, offset timestamps and RFC 3339, keeping the
/// calendar date in the value's own offset.
pub fn parse_date_cell(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(ts.date_naive());
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.date_naive());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(ts.date());
    }
    None
}

fn parse_value_cell(value: &str) -> Option<f64> {
    let value = value.trim();
    if MISSING_MARKERS.contains(&value) {
        return Some(f64::NAN);
    }
    value.parse::<f64>().ok()
}

pub fn read_frame(data: &[u8]) -> Result<SeriesFrame> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let date_idx = headers
        .iter()
        .position(|h| h == DATE_COLUMN)
        .ok_or_else(|| PipelineError::missing_columns(vec![DATE_COLUMN.to_string()], headers.clone()))?;

    let value_columns: Vec<(usize, &String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != date_idx)
        .collect();

    let mut index = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); value_columns.len()];

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        // Header is line 1.
        let line = row + 2;

        let raw_date = record.get(date_idx).unwrap_or_default();
        let date = parse_date_cell(raw_date).ok_or_else(|| {
            PipelineError::processing(format!("line {}: unparseable date '{}'", line, raw_date))
        })?;
        index.push(date);

        for (slot, (col_idx, name)) in value_columns.iter().enumerate() {
            let cell = record.get(*col_idx).unwrap_or_default();
            let value = parse_value_cell(cell).ok_or_else(|| {
                PipelineError::processing(format!(
                    "line {}: column '{}' holds non-numeric value '{}'",
                    line, name, cell
                ))
            })?;
            values[slot].push(value);
        }
    }

    let mut frame = SeriesFrame::with_index(index);
    for ((_, name), column) in value_columns.into_iter().zip(values) {
        frame.insert_column(name.clone(), column)?;
    }
    Ok(frame)
}

pub fn write_frame(frame: &SeriesFrame) -> Result<Vec<u8>> {
    write_frame_with_date_format(frame, DATE_FORMAT)
}

pub fn write_frame_with_date_format(frame: &SeriesFrame, date_format: &str) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![DATE_COLUMN.to_string()];
    header.extend(frame.column_names());
    writer.write_record(&header)?;

    for (row, date) in frame.index().iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(date.format(date_format).to_string());
        for column in frame.columns() {
            let value = column.values[row];
            record.push(if value.is_nan() {
                String::new()
            } else {
                value.to_string()
            });
        }
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| PipelineError::IoError(e.into_error()))
}
