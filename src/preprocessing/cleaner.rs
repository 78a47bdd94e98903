use crate::core::csv_io;
use crate::domain::model::{DateRange, SeriesFrame, OHLCV_COLUMNS};
use crate::domain::ports::Storage;
use crate::utils::error::Result;

/// Columns that carry corporate-action data and no price information.
pub const DROPPED_COLUMNS: [&str; 2] = ["Dividends", "Stock Splits"];

#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub frame: SeriesFrame,
    pub original_shape: (usize, usize),
    pub dropped_columns: Vec<String>,
    /// NaN left after filling; only non-zero when a whole column was empty.
    pub remaining_nan: usize,
}

/// Sorts, filters, fills and validates a raw OHLCV frame.
///
/// An empty result after date filtering is returned as-is rather than as an error.
pub fn clean(mut frame: SeriesFrame, range: &DateRange) -> Result<CleanOutcome> {
    let original_shape = frame.shape();

    frame.sort_by_date();

    if let Some(start) = range.start {
        tracing::info!("Filtering data from {}", start);
    }
    if let Some(end) = range.end {
        tracing::info!("Filtering data up to {}", end);
    }
    frame.filter_dates(range);

    if frame.is_empty() {
        tracing::warn!(
            "⚠️ Frame is empty after date filtering (original shape: {:?}, filtered shape: {:?})",
            original_shape,
            frame.shape()
        );
        return Ok(CleanOutcome {
            frame,
            original_shape,
            dropped_columns: Vec::new(),
            remaining_nan: 0,
        });
    }

    tracing::debug!("Handling missing values with forward fill then backward fill");
    for column in frame.columns_mut() {
        forward_fill(&mut column.values);
        backward_fill(&mut column.values);
    }

    let remaining_nan = frame.nan_count();
    if remaining_nan > 0 {
        tracing::warn!(
            "⚠️ {} NaNs remain after filling in columns {:?}; check the source data",
            remaining_nan,
            frame.nan_columns()
        );
    }

    let dropped_columns: Vec<String> = DROPPED_COLUMNS
        .iter()
        .filter(|name| frame.drop_column(name))
        .map(|name| name.to_string())
        .collect();
    if dropped_columns.is_empty() {
        tracing::debug!("No 'Dividends' or 'Stock Splits' columns found to drop");
    } else {
        tracing::info!("Dropped columns: {:?}", dropped_columns);
    }

    frame.require_columns(&OHLCV_COLUMNS)?;

    Ok(CleanOutcome {
        frame,
        original_shape,
        dropped_columns,
        remaining_nan,
    })
}

pub fn forward_fill(values: &mut [f64]) {
    let mut last = f64::NAN;
    for value in values.iter_mut() {
        if value.is_nan() {
            *value = last;
        } else {
            last = *value;
        }
    }
}

pub fn backward_fill(values: &mut [f64]) {
    let mut next = f64::NAN;
    for value in values.iter_mut().rev() {
        if value.is_nan() {
            *value = next;
        } else {
            next = *value;
        }
    }
}

/// Loads a raw CSV, cleans it and saves the result.
///
/// Returns `None` (and writes nothing) when no rows fall inside `range`.
pub async fn clean_file<S: Storage>(
    storage: &S,
    input: &str,
    output: &str,
    range: &DateRange,
) -> Result<Option<SeriesFrame>> {
    tracing::info!("🧹 Starting data cleaning");
    tracing::info!("Input path: {}", input);
    tracing::info!("Output path: {}", output);

    let data = storage.read_file(input).await?;
    let raw = csv_io::read_frame(&data)?;

    let outcome = clean(raw, range)?;
    if outcome.frame.is_empty() {
        return Ok(None);
    }

    storage
        .write_file(output, &csv_io::write_frame(&outcome.frame)?)
        .await?;
    tracing::info!("💾 Data cleaning completed. Saved to '{}'", output);
    tracing::info!(
        "Cleaned shape: {:?} (original shape was {:?})",
        outcome.frame.shape(),
        outcome.original_shape
    );
    Ok(Some(outcome.frame))
}
