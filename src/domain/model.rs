use crate::utils::error::{PipelineError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Columns every OHLCV frame must carry after cleaning.
pub const OHLCV_COLUMNS: [&str; 5] = ["Open", "High", "Low", "Close", "Volume"];

/// Inclusive date bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// A date-indexed, column-oriented table of `f64` series. Missing values are NaN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesFrame {
    index: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl SeriesFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(index: Vec<NaiveDate>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// `(rows, columns)`, excluding the date index.
    pub fn shape(&self) -> (usize, usize) {
        (self.len(), self.columns.len())
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Replaces the column in place when the name exists, appends otherwise.
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.index.len() {
            return Err(PipelineError::processing(format!(
                "column '{}' has {} values but the frame has {} rows",
                name,
                values.len(),
                self.index.len()
            )));
        }

        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(Column { name, values }),
        }
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> bool {
        let before = self.columns.len();
        self.columns.retain(|c| c.name != name);
        self.columns.len() != before
    }

    /// Names from `required` that are absent from the frame.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.has_column(name))
            .map(|name| name.to_string())
            .collect()
    }

    pub fn require_columns(&self, required: &[&str]) -> Result<()> {
        let missing = self.missing_columns(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::missing_columns(missing, self.column_names()))
        }
    }

    /// Keeps only the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<SeriesFrame> {
        self.require_columns(names)?;
        let columns = names
            .iter()
            .filter_map(|name| self.columns.iter().find(|c| c.name == *name).cloned())
            .collect();
        Ok(SeriesFrame {
            index: self.index.clone(),
            columns,
        })
    }

    /// Stable chronological sort of rows.
    pub fn sort_by_date(&mut self) {
        let mut order: Vec<usize> = (0..self.index.len()).collect();
        order.sort_by_key(|&i| self.index[i]);
        if order.iter().enumerate().all(|(pos, &i)| pos == i) {
            return;
        }

        self.index = order.iter().map(|&i| self.index[i]).collect();
        for column in &mut self.columns {
            column.values = order.iter().map(|&i| column.values[i]).collect();
        }
    }

    pub fn filter_dates(&mut self, range: &DateRange) {
        if range.is_unbounded() {
            return;
        }
        let mask: Vec<bool> = self.index.iter().map(|d| range.contains(*d)).collect();
        self.retain_rows(&mask);
    }

    pub fn retain_rows(&mut self, mask: &[bool]) {
        debug_assert_eq!(mask.len(), self.index.len());
        let keep = |i: &usize| mask.get(*i).copied().unwrap_or(false);

        self.index = (0..self.index.len())
            .filter(keep)
            .map(|i| self.index[i])
            .collect();
        for column in &mut self.columns {
            column.values = (0..column.values.len())
                .filter(keep)
                .map(|i| column.values[i])
                .collect();
        }
    }

    /// Per-row flag: true when any column holds NaN in that row.
    pub fn rows_with_nan(&self) -> Vec<bool> {
        (0..self.len())
            .map(|i| self.columns.iter().any(|c| c.values[i].is_nan()))
            .collect()
    }

    pub fn drop_nan_rows(&mut self) -> usize {
        let mask: Vec<bool> = self.rows_with_nan().into_iter().map(|nan| !nan).collect();
        let before = self.len();
        self.retain_rows(&mask);
        before - self.len()
    }

    pub fn nan_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.values.iter().any(|v| v.is_nan()))
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn nan_count(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.values.iter().filter(|v| v.is_nan()).count())
            .sum()
    }

    pub fn columns_mut(&mut self) -> impl Iterator<Item = &mut Column> {
        self.columns.iter_mut()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.index.iter().min().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.index.iter().max().copied()
    }
}

/// Output of the transform phase.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub cleaned: SeriesFrame,
    pub features: SeriesFrame,
    pub rows_dropped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub ticker: String,
    pub cleaned_rows: usize,
    pub feature_rows: usize,
    pub feature_columns: Vec<String>,
    pub rows_dropped: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}
