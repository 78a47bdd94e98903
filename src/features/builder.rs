use crate::core::csv_io;
use crate::domain::model::SeriesFrame;
use crate::domain::ports::Storage;
use crate::features::indicators::{self, BollingerBands, MacdOutput};
use crate::features::IndicatorStyle;
use crate::utils::error::{PipelineError, Result};

const BOLLINGER_WINDOW: usize = 20;
const BOLLINGER_WIDTH: f64 = 2.0;
const RSI_PERIOD: usize = 14;

#[derive(Debug, Clone)]
pub struct FeatureReport {
    pub frame: SeriesFrame,
    pub rows_before: usize,
    pub rows_dropped: usize,
    /// Columns that held NaN before incomplete rows were dropped.
    pub nan_columns: Vec<String>,
}

/// Adds returns, indicators, lags and ratios to a cleaned OHLCV frame, then drops
/// every row that is still incomplete. The input frame is left untouched.
pub fn build_features(frame: &SeriesFrame, style: IndicatorStyle) -> Result<FeatureReport> {
    if frame.is_empty() {
        return Err(PipelineError::empty_data(
            "feature engineering",
            "input frame has no rows",
        ));
    }
    frame.require_columns(&["Close", "Volume"])?;

    let mut features = frame.clone();
    let close = column_vec(frame, "Close")?;
    let volume = column_vec(frame, "Volume")?;

    tracing::info!("🧮 Starting feature engineering ({} rows, {} indicators)", frame.len(), style);

    let daily_return = indicators::pct_change(&close);
    features.insert_column("daily_return", daily_return.clone())?;

    let sma_10 = indicators::rolling_mean(&close, 10);
    let (ema_5, ema_10) = match style {
        IndicatorStyle::Recursive => (
            indicators::ewm(&close, indicators::span_alpha(5)),
            indicators::ewm(&close, indicators::span_alpha(10)),
        ),
        IndicatorStyle::Seeded => (
            indicators::ema_seeded(&close, 5),
            indicators::ema_seeded(&close, 10),
        ),
    };
    features.insert_column("SMA_5", indicators::rolling_mean(&close, 5))?;
    features.insert_column("EMA_5", ema_5)?;
    features.insert_column("SMA_10", sma_10.clone())?;
    features.insert_column("EMA_10", ema_10)?;

    let (rsi, macd, bands, obv) = match style {
        IndicatorStyle::Recursive => (
            indicators::rsi_recursive(&close, RSI_PERIOD),
            indicators::macd_recursive(&close, 12, 26, 9),
            indicators::bollinger_bands(&close, BOLLINGER_WINDOW, BOLLINGER_WIDTH, 1),
            indicators::obv_recursive(&close, &volume),
        ),
        IndicatorStyle::Seeded => (
            indicators::rsi_wilder(&close, RSI_PERIOD),
            indicators::macd_seeded(&close, 12, 26, 9),
            indicators::bollinger_bands(&close, BOLLINGER_WINDOW, BOLLINGER_WIDTH, 0),
            indicators::obv_seeded(&close, &volume),
        ),
    };
    let MacdOutput { macd, signal } = macd;
    let BollingerBands { upper, lower, .. } = bands;

    features.insert_column("RSI", rsi)?;
    features.insert_column("MACD", macd)?;
    features.insert_column("MACD_Signal", signal)?;
    features.insert_column("Bollinger_Upper", upper)?;
    features.insert_column("Bollinger_Lower", lower)?;
    features.insert_column("OBV", obv)?;
    tracing::debug!("  - Calculated technical indicators");

    features.insert_column("Close_Lag_1", indicators::shift(&close, 1))?;
    features.insert_column("Close_Lag_2", indicators::shift(&close, 2))?;
    features.insert_column("Close_Lag_3", indicators::shift(&close, 3))?;
    features.insert_column("Return_Lag_1", indicators::shift(&daily_return, 1))?;
    features.insert_column("Volume_Lag_1", indicators::shift(&volume, 1))?;
    tracing::debug!("  - Created lagged features");

    let price_vs_sma: Vec<f64> = close.iter().zip(&sma_10).map(|(c, s)| c / s).collect();
    features.insert_column("Price_vs_SMA10", price_vs_sma)?;

    let avg_volume = indicators::rolling_mean(&volume, 10);
    let volume_vs_avg: Vec<f64> = volume.iter().zip(&avg_volume).map(|(v, a)| v / a).collect();
    features.insert_column("Volume_vs_Avg_Vol10", volume_vs_avg)?;
    tracing::debug!("  - Created interaction features");

    let rows_before = features.len();
    let nan_columns = features.nan_columns();
    let rows_dropped = features.drop_nan_rows();

    tracing::info!("  - Removed {} rows with NaNs", rows_dropped);
    if !nan_columns.is_empty() {
        tracing::debug!("  - Columns with NaNs before dropping: {:?}", nan_columns);
    }
    tracing::info!("  - Shape after dropping NaNs: {:?}", features.shape());

    Ok(FeatureReport {
        frame: features,
        rows_before,
        rows_dropped,
        nan_columns,
    })
}

fn column_vec(frame: &SeriesFrame, name: &str) -> Result<Vec<f64>> {
    frame
        .column(name)
        .map(|values| values.to_vec())
        .ok_or_else(|| PipelineError::missing_columns(vec![name.to_string()], frame.column_names()))
}

/// Reads a cleaned CSV, builds features and writes them to `output`.
pub async fn build_features_file<S: Storage>(
    storage: &S,
    input: &str,
    output: &str,
    style: IndicatorStyle,
) -> Result<FeatureReport> {
    tracing::info!("📥 Loading cleaned data from: {}", input);
    let data = storage.read_file(input).await?;
    let frame = csv_io::read_frame(&data)?;

    let report = build_features(&frame, style)?;

    storage
        .write_file(output, &csv_io::write_frame(&report.frame)?)
        .await?;
    tracing::info!("💾 Features saved to: {}", output);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn synthetic_frame(rows: usize) -> SeriesFrame {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let index = (0..rows).map(|i| start + Duration::days(i as i64)).collect();
        let mut frame = SeriesFrame::with_index(index);
        let close: Vec<f64> = (0..rows)
            .map(|i| 20_000.0 + 500.0 * ((i as f64) * 0.3).sin() + i as f64 * 10.0)
            .collect();
        let open: Vec<f64> = close.iter().map(|c| c - 50.0).collect();
        let high: Vec<f64> = close.iter().map(|c| c + 100.0).collect();
        let low: Vec<f64> = close.iter().map(|c| c - 150.0).collect();
        let volume: Vec<f64> = (0..rows).map(|i| 1_000.0 + (i % 7) as f64 * 100.0).collect();

        frame.insert_column("Open", open).unwrap();
        frame.insert_column("High", high).unwrap();
        frame.insert_column("Low", low).unwrap();
        frame.insert_column("Close", close).unwrap();
        frame.insert_column("Volume", volume).unwrap();
        frame
    }

    const FEATURE_COLUMNS: [&str; 18] = [
        "daily_return",
        "SMA_5",
        "EMA_5",
        "SMA_10",
        "EMA_10",
        "RSI",
        "MACD",
        "MACD_Signal",
        "Bollinger_Upper",
        "Bollinger_Lower",
        "OBV",
        "Close_Lag_1",
        "Close_Lag_2",
        "Close_Lag_3",
        "Return_Lag_1",
        "Volume_Lag_1",
        "Price_vs_SMA10",
        "Volume_vs_Avg_Vol10",
    ];

    #[test]
    fn test_recursive_features_drop_warm_up_rows() {
        let frame = synthetic_frame(60);
        let report = build_features(&frame, IndicatorStyle::Recursive).unwrap();

        // The 20-day bands are the longest window: rows 0..=18 are incomplete.
        assert_eq!(report.rows_before, 60);
        assert_eq!(report.rows_dropped, 19);
        assert_eq!(report.frame.len(), 41);
        assert_eq!(report.frame.nan_count(), 0);
        assert!(report.nan_columns.contains(&"Bollinger_Upper".to_string()));

        let names = report.frame.column_names();
        assert_eq!(&names[..5], &["Open", "High", "Low", "Close", "Volume"]);
        assert_eq!(&names[5..], &FEATURE_COLUMNS);
        assert!(!report.frame.has_column("SMA_BB"));
        assert!(!report.frame.has_column("Avg_Volume_10"));

        // Input is untouched.
        assert_eq!(frame.column_names().len(), 5);
    }

    #[test]
    fn test_seeded_features_wait_for_macd_signal() {
        let frame = synthetic_frame(60);
        let report = build_features(&frame, IndicatorStyle::Seeded).unwrap();
        assert_eq!(report.rows_dropped, 33);
        assert_eq!(report.frame.len(), 27);
    }

    #[test]
    fn test_seeded_macd_matches_reference_values() {
        let report = build_features(&synthetic_frame(80), IndicatorStyle::Seeded).unwrap();
        let out = &report.frame;
        assert_eq!(out.first_date(), NaiveDate::from_ymd_opt(2023, 2, 3));

        let macd = out.column("MACD").unwrap();
        let signal = out.column("MACD_Signal").unwrap();
        // Reference values for rows 33, 40 and 79 of the input.
        let expected = [
            (0, 21.179500603728, 22.743927451964),
            (7, -79.616455355168, -53.356069914306),
            (46, -40.682641879601, 49.683373509225),
        ];
        for (row, want_macd, want_signal) in expected {
            assert!((macd[row] - want_macd).abs() < 1e-6, "MACD row {}: {}", row, macd[row]);
            assert!(
                (signal[row] - want_signal).abs() < 1e-6,
                "signal row {}: {}",
                row,
                signal[row]
            );
        }
    }

    #[test]
    fn test_lag_and_ratio_values() {
        let frame = synthetic_frame(40);
        let report = build_features(&frame, IndicatorStyle::Recursive).unwrap();
        let out = &report.frame;

        let close = out.column("Close").unwrap();
        let sma = out.column("SMA_10").unwrap();
        let ratio = out.column("Price_vs_SMA10").unwrap();
        assert!((ratio[0] - close[0] / sma[0]).abs() < 1e-12);

        let original_close = frame.column("Close").unwrap();
        let first_kept = 19;
        assert_eq!(out.column("Close_Lag_1").unwrap()[0], original_close[first_kept - 1]);
        assert_eq!(out.column("Close_Lag_3").unwrap()[0], original_close[first_kept - 3]);
    }

    #[test]
    fn test_too_short_history_yields_empty_features() {
        let frame = synthetic_frame(10);
        let report = build_features(&frame, IndicatorStyle::Recursive).unwrap();
        assert!(report.frame.is_empty());
        assert_eq!(report.rows_dropped, 10);
    }

    #[test]
    fn test_empty_and_incomplete_input() {
        assert!(matches!(
            build_features(&SeriesFrame::new(), IndicatorStyle::Recursive),
            Err(PipelineError::EmptyDataError { .. })
        ));

        let mut frame = synthetic_frame(5);
        frame.drop_column("Volume");
        assert!(matches!(
            build_features(&frame, IndicatorStyle::Recursive),
            Err(PipelineError::MissingColumnsError { .. })
        ));
    }
}
