use crate::core::csv_io;
use crate::domain::model::SeriesFrame;
use crate::domain::ports::Storage;
use crate::utils::error::{PipelineError, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) btc-pipeline/0.1";

/// Raw download columns, in file order.
pub const RAW_COLUMNS: [&str; 7] = [
    "Open",
    "High",
    "Low",
    "Close",
    "Volume",
    "Dividends",
    "Stock Splits",
];

/// How much history to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPeriod {
    FiveYears,
    OneYear,
    /// Passed through to the API as its `range` parameter (e.g. `max`, `6mo`).
    Range(String),
}

impl FromStr for FetchPeriod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" => Err(PipelineError::InvalidConfigValueError {
                field: "source.period".to_string(),
                value: s.to_string(),
                reason: "period cannot be empty".to_string(),
            }),
            "5y" => Ok(FetchPeriod::FiveYears),
            "1y" => Ok(FetchPeriod::OneYear),
            other => Ok(FetchPeriod::Range(other.to_string())),
        }
    }
}

impl fmt::Display for FetchPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchPeriod::FiveYears => write!(f, "5y"),
            FetchPeriod::OneYear => write!(f, "1y"),
            FetchPeriod::Range(range) => write!(f, "{}", range),
        }
    }
}

impl FetchPeriod {
    /// Explicit `(start, end)` window for fixed periods, `None` for pass-through ranges.
    pub fn window(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match self {
            FetchPeriod::FiveYears => Some((now - Duration::days(5 * 365), now)),
            FetchPeriod::OneYear => Some((now - Duration::days(365), now)),
            FetchPeriod::Range(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartApiError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
    #[serde(default)]
    events: Option<ChartEvents>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartEvents {
    #[serde(default)]
    dividends: BTreeMap<String, DividendEvent>,
    #[serde(default)]
    splits: BTreeMap<String, SplitEvent>,
}

#[derive(Debug, Deserialize)]
struct DividendEvent {
    amount: f64,
    date: i64,
}

#[derive(Debug, Deserialize)]
struct SplitEvent {
    numerator: f64,
    denominator: f64,
    date: i64,
}

/// Client for a Yahoo-style `v8/finance/chart` endpoint returning daily bars.
pub struct ChartClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ChartClient {
    pub fn new(base_url: &str, timeout: std::time::Duration, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub async fn daily_history(&self, ticker: &str, period: &FetchPeriod) -> Result<SeriesFrame> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);

        let mut query: Vec<(&str, String)> = vec![
            ("interval", "1d".to_string()),
            ("events", "div,splits".to_string()),
        ];
        match period.window(Utc::now()) {
            Some((start, end)) => {
                query.push(("period1", start.timestamp().to_string()));
                query.push(("period2", end.timestamp().to_string()));
            }
            None => query.push(("range", period.to_string())),
        }

        let mut request = self.client.get(&url).query(&query);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        tracing::debug!("Making API request to: {} ({})", url, period);
        let response = request.send().await?;
        tracing::debug!("API response status: {}", response.status());

        let envelope: ChartEnvelope = response.error_for_status()?.json().await?;
        decode_chart(envelope)
    }
}

fn decode_chart(envelope: ChartEnvelope) -> Result<SeriesFrame> {
    if let Some(error) = envelope.chart.error {
        return Err(PipelineError::DataSourceError {
            message: format!(
                "{}: {}",
                error.code.unwrap_or_else(|| "error".to_string()),
                error.description.unwrap_or_default()
            ),
        });
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(SeriesFrame::new());
    };

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let rows = result.timestamp.len();
    for (name, series) in [
        ("open", &quote.open),
        ("high", &quote.high),
        ("low", &quote.low),
        ("close", &quote.close),
        ("volume", &quote.volume),
    ] {
        if series.len() != rows {
            return Err(PipelineError::DataSourceError {
                message: format!(
                    "'{}' has {} values but {} timestamps were returned",
                    name,
                    series.len(),
                    rows
                ),
            });
        }
    }

    let index = result
        .timestamp
        .iter()
        .map(|ts| utc_date(*ts))
        .collect::<Result<Vec<_>>>()?;

    let mut dividends = vec![0.0; rows];
    let mut splits = vec![0.0; rows];
    if let Some(events) = result.events {
        for event in events.dividends.values() {
            let date = utc_date(event.date)?;
            if let Some(pos) = index.iter().position(|d| *d == date) {
                dividends[pos] = event.amount;
            }
        }
        for event in events.splits.values() {
            let date = utc_date(event.date)?;
            if let Some(pos) = index.iter().position(|d| *d == date) {
                if event.denominator != 0.0 {
                    splits[pos] = event.numerator / event.denominator;
                }
            }
        }
    }

    let to_series = |values: Vec<Option<f64>>| -> Vec<f64> {
        values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
    };

    let mut frame = SeriesFrame::with_index(index);
    frame.insert_column("Open", to_series(quote.open))?;
    frame.insert_column("High", to_series(quote.high))?;
    frame.insert_column("Low", to_series(quote.low))?;
    frame.insert_column("Close", to_series(quote.close))?;
    frame.insert_column("Volume", to_series(quote.volume))?;
    frame.insert_column("Dividends", dividends)?;
    frame.insert_column("Stock Splits", splits)?;
    Ok(frame)
}

fn utc_date(timestamp: i64) -> Result<NaiveDate> {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| PipelineError::DataSourceError {
            message: format!("timestamp {} is out of range", timestamp),
        })
}

/// Downloads daily bars for `ticker` and writes them as the raw CSV at `output`.
pub async fn fetch_and_save<S: Storage>(
    client: &ChartClient,
    storage: &S,
    ticker: &str,
    period: &FetchPeriod,
    output: &str,
) -> Result<SeriesFrame> {
    tracing::info!("🌐 Fetching daily data for {} ({})", ticker, period);

    let frame = client.daily_history(ticker, period).await?;
    if frame.is_empty() {
        return Err(PipelineError::empty_data(
            "acquisition",
            format!("no bars returned for {}; check ticker symbol or date range", ticker),
        ));
    }

    let data = csv_io::write_frame_with_date_format(&frame, csv_io::RAW_DATE_FORMAT)?;
    storage.write_file(output, &data).await?;

    tracing::info!("✅ Successfully fetched {} rows of data", frame.len());
    tracing::info!("📁 Data saved to: {}", output);
    if let (Some(first), Some(last)) = (frame.first_date(), frame.last_date()) {
        tracing::info!("📅 Date range: {} to {}", first, last);
    }
    Ok(frame)
}
