use crate::core::csv_io;
use crate::domain::model::{DateRange, SeriesFrame, OHLCV_COLUMNS};
use crate::domain::ports::Storage;
use crate::utils::error::{PipelineError, Result};
use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;

type DrawResult<DB> = std::result::Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub title: String,
    pub volume: bool,
    pub range: DateRange,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Bitcoin Daily Price".to_string(),
            volume: true,
            range: DateRange::default(),
            width: 1200,
            height: 800,
        }
    }
}

/// Sorts, range-filters and narrows a frame to the OHLCV columns a candlestick needs.
pub fn prepare_chart_data(frame: &SeriesFrame, options: &ChartOptions) -> Result<SeriesFrame> {
    if frame.is_empty() {
        return Err(PipelineError::empty_data("visualization", "frame has no rows to plot"));
    }

    let mut data = frame.clone();
    data.sort_by_date();
    data.filter_dates(&options.range);
    if let Some(start) = options.range.start {
        tracing::debug!("Filtered plot data from {}", start);
    }
    if let Some(end) = options.range.end {
        tracing::debug!("Filtered plot data up to {}", end);
    }

    if data.is_empty() {
        return Err(PipelineError::empty_data(
            "visualization",
            "no data for the requested plot date range",
        ));
    }

    data.select(&OHLCV_COLUMNS)
}

/// Renders a candlestick chart, with a volume panel below when enabled, as SVG.
pub fn render_candlestick(frame: &SeriesFrame, options: &ChartOptions) -> Result<String> {
    tracing::info!("📈 Generating candlestick plot '{}'", options.title);
    let data = prepare_chart_data(frame, options)?;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        draw_chart(&root, &data, options).map_err(chart_error)?;
        root.present().map_err(chart_error)?;
    }

    tracing::info!("✅ Plot generated ({} candles)", data.len());
    Ok(svg)
}

fn chart_error<E: std::error::Error + Send + Sync>(e: DrawingAreaErrorKind<E>) -> PipelineError {
    PipelineError::ChartError {
        message: e.to_string(),
    }
}

fn draw_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    data: &SeriesFrame,
    options: &ChartOptions,
) -> DrawResult<DB> {
    root.fill(&WHITE)?;

    if options.volume {
        let (price_area, volume_area) = root.split_vertically((options.height * 3 / 4) as i32);
        draw_price_panel(&price_area, data, options, false)?;
        draw_volume_panel(&volume_area, data)?;
    } else {
        draw_price_panel(root, data, options, true)?;
    }
    Ok(())
}

fn column<'a>(data: &'a SeriesFrame, name: &str) -> &'a [f64] {
    data.column(name).unwrap_or(&[])
}

fn x_range(rows: usize) -> Range<f64> {
    -0.5..(rows as f64 - 0.5)
}

fn date_label(dates: &[NaiveDate], x: f64) -> String {
    let i = x.round();
    if i < 0.0 {
        return String::new();
    }
    dates
        .get(i as usize)
        .map(|d| d.format(csv_io::DATE_FORMAT).to_string())
        .unwrap_or_default()
}

fn finite_bounds<'a>(series: impl IntoIterator<Item = &'a [f64]>) -> (f64, f64) {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for values in series {
        for v in values.iter().filter(|v| v.is_finite()) {
            lo = lo.min(*v);
            hi = hi.max(*v);
        }
    }
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(hi.abs() * 0.01).max(1e-6);
    (lo - pad, hi + pad)
}

fn draw_price_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    data: &SeriesFrame,
    options: &ChartOptions,
    with_dates: bool,
) -> DrawResult<DB> {
    let dates = data.index();
    let rows = dates.len();
    let (open, high, low, close) = (
        column(data, "Open"),
        column(data, "High"),
        column(data, "Low"),
        column(data, "Close"),
    );
    let (y_min, y_max) = finite_bounds([high, low]);

    let mut chart = ChartBuilder::on(area)
        .caption(&options.title, ("sans-serif", 26).into_font())
        .margin(10)
        .x_label_area_size(if with_dates { 40 } else { 10 })
        .y_label_area_size(80)
        .build_cartesian_2d(x_range(rows), y_min..y_max)?;

    let label = |x: &f64| date_label(dates, *x);
    chart
        .configure_mesh()
        .x_labels(if with_dates { 8 } else { 0 })
        .x_label_formatter(&label)
        .y_desc("Price (USD)")
        .draw()?;

    let plot_width = options.width.saturating_sub(100) as f64;
    let candle_width = (plot_width / rows.max(1) as f64 * 0.6).clamp(1.0, 15.0) as u32;

    chart.draw_series((0..rows).map(|i| {
        CandleStick::new(
            i as f64,
            open[i],
            high[i],
            low[i],
            close[i],
            GREEN.filled(),
            RED.filled(),
            candle_width,
        )
    }))?;
    Ok(())
}

fn draw_volume_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    data: &SeriesFrame,
) -> DrawResult<DB> {
    let dates = data.index();
    let rows = dates.len();
    let (open, close, volume) = (
        column(data, "Open"),
        column(data, "Close"),
        column(data, "Volume"),
    );
    let (_, v_max) = finite_bounds([volume]);

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(x_range(rows), 0f64..v_max.max(1.0))?;

    let label = |x: &f64| date_label(dates, *x);
    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&label)
        .y_desc("Volume")
        .draw()?;

    chart.draw_series((0..rows).filter(|i| volume[*i].is_finite()).map(|i| {
        let color = if close[i] >= open[i] { GREEN } else { RED };
        Rectangle::new(
            [(i as f64 - 0.35, 0.0), (i as f64 + 0.35, volume[i])],
            color.mix(0.6).filled(),
        )
    }))?;
    Ok(())
}

/// Reads a cleaned CSV and writes its candlestick chart to `output`.
pub async fn plot_file<S: Storage>(
    storage: &S,
    input: &str,
    output: &str,
    options: &ChartOptions,
) -> Result<()> {
    let data = storage.read_file(input).await?;
    let frame = csv_io::read_frame(&data)?;
    let svg = render_candlestick(&frame, options)?;
    storage.write_file(output, svg.as_bytes()).await?;
    tracing::info!("🖼️ Chart saved to: {}", output);
    Ok(())
}
