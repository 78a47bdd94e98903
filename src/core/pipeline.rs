use crate::acquisition::{fetch_and_save, ChartClient, FetchPeriod};
use crate::core::csv_io;
use crate::core::{ConfigProvider, Pipeline, SeriesFrame, Storage, TransformResult};
use crate::domain::model::{DateRange, RunSummary};
use crate::features::build_features;
use crate::preprocessing::clean;
use crate::utils::error::{PipelineError, Result};
use crate::visualization::{render_candlestick, ChartOptions};
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Fetch, clean, feature-engineer and chart one ticker's daily bars.
pub struct BtcPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: ChartClient,
}

impl<S: Storage, C: ConfigProvider> BtcPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let client = ChartClient::new(
            config.api_endpoint(),
            config.request_timeout(),
            config.api_key().map(str::to_string),
        )?;
        Ok(Self {
            storage,
            config,
            client,
        })
    }

    fn summary(&self, result: &TransformResult) -> RunSummary {
        let cleaned_columns = result.cleaned.column_names();
        RunSummary {
            ticker: self.config.ticker().to_string(),
            cleaned_rows: result.cleaned.len(),
            feature_rows: result.features.len(),
            feature_columns: result
                .features
                .column_names()
                .into_iter()
                .filter(|name| !cleaned_columns.contains(name))
                .collect(),
            rows_dropped: result.rows_dropped,
            first_date: result.features.first_date(),
            last_date: result.features.last_date(),
        }
    }

    /// Chart SVG for the cleaned frame, or `None` when charts are disabled or
    /// could not be drawn.
    fn render_chart(&self, cleaned: &SeriesFrame) -> Option<(String, String)> {
        let chart = self.config.chart()?;
        let options = ChartOptions {
            title: chart.title.clone(),
            volume: chart.volume,
            range: DateRange::default(),
            ..ChartOptions::default()
        };
        match render_candlestick(cleaned, &options) {
            Ok(svg) => Some((chart.output.clone(), svg)),
            Err(e) => {
                tracing::warn!("⚠️ Skipping chart: {}", e);
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for BtcPipeline<S, C> {
    async fn extract(&self) -> Result<SeriesFrame> {
        let raw_path = &self.config.paths().raw;

        if self.config.refresh_raw() {
            let period: FetchPeriod = self.config.period().parse()?;
            return fetch_and_save(
                &self.client,
                &self.storage,
                self.config.ticker(),
                &period,
                raw_path,
            )
            .await;
        }

        tracing::info!("📂 Reusing raw data from: {}", raw_path);
        if !self.storage.exists(raw_path).await {
            return Err(PipelineError::DataSourceError {
                message: format!(
                    "raw file '{}' does not exist; fetch it first or enable source.refresh",
                    raw_path
                ),
            });
        }
        let data = self.storage.read_file(raw_path).await?;
        csv_io::read_frame(&data)
    }

    async fn transform(&self, raw: SeriesFrame) -> Result<TransformResult> {
        let outcome = clean(raw, &self.config.date_range())?;
        if outcome.frame.is_empty() {
            return Err(PipelineError::empty_data(
                "preprocessing",
                "no rows fall inside the configured date range",
            ));
        }
        tracing::info!(
            "Cleaned shape: {:?} (original shape was {:?})",
            outcome.frame.shape(),
            outcome.original_shape
        );

        let report = build_features(&outcome.frame, self.config.indicator_style())?;
        if report.frame.is_empty() {
            return Err(PipelineError::empty_data(
                "feature engineering",
                "every row had an incomplete indicator window; widen the date range",
            ));
        }

        Ok(TransformResult {
            cleaned: outcome.frame,
            features: report.frame,
            rows_dropped: report.rows_dropped,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let paths = self.config.paths();

        let processed_csv = csv_io::write_frame(&result.cleaned)?;
        self.storage.write_file(&paths.processed, &processed_csv).await?;
        tracing::info!("💾 Cleaned data saved to: {}", paths.processed);

        let features_csv = csv_io::write_frame(&result.features)?;
        self.storage.write_file(&paths.features, &features_csv).await?;
        tracing::info!("💾 Features saved to: {}", paths.features);

        let chart = self.render_chart(&result.cleaned);
        if let Some((output, svg)) = &chart {
            self.storage.write_file(output, svg.as_bytes()).await?;
            tracing::info!("🖼️ Chart saved to: {}", output);
        }

        let Some(bundle_name) = self.config.bundle_name() else {
            return Ok(paths.features.clone());
        };

        let summary = self.summary(&result);
        tracing::debug!(
            "Creating ZIP file with {} files",
            3 + usize::from(chart.is_some())
        );

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
            let options = SimpleFileOptions::default();

            zip.start_file("processed.csv", options)?;
            zip.write_all(&processed_csv)?;

            zip.start_file("features.csv", options)?;
            zip.write_all(&features_csv)?;

            zip.start_file("summary.json", options)?;
            zip.write_all(serde_json::to_string_pretty(&summary)?.as_bytes())?;

            if let Some((_, svg)) = &chart {
                zip.start_file("chart.svg", options)?;
                zip.write_all(svg.as_bytes())?;
            }

            zip.finish()?.into_inner()
        };

        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage.write_file(bundle_name, &zip_data).await?;
        tracing::info!("📦 Bundle saved to: {}", bundle_name);
        Ok(bundle_name.to_string())
    }
}
