use crate::domain::model::DateRange;
use crate::domain::ports::{ChartSettings, ConfigProvider, DataPaths};
use crate::features::IndicatorStyle;
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: SourceConfig,
    pub paths: PathsConfig,
    pub preprocessing: PreprocessingConfig,
    pub features: FeaturesConfig,
    pub chart: ChartConfig,
    pub bundle: BundleConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub ticker: String,
    pub endpoint: String,
    pub period: String,
    pub refresh: bool,
    pub timeout_seconds: u64,
    pub api_key: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            ticker: "BTC-USD".to_string(),
            endpoint: "https://query1.finance.yahoo.com".to_string(),
            period: "5y".to_string(),
            refresh: true,
            timeout_seconds: 30,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub raw: String,
    pub processed: String,
    pub features: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw: "data/raw/btc_daily_ohlcv.csv".to_string(),
            processed: "data/processed/btc_daily_cleaned.csv".to_string(),
            features: "data/processed/btc_daily_features.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub indicators: IndicatorStyle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub enabled: bool,
    pub output: String,
    pub title: String,
    pub volume: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output: "reports/figures/btc_candlestick.svg".to_string(),
            title: "Bitcoin Daily Price".to_string(),
            volume: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    pub enabled: bool,
    pub filename: String,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            filename: "reports/btc_pipeline_output.zip".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"))
}

impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PipelineError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Loads `path` when it exists, otherwise falls back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(
                "No settings file at {}, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        let mut settings: Settings = toml::from_str(&processed)?;

        // An unresolved placeholder means the credential was never provided.
        if let Some(key) = &settings.source.api_key {
            if key.trim().is_empty() || placeholder_regex().is_match(key) {
                tracing::warn!("⚠️ source.api_key is not set; continuing without credentials");
                settings.source.api_key = None;
            }
        }
        Ok(settings)
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay literal.
    fn substitute_env_vars(content: &str) -> String {
        placeholder_regex()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn parsed_date_range(&self) -> Result<DateRange> {
        let start = validation::parse_optional_date(
            "preprocessing.start_date",
            self.preprocessing.start_date.as_deref(),
        )?;
        let end = validation::parse_optional_date(
            "preprocessing.end_date",
            self.preprocessing.end_date.as_deref(),
        )?;
        Ok(DateRange::new(start, end))
    }

    /// Snapshot used by the pipeline, with dates and paths resolved.
    pub fn resolve(&self) -> Result<ResolvedSettings> {
        self.validate()?;
        Ok(ResolvedSettings {
            settings: self.clone(),
            paths: DataPaths {
                raw: self.paths.raw.clone(),
                processed: self.paths.processed.clone(),
                features: self.paths.features.clone(),
            },
            range: self.parsed_date_range()?,
            chart: self.chart.enabled.then(|| ChartSettings {
                output: self.chart.output.clone(),
                title: self.chart.title.clone(),
                volume: self.chart.volume,
            }),
        })
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("source.ticker", &self.source.ticker)?;
        validation::validate_non_empty_string("source.period", &self.source.period)?;
        validation::validate_url("source.endpoint", &self.source.endpoint)?;
        validation::validate_positive_number("source.timeout_seconds", self.source.timeout_seconds, 1)?;

        validation::validate_path("paths.raw", &self.paths.raw)?;
        validation::validate_path("paths.processed", &self.paths.processed)?;
        validation::validate_path("paths.features", &self.paths.features)?;
        if self.chart.enabled {
            validation::validate_path("chart.output", &self.chart.output)?;
        }
        if self.bundle.enabled {
            validation::validate_path("bundle.filename", &self.bundle.filename)?;
        }

        let range = self.parsed_date_range()?;
        validation::validate_date_order(range.start, range.end)
    }
}

/// Validated settings with derived values precomputed for [`ConfigProvider`].
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    settings: Settings,
    paths: DataPaths,
    range: DateRange,
    chart: Option<ChartSettings>,
}

impl ResolvedSettings {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl ConfigProvider for ResolvedSettings {
    fn api_endpoint(&self) -> &str {
        &self.settings.source.endpoint
    }

    fn ticker(&self) -> &str {
        &self.settings.source.ticker
    }

    fn period(&self) -> &str {
        &self.settings.source.period
    }

    fn api_key(&self) -> Option<&str> {
        self.settings.source.api_key.as_deref()
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.source.timeout_seconds)
    }

    fn refresh_raw(&self) -> bool {
        self.settings.source.refresh
    }

    fn paths(&self) -> &DataPaths {
        &self.paths
    }

    fn date_range(&self) -> DateRange {
        self.range
    }

    fn indicator_style(&self) -> IndicatorStyle {
        self.settings.features.indicators
    }

    fn chart(&self) -> Option<&ChartSettings> {
        self.chart.as_ref()
    }

    fn bundle_name(&self) -> Option<&str> {
        self.settings
            .bundle
            .enabled
            .then_some(self.settings.bundle.filename.as_str())
    }
}
