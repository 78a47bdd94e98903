pub mod cli;
pub mod settings;

pub use cli::LocalStorage;
pub use settings::{ResolvedSettings, Settings};

#[cfg(feature = "cli")]
pub use command::{CleanArgs, CliConfig, Command, FeatureArgs, FetchArgs, PlotArgs, RunArgs};

#[cfg(feature = "cli")]
mod command {
    use super::settings::{Settings, DEFAULT_SETTINGS_PATH};
    use crate::features::IndicatorStyle;
    use crate::utils::error::Result;
    use crate::utils::validation::{self, Validate};
    use clap::{Args, Parser, Subcommand};
    use std::path::{Path, PathBuf};

    #[derive(Debug, Clone, Parser)]
    #[command(name = "btc-pipeline")]
    #[command(about = "Fetch, clean, engineer features for and chart daily Bitcoin prices")]
    pub struct CliConfig {
        /// Settings file (TOML), relative to --root unless absolute; defaults apply
        /// when it does not exist
        #[arg(short, long, global = true, default_value = DEFAULT_SETTINGS_PATH)]
        pub config: String,

        /// Project root that the settings file and every data and report path are
        /// relative to
        #[arg(long, global = true, default_value = ".")]
        pub root: String,

        #[arg(short, long, global = true, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, global = true, help = "Log CPU and memory usage per phase")]
        pub monitor: bool,

        #[arg(long, global = true, help = "Emit logs as JSON lines")]
        pub json_logs: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Download daily OHLCV bars into the raw CSV
        Fetch(FetchArgs),
        /// Clean a raw CSV into the processed CSV
        Clean(CleanArgs),
        /// Add technical-indicator features to a cleaned CSV
        Features(FeatureArgs),
        /// Render a candlestick chart from a cleaned CSV
        Plot(PlotArgs),
        /// Run every stage end to end
        Run(RunArgs),
    }

    #[derive(Debug, Clone, Default, Args)]
    pub struct FetchArgs {
        /// 5y, 1y, or any range the API accepts (e.g. max)
        #[arg(long)]
        pub period: Option<String>,
        #[arg(long)]
        pub ticker: Option<String>,
        #[arg(long)]
        pub output: Option<String>,
    }

    #[derive(Debug, Clone, Default, Args)]
    pub struct CleanArgs {
        #[arg(long)]
        pub input: Option<String>,
        #[arg(long)]
        pub output: Option<String>,
        /// First date kept (YYYY-MM-DD)
        #[arg(long)]
        pub start: Option<String>,
        /// Last date kept (YYYY-MM-DD)
        #[arg(long)]
        pub end: Option<String>,
    }

    #[derive(Debug, Clone, Default, Args)]
    pub struct FeatureArgs {
        #[arg(long)]
        pub input: Option<String>,
        #[arg(long)]
        pub output: Option<String>,
        #[arg(long, value_enum)]
        pub indicators: Option<IndicatorStyle>,
    }

    #[derive(Debug, Clone, Default, Args)]
    pub struct PlotArgs {
        #[arg(long)]
        pub input: Option<String>,
        #[arg(long)]
        pub output: Option<String>,
        #[arg(long)]
        pub title: Option<String>,
        #[arg(long, help = "Omit the volume panel")]
        pub no_volume: bool,
        #[arg(long)]
        pub start: Option<String>,
        #[arg(long)]
        pub end: Option<String>,
    }

    #[derive(Debug, Clone, Default, Args)]
    pub struct RunArgs {
        #[arg(long, help = "Reuse the raw CSV on disk instead of fetching")]
        pub offline: bool,
        #[arg(long)]
        pub period: Option<String>,
        #[arg(long)]
        pub start: Option<String>,
        #[arg(long)]
        pub end: Option<String>,
        #[arg(long, value_enum)]
        pub indicators: Option<IndicatorStyle>,
        #[arg(long, help = "Skip the candlestick chart")]
        pub no_chart: bool,
        /// Also bundle outputs into this zip file
        #[arg(long)]
        pub bundle: Option<String>,
    }

    impl CliConfig {
        /// Settings from the config file with this invocation's overrides applied.
        pub fn effective_settings(&self) -> Result<Settings> {
            let mut settings = Settings::load_or_default(self.settings_path())?;
            if self.monitor {
                settings.monitoring.enabled = true;
            }
            self.apply_overrides(&mut settings);
            Ok(settings)
        }

        /// `--config` resolved against `--root`; absolute paths are kept as given.
        pub fn settings_path(&self) -> PathBuf {
            Path::new(&self.root).join(&self.config)
        }

        fn apply_overrides(&self, settings: &mut Settings) {
            fn set<T: Clone>(target: &mut T, value: &Option<T>) {
                if let Some(v) = value {
                    *target = v.clone();
                }
            }

            match &self.command {
                Command::Fetch(args) => {
                    set(&mut settings.source.period, &args.period);
                    set(&mut settings.source.ticker, &args.ticker);
                    set(&mut settings.paths.raw, &args.output);
                }
                Command::Clean(args) => {
                    set(&mut settings.paths.raw, &args.input);
                    set(&mut settings.paths.processed, &args.output);
                    override_range(settings, &args.start, &args.end);
                }
                Command::Features(args) => {
                    set(&mut settings.paths.processed, &args.input);
                    set(&mut settings.paths.features, &args.output);
                    set(&mut settings.features.indicators, &args.indicators);
                }
                Command::Plot(args) => {
                    set(&mut settings.paths.processed, &args.input);
                    set(&mut settings.chart.output, &args.output);
                    set(&mut settings.chart.title, &args.title);
                    if args.no_volume {
                        settings.chart.volume = false;
                    }
                    override_range(settings, &args.start, &args.end);
                }
                Command::Run(args) => {
                    if args.offline {
                        settings.source.refresh = false;
                    }
                    set(&mut settings.source.period, &args.period);
                    set(&mut settings.features.indicators, &args.indicators);
                    override_range(settings, &args.start, &args.end);
                    if args.no_chart {
                        settings.chart.enabled = false;
                    }
                    if let Some(bundle) = &args.bundle {
                        settings.bundle.enabled = true;
                        settings.bundle.filename = bundle.clone();
                    }
                }
            }
        }
    }

    fn override_range(settings: &mut Settings, start: &Option<String>, end: &Option<String>) {
        if start.is_some() {
            settings.preprocessing.start_date = start.clone();
        }
        if end.is_some() {
            settings.preprocessing.end_date = end.clone();
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validation::validate_path("root", &self.root)?;
            validation::validate_path("config", &self.config)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn parse(args: &[&str]) -> CliConfig {
            CliConfig::try_parse_from(args).unwrap()
        }

        #[test]
        fn test_run_overrides() {
            let cli = parse(&[
                "btc-pipeline",
                "--config",
                "does/not/exist.toml",
                "run",
                "--offline",
                "--start",
                "2023-01-01",
                "--indicators",
                "talib",
                "--bundle",
                "out.zip",
                "--no-chart",
            ]);
            let settings = cli.effective_settings().unwrap();

            assert!(!settings.source.refresh);
            assert_eq!(settings.preprocessing.start_date.as_deref(), Some("2023-01-01"));
            assert_eq!(settings.features.indicators, IndicatorStyle::Seeded);
            assert!(settings.bundle.enabled);
            assert_eq!(settings.bundle.filename, "out.zip");
            assert!(!settings.chart.enabled);
        }

        #[test]
        fn test_global_flags_after_subcommand() {
            let cli = parse(&[
                "btc-pipeline",
                "fetch",
                "--period",
                "max",
                "--monitor",
                "--config",
                "missing.toml",
            ]);
            assert!(cli.monitor);
            let settings = cli.effective_settings().unwrap();
            assert_eq!(settings.source.period, "max");
            assert!(settings.monitoring_enabled());
        }

        #[test]
        fn test_plot_overrides() {
            let cli = parse(&[
                "btc-pipeline",
                "--config",
                "missing.toml",
                "plot",
                "--input",
                "clean.csv",
                "--no-volume",
                "--title",
                "BTC 2024",
            ]);
            let settings = cli.effective_settings().unwrap();
            assert_eq!(settings.paths.processed, "clean.csv");
            assert!(!settings.chart.volume);
            assert_eq!(settings.chart.title, "BTC 2024");
        }

        #[test]
        fn test_settings_file_is_found_under_root() {
            let temp_dir = tempfile::TempDir::new().unwrap();
            std::fs::create_dir_all(temp_dir.path().join("config")).unwrap();
            std::fs::write(
                temp_dir.path().join("config/settings.toml"),
                "[source]\nticker = \"ETH-USD\"\n",
            )
            .unwrap();
            let root = temp_dir.path().to_str().unwrap();

            let cli = parse(&["btc-pipeline", "--root", root, "fetch"]);
            assert_eq!(
                cli.settings_path(),
                temp_dir.path().join(DEFAULT_SETTINGS_PATH)
            );
            assert_eq!(cli.effective_settings().unwrap().source.ticker, "ETH-USD");

            let absolute = temp_dir.path().join("config/settings.toml");
            let cli = parse(&[
                "btc-pipeline",
                "--root",
                "/nonexistent",
                "--config",
                absolute.to_str().unwrap(),
                "fetch",
            ]);
            assert_eq!(cli.settings_path(), absolute);
            assert_eq!(cli.effective_settings().unwrap().source.ticker, "ETH-USD");
        }

        #[test]
        fn test_unknown_indicator_style_is_rejected() {
            assert!(CliConfig::try_parse_from([
                "btc-pipeline",
                "features",
                "--indicators",
                "numpy"
            ])
            .is_err());
        }
    }
}
