use btc_pipeline::acquisition::{fetch_and_save, ChartClient, FetchPeriod};
use btc_pipeline::config::{Command, ResolvedSettings};
use btc_pipeline::domain::ports::ConfigProvider;
use btc_pipeline::features::build_features_file;
use btc_pipeline::preprocessing::clean_file;
use btc_pipeline::utils::error::ErrorSeverity;
use btc_pipeline::utils::{logger, validation::Validate};
use btc_pipeline::visualization::{plot_file, ChartOptions};
use btc_pipeline::{BtcPipeline, CliConfig, EtlEngine, LocalStorage, PipelineError};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting btc-pipeline");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    match execute(&cli).await {
        Ok(message) => {
            tracing::info!("✅ {}", message);
            println!("✅ {}", message);
        }
        Err(e) => {
            tracing::error!(
                "❌ Pipeline failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

async fn execute(cli: &CliConfig) -> Result<String, PipelineError> {
    cli.validate()?;
    let settings = cli.effective_settings()?.resolve()?;
    let storage = LocalStorage::new(cli.root.clone());

    match &cli.command {
        Command::Fetch(_) => {
            let client = chart_client(&settings)?;
            let period: FetchPeriod = settings.period().parse()?;
            let raw = &settings.paths().raw;
            let frame = fetch_and_save(&client, &storage, settings.ticker(), &period, raw).await?;
            Ok(format!("Fetched {} rows into {}", frame.len(), raw))
        }
        Command::Clean(_) => {
            let paths = settings.paths();
            match clean_file(&storage, &paths.raw, &paths.processed, &settings.date_range()).await? {
                Some(frame) => Ok(format!("Cleaned {} rows into {}", frame.len(), paths.processed)),
                None => {
                    tracing::warn!("⚠️ No rows in the requested date range; nothing was written");
                    Ok("No data left after filtering; nothing written".to_string())
                }
            }
        }
        Command::Features(_) => {
            let paths = settings.paths();
            let report = build_features_file(
                &storage,
                &paths.processed,
                &paths.features,
                settings.indicator_style(),
            )
            .await?;
            Ok(format!(
                "Built {} feature rows ({} dropped) into {}",
                report.frame.len(),
                report.rows_dropped,
                paths.features
            ))
        }
        Command::Plot(_) => {
            let chart = &settings.settings().chart;
            let options = ChartOptions {
                title: chart.title.clone(),
                volume: chart.volume,
                range: settings.date_range(),
                ..ChartOptions::default()
            };
            plot_file(&storage, &settings.paths().processed, &chart.output, &options).await?;
            Ok(format!("Chart saved to {}", chart.output))
        }
        Command::Run(_) => {
            let monitor = settings.settings().monitoring_enabled();
            let pipeline = BtcPipeline::new(storage, settings)?;
            let engine = EtlEngine::new_with_monitoring(pipeline, monitor);
            let output_path = engine.run().await?;
            Ok(format!("Pipeline completed. Output saved to: {}", output_path))
        }
    }
}

fn chart_client(settings: &ResolvedSettings) -> Result<ChartClient, PipelineError> {
    ChartClient::new(
        settings.api_endpoint(),
        settings.request_timeout(),
        settings.api_key().map(str::to_string),
    )
}
