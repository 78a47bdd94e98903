use btc_pipeline::acquisition::{fetch_and_save, ChartClient, FetchPeriod};
use btc_pipeline::domain::model::DateRange;
use btc_pipeline::features::{build_features_file, IndicatorStyle};
use btc_pipeline::preprocessing::clean_file;
use btc_pipeline::{BtcPipeline, EtlEngine, LocalStorage, PipelineError, Settings};
use chrono::NaiveDate;
use httpmock::prelude::*;
use std::io::Read;
use std::time::Duration;
use tempfile::TempDir;

const JAN_1_2023: i64 = 1_672_531_200;

fn chart_body(rows: usize) -> serde_json::Value {
    let timestamps: Vec<i64> = (0..rows).map(|i| JAN_1_2023 + i as i64 * 86_400).collect();
    let close: Vec<f64> = (0..rows)
        .map(|i| 20_000.0 + 500.0 * ((i as f64) * 0.3).sin() + i as f64 * 10.0)
        .collect();
    let open: Vec<f64> = close.iter().map(|c| c - 50.0).collect();
    let high: Vec<f64> = close.iter().map(|c| c + 100.0).collect();
    let low: Vec<f64> = close.iter().map(|c| c - 150.0).collect();
    let volume: Vec<f64> = (0..rows).map(|i| 1_000.0 + (i % 7) as f64 * 100.0).collect();

    serde_json::json!({
        "chart": {
            "result": [{
                "timestamp": timestamps,
                "indicators": {"quote": [{
                    "open": open, "high": high, "low": low,
                    "close": close, "volume": volume
                }]}
            }],
            "error": null
        }
    })
}

fn test_settings(endpoint: String) -> Settings {
    let mut settings = Settings::default();
    settings.source.endpoint = endpoint;
    settings.source.period = "max".to_string();
    settings.source.timeout_seconds = 5;
    settings.chart.enabled = false;
    settings
}

fn root(temp_dir: &TempDir) -> String {
    temp_dir.path().to_str().unwrap().to_string()
}

#[tokio::test]
async fn test_end_to_end_run_with_bundle() {
    let temp_dir = TempDir::new().unwrap();

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v8/finance/chart/BTC-USD")
            .query_param("interval", "1d")
            .query_param("range", "max");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(chart_body(60));
    });

    let mut settings = test_settings(server.base_url());
    settings.bundle.enabled = true;
    settings.bundle.filename = "reports/run.zip".to_string();

    let storage = LocalStorage::new(root(&temp_dir));
    let pipeline = BtcPipeline::new(storage, settings.resolve().unwrap()).unwrap();
    let engine = EtlEngine::new_with_monitoring(pipeline, false);

    let output = engine.run().await.unwrap();
    api_mock.assert();
    assert_eq!(output, "reports/run.zip");

    let base = temp_dir.path();
    assert!(base.join("data/raw/btc_daily_ohlcv.csv").exists());
    assert!(base.join("data/processed/btc_daily_cleaned.csv").exists());
    assert!(base.join("data/processed/btc_daily_features.csv").exists());
    assert!(!base.join("reports/figures/btc_candlestick.svg").exists());

    let zip_data = std::fs::read(base.join("reports/run.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
    assert_eq!(archive.len(), 3);

    let mut features = String::new();
    archive
        .by_name("features.csv")
        .unwrap()
        .read_to_string(&mut features)
        .unwrap();
    let mut lines = features.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("Date,Open,High,Low,Close,Volume,daily_return,SMA_5"));
    assert!(!header.contains("Dividends"));
    assert_eq!(lines.count(), 41);

    let cleaned = std::fs::read_to_string(base.join("data/processed/btc_daily_cleaned.csv")).unwrap();
    assert!(cleaned.lines().nth(1).unwrap().starts_with("2023-01-01,"));
}

#[tokio::test]
async fn test_offline_run_reuses_raw_file() {
    let temp_dir = TempDir::new().unwrap();

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/v8/finance/chart/BTC-USD");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(chart_body(45));
    });

    let settings = test_settings(server.base_url());
    let pipeline = BtcPipeline::new(
        LocalStorage::new(root(&temp_dir)),
        settings.resolve().unwrap(),
    )
    .unwrap();
    EtlEngine::new(pipeline).run().await.unwrap();
    api_mock.assert_hits(1);

    let mut offline = settings.clone();
    offline.source.refresh = false;
    offline.preprocessing.start_date = Some("2023-01-05".to_string());
    offline.features.indicators = IndicatorStyle::Seeded;
    let pipeline = BtcPipeline::new(
        LocalStorage::new(root(&temp_dir)),
        offline.resolve().unwrap(),
    )
    .unwrap();

    let output = EtlEngine::new(pipeline).run().await.unwrap();
    api_mock.assert_hits(1);
    assert_eq!(output, "data/processed/btc_daily_features.csv");

    let cleaned = std::fs::read_to_string(
        temp_dir.path().join("data/processed/btc_daily_cleaned.csv"),
    )
    .unwrap();
    assert!(cleaned.lines().nth(1).unwrap().starts_with("2023-01-05,"));
    assert_eq!(cleaned.lines().count(), 1 + 41);

    // Seeded MACD signal needs 33 rows of warm-up.
    let features = std::fs::read_to_string(
        temp_dir.path().join("data/processed/btc_daily_features.csv"),
    )
    .unwrap();
    assert_eq!(features.lines().count(), 1 + 41 - 33);
}

#[tokio::test]
async fn test_offline_run_without_raw_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = test_settings("http://127.0.0.1:9".to_string());
    settings.source.refresh = false;

    let pipeline = BtcPipeline::new(
        LocalStorage::new(root(&temp_dir)),
        settings.resolve().unwrap(),
    )
    .unwrap();
    let err = EtlEngine::new(pipeline).run().await.unwrap_err();
    assert!(matches!(err, PipelineError::DataSourceError { .. }));
}

#[tokio::test]
async fn test_stage_by_stage_files() {
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(root(&temp_dir));

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v8/finance/chart/BTC-USD");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(chart_body(30));
    });

    let client = ChartClient::new(&server.base_url(), Duration::from_secs(5), None).unwrap();
    let period: FetchPeriod = "max".parse().unwrap();
    let raw = fetch_and_save(&client, &storage, "BTC-USD", &period, "raw/btc.csv")
        .await
        .unwrap();
    assert_eq!(raw.len(), 30);

    let range = DateRange::new(NaiveDate::from_ymd_opt(2023, 1, 10), None);
    let cleaned = clean_file(&storage, "raw/btc.csv", "processed/btc.csv", &range)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cleaned.len(), 21);
    assert_eq!(cleaned.column_names(), vec!["Open", "High", "Low", "Close", "Volume"]);

    let report = build_features_file(
        &storage,
        "processed/btc.csv",
        "processed/features.csv",
        IndicatorStyle::Recursive,
    )
    .await
    .unwrap();
    assert_eq!(report.rows_dropped, 19);
    assert_eq!(report.frame.len(), 2);
    assert!(temp_dir.path().join("processed/features.csv").exists());
}

#[tokio::test]
async fn test_clean_file_with_empty_range_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(root(&temp_dir));
    std::fs::write(
        temp_dir.path().join("raw.csv"),
        "Date,Open,High,Low,Close,Volume,Dividends,Stock Splits\n\
         2023-01-01 00:00:00+00:00,1,2,0.5,1.5,10,0,0\n",
    )
    .unwrap();

    let range = DateRange::new(NaiveDate::from_ymd_opt(2024, 1, 1), None);
    let result = clean_file(&storage, "raw.csv", "clean.csv", &range)
        .await
        .unwrap();
    assert!(result.is_none());
    assert!(!temp_dir.path().join("clean.csv").exists());
}
