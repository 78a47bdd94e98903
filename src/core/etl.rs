use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting pipeline run");
        if self.monitor.is_enabled() {
            tracing::info!("🔍 System monitoring enabled");
        }
        self.monitor.log_stats("Start");

        tracing::info!("📥 Extracting raw bars...");
        let raw = self.pipeline.extract().await?;
        tracing::info!("Extracted {} rows", raw.len());
        self.monitor.log_stats("Extract");

        tracing::info!("🔄 Cleaning and engineering features...");
        let result = self.pipeline.transform(raw).await?;
        tracing::info!(
            "Transformed {} cleaned rows into {} feature rows",
            result.cleaned.len(),
            result.features.len()
        );
        self.monitor.log_stats("Transform");

        tracing::info!("💾 Loading outputs...");
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_stats("Load");

        self.monitor.log_final_stats();
        Ok(output_path)
    }
}
