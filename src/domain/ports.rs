use crate::domain::model::{DateRange, SeriesFrame, TransformResult};
use crate::features::IndicatorStyle;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

/// Where each stage reads and writes its CSV files, relative to the storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub raw: String,
    pub processed: String,
    pub features: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSettings {
    pub output: String,
    pub title: String,
    pub volume: bool,
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn ticker(&self) -> &str;
    fn period(&self) -> &str;
    fn api_key(&self) -> Option<&str>;
    fn request_timeout(&self) -> Duration;
    /// Fetch a fresh raw CSV instead of reusing the one already in storage.
    fn refresh_raw(&self) -> bool;
    fn paths(&self) -> &DataPaths;
    fn date_range(&self) -> DateRange;
    fn indicator_style(&self) -> IndicatorStyle;
    fn chart(&self) -> Option<&ChartSettings>;
    fn bundle_name(&self) -> Option<&str>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<SeriesFrame>;
    async fn transform(&self, raw: SeriesFrame) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
