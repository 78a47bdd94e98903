pub mod csv_io;
pub mod etl;
pub mod pipeline;

pub use crate::domain::model::{SeriesFrame, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
pub use etl::EtlEngine;
pub use pipeline::BtcPipeline;
