pub mod acquisition;
pub mod config;
pub mod core;
pub mod domain;
pub mod features;
pub mod preprocessing;
pub mod utils;
pub mod visualization;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{LocalStorage, Settings};

pub use core::{etl::EtlEngine, pipeline::BtcPipeline};
pub use utils::error::{PipelineError, Result};
