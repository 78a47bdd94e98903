pub mod chart_api;

pub use chart_api::{fetch_and_save, ChartClient, FetchPeriod};
