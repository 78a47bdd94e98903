pub mod candlestick;

pub use candlestick::{plot_file, prepare_chart_data, render_candlestick, ChartOptions};
