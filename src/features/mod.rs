pub mod builder;
pub mod indicators;

pub use builder::{build_features, build_features_file, FeatureReport};

use crate::utils::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which family of indicator definitions to compute.
///
/// `Recursive` smooths with plain recursive exponential averages from the first row.
/// `Seeded` follows the classic definitions where averages are seeded with a simple
/// mean and RSI uses Wilder smoothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum IndicatorStyle {
    #[default]
    #[cfg_attr(feature = "cli", value(alias = "pandas"))]
    #[serde(alias = "pandas")]
    Recursive,
    #[cfg_attr(feature = "cli", value(alias = "talib"))]
    #[serde(alias = "talib")]
    Seeded,
}

impl fmt::Display for IndicatorStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorStyle::Recursive => write!(f, "recursive"),
            IndicatorStyle::Seeded => write!(f, "seeded"),
        }
    }
}

impl FromStr for IndicatorStyle {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recursive" | "pandas" => Ok(IndicatorStyle::Recursive),
            "seeded" | "talib" => Ok(IndicatorStyle::Seeded),
            other => Err(PipelineError::InvalidConfigValueError {
                field: "features.indicators".to_string(),
                value: other.to_string(),
                reason: "expected 'recursive' or 'seeded'".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_parsing_accepts_aliases() {
        assert_eq!("pandas".parse::<IndicatorStyle>().unwrap(), IndicatorStyle::Recursive);
        assert_eq!("TALIB".parse::<IndicatorStyle>().unwrap(), IndicatorStyle::Seeded);
        assert_eq!("seeded".parse::<IndicatorStyle>().unwrap(), IndicatorStyle::Seeded);
        assert!("numpy".parse::<IndicatorStyle>().is_err());
    }
}
