use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Data source error: {message}")]
    DataSourceError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("No data available during {stage}: {hint}")]
    EmptyDataError { stage: String, hint: String },

    #[error("Missing required columns {missing:?} (available: {available:?})")]
    MissingColumnsError {
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("Chart rendering failed: {message}")]
    ChartError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    Storage,
    Rendering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PipelineError {
    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn empty_data(stage: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::EmptyDataError {
            stage: stage.into(),
            hint: hint.into(),
        }
    }

    pub fn missing_columns(missing: Vec<String>, available: Vec<String>) -> Self {
        Self::MissingColumnsError { missing, available }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) | Self::DataSourceError { .. } => ErrorCategory::Network,
            Self::ConfigValidationError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::ProcessingError { .. }
            | Self::EmptyDataError { .. }
            | Self::MissingColumnsError { .. } => ErrorCategory::Data,
            Self::IoError(_) | Self::ZipError(_) => ErrorCategory::Storage,
            Self::ChartError { .. } => ErrorCategory::Rendering,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ChartError { .. } => ErrorSeverity::Low,
            Self::ApiError(_) | Self::DataSourceError { .. } | Self::EmptyDataError { .. } => {
                ErrorSeverity::Medium
            }
            Self::IoError(_) | Self::ZipError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ApiError(_) => "Check network connectivity and the source endpoint, then retry",
            Self::DataSourceError { .. } => "Check the ticker symbol and requested period",
            Self::EmptyDataError { .. } => "Widen the date range or refresh the raw data",
            Self::MissingColumnsError { .. } => {
                "Make sure the input CSV has Date, Open, High, Low, Close and Volume columns"
            }
            Self::CsvError(_) | Self::ProcessingError { .. } => {
                "Inspect the input CSV for malformed rows"
            }
            Self::ConfigValidationError { .. } | Self::InvalidConfigValueError { .. } => {
                "Review config/settings.toml against config/settings.example.toml"
            }
            Self::IoError(_) => "Check that the file exists and the directory is writable",
            Self::ZipError(_) => "Check free disk space and the bundle filename",
            Self::SerializationError(_) => "Report this as a bug with the input that triggered it",
            Self::ChartError { .. } => "Disable charting or check that system fonts are installed",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ApiError(e) => format!("Could not reach the market data API: {}", e),
            Self::EmptyDataError { stage, hint } => {
                format!("Nothing to process in {} ({})", stage, hint)
            }
            Self::MissingColumnsError { missing, .. } => {
                format!("Input is missing columns: {}", missing.join(", "))
            }
            Self::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                format!("File not found: {}", e)
            }
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(e: toml::de::Error) -> Self {
        Self::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_drives_exit_behaviour() {
        let empty = PipelineError::empty_data("preprocessing", "no rows in range");
        assert_eq!(empty.severity(), ErrorSeverity::Medium);
        assert_eq!(empty.category(), ErrorCategory::Data);

        let io = PipelineError::IoError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(io.severity(), ErrorSeverity::Critical);

        let chart = PipelineError::ChartError {
            message: "font".to_string(),
        };
        assert_eq!(chart.severity(), ErrorSeverity::Low);
        assert_eq!(chart.category(), ErrorCategory::Rendering);
    }

    #[test]
    fn test_config_errors_are_high_severity() {
        let toml_error = toml::from_str::<toml::Table>("[source\nticker = 1").unwrap_err();
        let parse: PipelineError = toml_error.into();
        assert!(matches!(
            parse,
            PipelineError::ConfigValidationError { ref field, .. } if field == "toml_parsing"
        ));
        assert_eq!(parse.category(), ErrorCategory::Configuration);
        assert_eq!(parse.severity(), ErrorSeverity::High);

        let invalid = PipelineError::InvalidConfigValueError {
            field: "source.period".to_string(),
            value: String::new(),
            reason: "empty".to_string(),
        };
        assert_eq!(invalid.category(), ErrorCategory::Configuration);
        assert!(invalid.recovery_suggestion().contains("settings.example.toml"));
    }

    #[test]
    fn test_user_friendly_messages() {
        let missing = PipelineError::missing_columns(
            vec!["Open".to_string(), "Volume".to_string()],
            vec!["Close".to_string()],
        );
        assert_eq!(
            missing.user_friendly_message(),
            "Input is missing columns: Open, Volume"
        );

        let not_found = PipelineError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "data/raw/btc.csv",
        ));
        assert!(not_found.user_friendly_message().starts_with("File not found"));
    }
}
