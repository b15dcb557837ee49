use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Folder watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("Malformed data file {path}: {source}")]
    ParseError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot convert field '{field}' (value: '{value}'): {reason}")]
    ConversionError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("No article with identification {identification} exists in the warehouse")]
    ArticleNotFound { identification: i32 },

    #[error("Lookup of article {identification} failed: {source}")]
    ArticleLookupError {
        identification: i32,
        #[source]
        source: Box<IngestError>,
    },

    #[error("Warehouse API rejected request to {url} with status {status}")]
    RejectedStatus { url: String, status: u16 },

    #[error("Unexpected acknowledgment from {url}: {message}")]
    AcknowledgmentError { url: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

/// 錯誤分類，對應處理流程中的四種失敗來源加上監看與設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Parse,
    Conversion,
    Downstream,
    Watch,
    Config,
}

impl IngestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            IngestError::IoError(_) => ErrorCategory::Io,
            IngestError::SerializationError(_) | IngestError::ParseError { .. } => {
                ErrorCategory::Parse
            }
            IngestError::ConversionError { .. }
            | IngestError::ArticleNotFound { .. }
            | IngestError::ArticleLookupError { .. } => ErrorCategory::Conversion,
            IngestError::ApiError(_)
            | IngestError::RejectedStatus { .. }
            | IngestError::AcknowledgmentError { .. } => ErrorCategory::Downstream,
            IngestError::WatchError(_) => ErrorCategory::Watch,
            IngestError::ConfigError { .. }
            | IngestError::InvalidConfigValueError { .. }
            | IngestError::MissingConfigError { .. } => ErrorCategory::Config,
        }
    }

    pub fn conversion(field: &str, value: &str, reason: impl ToString) -> Self {
        IngestError::ConversionError {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            IngestError::MissingConfigError { field } => {
                format!("Missing required setting: {}", field)
            }
            IngestError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            IngestError::ConfigError { message } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Config => {
                "Check the command line flags or the TOML config file (see --help)"
            }
            ErrorCategory::Io => "Check that the folders exist and are readable/writable",
            ErrorCategory::Parse => "Fix the data file and drop it into the incoming folder again",
            ErrorCategory::Conversion => {
                "Check the record fields and that referenced articles were ingested first"
            }
            ErrorCategory::Downstream => "Check that the Warehouse API is reachable and healthy",
            ErrorCategory::Watch => "Check that the folder is watchable (permissions, inotify limits)",
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
