use thiserror::Error;

#[derive(Error, Debug)]
pub enum HsseError {
    #[error("Workbook could not be read: {0}")]
    WorkbookError(#[from] calamine::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Config file could not be parsed: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Session error: {message}")]
    SessionError { message: String },

    #[error("Store request on '{table}' failed with status {status}: {message}")]
    StoreError {
        table: String,
        status: u16,
        message: String,
    },

    #[error("Permission denied: {message}")]
    PermissionError { message: String },

    #[error("Assistant error: {message}")]
    AssistantError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Io,
    Data,
    Configuration,
    Authentication,
    Permission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HsseError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HsseError::ApiError(_) | HsseError::StoreError { .. } | HsseError::AssistantError { .. } => {
                ErrorCategory::Network
            }
            HsseError::IoError(_) => ErrorCategory::Io,
            HsseError::WorkbookError(_)
            | HsseError::CsvError(_)
            | HsseError::SerializationError(_)
            | HsseError::ProcessingError { .. } => ErrorCategory::Data,
            HsseError::TomlError(_)
            | HsseError::ConfigValidationError { .. }
            | HsseError::InvalidConfigValueError { .. }
            | HsseError::MissingConfigError { .. } => ErrorCategory::Configuration,
            HsseError::SessionError { .. } => ErrorCategory::Authentication,
            HsseError::PermissionError { .. } => ErrorCategory::Permission,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Permission => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Authentication => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            HsseError::WorkbookError(e) => format!("The spreadsheet could not be opened: {}", e),
            HsseError::CsvError(e) => format!("The CSV file could not be read: {}", e),
            HsseError::ApiError(e) => format!("Could not reach the backend: {}", e),
            HsseError::StoreError { table, message, .. } => {
                format!("The backend rejected a request on '{}': {}", table, message)
            }
            HsseError::SessionError { .. } => "You must be logged in to do this".to_string(),
            HsseError::PermissionError { message } => message.clone(),
            HsseError::AssistantError { .. } => {
                "Sorry, the HSSE assistant could not be reached".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check the backend URL, your network connection and try again",
            ErrorCategory::Io => "Check that the file exists and is readable",
            ErrorCategory::Data => "Check that the file is a valid .xlsx, .xls, .ods or .csv workbook",
            ErrorCategory::Configuration => "Review the configuration file and environment variables",
            ErrorCategory::Authentication => "Set a valid access token in [backend].access_token",
            ErrorCategory::Permission => "Ask an administrator to grant you the admin role",
        }
    }
}

pub type Result<T> = std::result::Result<T, HsseError>;
