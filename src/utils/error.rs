use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Failed to initialise {engine} engine: {message}")]
    EngineInitError { engine: String, message: String },

    #[error("Lead repository unavailable: {message}")]
    RepositoryUnavailable { message: String },

    #[error("Analysis failed: {message}")]
    AnalysisError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Database,
    Engine,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ServiceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::DatabaseError(_) | Self::RepositoryUnavailable { .. } => ErrorCategory::Database,
            Self::EngineInitError { .. } | Self::AnalysisError { .. } => ErrorCategory::Engine,
            Self::CsvError(_) | Self::SerializationError(_) | Self::ValidationError { .. } => {
                ErrorCategory::Data
            }
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ValidationError { .. } => ErrorSeverity::Low,
            Self::DatabaseError(_) | Self::RepositoryUnavailable { .. } => ErrorSeverity::Medium,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. }
            | Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::AnalysisError { .. } => ErrorSeverity::High,
            Self::EngineInitError { .. } | Self::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// 依錯誤類型給出修復建議
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::MissingConfigError { .. } => {
                "Set the missing environment variable or add it to the TOML config / .env file"
            }
            Self::InvalidConfigValueError { .. } | Self::ConfigValidationError { .. } => {
                "Fix the reported configuration value and restart the service"
            }
            Self::ConfigError { .. } => "Check that the configuration file exists and is valid TOML",
            Self::DatabaseError(_) | Self::RepositoryUnavailable { .. } => {
                "Verify DATABASE_SERVER, credentials and that the database accepts connections"
            }
            Self::CsvError(_) => "Check the leads CSV header and field formats",
            Self::EngineInitError { .. } => "Review the [ml] / [geo] engine parameters",
            Self::AnalysisError { .. } => "Inspect the lead data for unexpected values and retry",
            Self::SerializationError(_) => "Report this as a bug together with the request",
            Self::ValidationError { .. } => "Adjust the request parameters",
            Self::IoError(_) => "Check file permissions, paths and that the port is free",
        }
    }

    /// 給終端使用者的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Database => format!("Cannot reach the lead database: {}", self),
            ErrorCategory::Engine => format!("Analysis engine problem: {}", self),
            ErrorCategory::Data => format!("Lead data problem: {}", self),
            ErrorCategory::System => format!("System problem: {}", self),
        }
    }

    /// 啟動失敗時使用的程序結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low | ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }
}
