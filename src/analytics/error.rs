use crate::error::AppError;

/// Result type for analytics operations
pub type AnalyticsResult<T> = std::result::Result<T, AnalyticsError>;

/// Errors from analytics operations
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// The requested reporting window is empty or out of range
    #[error("Invalid reporting window: {0}")]
    InvalidWindow(String),

    /// Analytics persistence failure
    #[error("Analytics storage error: {0}")]
    Storage(String),
}

impl From<AnalyticsError> for AppError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::InvalidWindow(msg) => AppError::Validation(msg),
            AnalyticsError::Storage(msg) => AppError::Storage(msg),
        }
    }
}
