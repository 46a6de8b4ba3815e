use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Copy)]
pub struct ErrorId(pub Uuid);

impl Default for ErrorId {
    fn default() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ErrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error body written to stderr when a report cannot be produced.
#[derive(Debug, serde::Serialize)]
pub struct ErrorReport {
    pub error: ErrorPayload,
}

#[derive(Debug, serde::Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
    pub error_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Unrecognized value for {name}: '{value}'")]
    InvalidParameter { name: &'static str, value: String },

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed dataset: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Context: {context}")]
    WithContext {
        #[source]
        source: Box<AppError>,
        context: String,
        error_id: ErrorId,
    },
}

impl AppError {
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            source: Box::new(self),
            context: context.into(),
            error_id: ErrorId::default(),
        }
    }

    pub fn error_id(&self) -> ErrorId {
        match self {
            Self::WithContext { error_id, .. } => *error_id,
            _ => ErrorId::default(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIGURATION_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",
            Self::DataSource(_) => "DATA_SOURCE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "MALFORMED_DATASET",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    pub fn safe_message(&self) -> Cow<'static, str> {
        match self {
            Self::ConfigError(_) => "Service configuration error".into(),
            Self::ValidationError(_) => "The provided query failed validation".into(),
            Self::InvalidDateRange { .. } => "The start date must not be after the end date".into(),
            Self::InvalidParameter { name, .. } => format!("Unrecognized value for {}", name).into(),
            Self::DataSource(_) | Self::Io(_) => "Sales data could not be loaded".into(),
            Self::Json(_) => "Sales data is malformed".into(),
            Self::WithContext { source, .. } => source.safe_message(),
        }
    }

    /// Whether the caller can fix the problem by changing the request.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::ValidationError(_) | Self::InvalidDateRange { .. } | Self::InvalidParameter { .. } => {
                true
            }
            Self::WithContext { source, .. } => source.is_client_error(),
            _ => false,
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::ValidationError(e) => {
                let errors = e
                    .field_errors()
                    .iter()
                    .map(|(field, errs)| {
                        let messages: Vec<String> = errs
                            .iter()
                            .map(|err| {
                                err.message
                                    .as_ref()
                                    .map(|m| m.to_string())
                                    .unwrap_or_else(|| "Invalid value".to_string())
                            })
                            .collect();
                        (field.to_string(), messages)
                    })
                    .collect::<std::collections::HashMap<String, Vec<String>>>();

                serde_json::to_value(errors).ok()
            }
            Self::InvalidDateRange { start, end } => Some(serde_json::json!({
                "start_date": start.to_rfc3339(),
                "end_date": end.to_rfc3339(),
            })),
            Self::WithContext {
                source, context, ..
            } => {
                let mut details = source.details().unwrap_or_else(|| serde_json::json!({}));
                if let Some(obj) = details.as_object_mut() {
                    obj.insert("context".to_string(), serde_json::json!(context));
                }
                Some(details)
            }
            _ => None,
        }
    }

    /// Caller-facing view of the error. Internal causes only show up as the safe
    /// message; details are kept for errors the caller can fix.
    pub fn to_report(&self, error_id: ErrorId) -> ErrorReport {
        let details = if self.is_client_error() {
            self.details()
        } else {
            None
        };

        ErrorReport {
            error: ErrorPayload {
                code: self.error_code(),
                message: self.safe_message().into_owned(),
                error_id: error_id.to_string(),
                details,
                timestamp: Utc::now().to_rfc3339(),
            },
        }
    }

    pub fn log_error(&self, error_id: ErrorId) {
        let chain = self.format_error_chain();

        if self.is_client_error() {
            warn!(
                error_id = %error_id,
                error_code = self.error_code(),
                error_chain = %chain,
                "Request rejected"
            );
        } else {
            error!(
                error_id = %error_id,
                error_code = self.error_code(),
                error_chain = %chain,
                "Sales performance computation failed"
            );
        }
    }

    fn format_error_chain(&self) -> String {
        let mut parts = vec![];
        let mut current: &AppError = self;

        loop {
            match current {
                AppError::WithContext {
                    source, context, ..
                } => {
                    parts.push(format!("[Context: {}]", context));
                    current = source;
                }
                other => {
                    parts.push(format!("[Root: {}]", other));
                    break;
                }
            }
        }

        parts.reverse();
        parts.join(" -> ")
    }
}
