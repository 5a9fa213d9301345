//! Infrastructure error type for TVM.
//!
//! `TvmError` covers everything below the C5 boundary: configuration,
//! storage, I/O, serialization, generic validation. It mirrors the
//! teacher's `FlowplaneError` taxonomy. Domain-boundary failures — the six
//! wire codes `Exchange`/`Verify`/`UpdateMemberRoles`/`Revoke`/`ListTokens`
//! actually return to callers — live in [`crate::errors::VendingError`]
//! instead, the TVM analogue of the teacher's `AuthError`.

/// Result alias used throughout the infrastructure layers.
pub type Result<T> = std::result::Result<T, TvmError>;

#[derive(thiserror::Error, Debug)]
pub enum TvmError {
    #[error("configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    #[error("serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl TvmError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Whether the failure is plausibly transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TvmError::Database { .. } | TvmError::Io { .. })
    }
}

impl From<sqlx::Error> for TvmError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "database operation failed".to_string() }
    }
}

impl From<std::io::Error> for TvmError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for TvmError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON (de)serialization failed".to_string() }
    }
}

impl From<config::ConfigError> for TvmError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for TvmError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or_else(|| "invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{field}: {}", messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");
        Self::validation(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_carries_message() {
        let err = TvmError::config("bad config");
        assert_eq!(err.to_string(), "configuration error: bad config");
    }

    #[test]
    fn database_errors_are_retryable() {
        let err = TvmError::database(sqlx::Error::RowNotFound, "lookup");
        assert!(err.is_retryable());
        assert!(!TvmError::validation("nope").is_retryable());
    }
}
