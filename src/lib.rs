// lib.rs - Shared core for the You Eating Healthy clients

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod capabilities;
pub mod config;
pub mod event;
pub mod favorites;
pub mod foods;
pub mod gesture;
pub mod model;
pub mod nutrition;
pub mod panels;
pub mod preferences;
pub mod settings;
pub mod subscription;
pub mod tabs;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use model::{Model, ViewModel};

use capabilities::ApiError;

pub const DEFAULT_NOTIFICATION_MS: u64 = 3000;
pub const MIN_SEARCH_QUERY_LEN: usize = 2;
pub const DEFAULT_SEARCH_LIMIT: u32 = 50;
pub const MAX_SEARCH_LIMIT: u32 = 100;
pub const SEARCH_CACHE_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Authentication,
    Authorization,
    NotFound,
    Conflict,
    RateLimited,
    Server,
    Validation,
    Serialization,
    Storage,
    InvalidState,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Authentication => "AUTH_ERROR",
            Self::Authorization => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Server => "SERVER_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::Serialization => "SERIALIZATION_ERROR",
            Self::Storage => "STORAGE_ERROR",
            Self::InvalidState => "INVALID_STATE",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::Conflict | Self::RateLimited | Self::Server | Self::Storage => {
                ErrorSeverity::Transient
            }

            Self::Serialization | Self::InvalidState => ErrorSeverity::Fatal,

            Self::Authentication
            | Self::Authorization
            | Self::NotFound
            | Self::Validation
            | Self::Unknown => ErrorSeverity::Permanent,
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::RateLimited | Self::Server | Self::Storage | Self::Conflict
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && !matches!(self.severity, ErrorSeverity::Fatal)
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => "Unable to connect to server".into(),
            ErrorKind::Authentication => "Your session has expired. Please sign in again.".into(),
            ErrorKind::Authorization => "You don't have permission to perform this action.".into(),
            ErrorKind::NotFound => "The requested item could not be found.".into(),
            ErrorKind::Conflict => {
                "This action conflicts with a recent change. Please refresh and try again.".into()
            }
            ErrorKind::RateLimited => "Too many requests. Please wait a moment and try again.".into(),
            ErrorKind::Server => "Server error occurred".into(),
            ErrorKind::Validation => self.message.clone(),
            ErrorKind::Serialization => {
                "A data error occurred. Please contact support if this persists.".into()
            }
            ErrorKind::Storage => "Unable to save data on this device.".into(),
            ErrorKind::InvalidState => "The app is in an invalid state. Please reload.".into(),
            ErrorKind::Unknown => "An unexpected error occurred. Please try again.".into(),
        }
    }

    /// Status 0 is how the browser reports a request that never got a response.
    #[must_use]
    pub fn from_http_status(status: u16) -> Self {
        let kind = match status {
            0 => ErrorKind::Network,
            400 | 422 => ErrorKind::Validation,
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Authorization,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Unknown,
        };

        Self::new(kind, format!("HTTP error: {status}")).with_context("http_status", status.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        match &e {
            ApiError::Network(msg) => {
                AppError::new(ErrorKind::Network, "Network error").with_internal(msg.clone())
            }
            ApiError::Decode(msg) => {
                AppError::new(ErrorKind::Serialization, "Unexpected response").with_internal(msg.clone())
            }
            ApiError::Encode(msg) => {
                AppError::new(ErrorKind::Serialization, "Could not build request").with_internal(msg.clone())
            }
            ApiError::NotConfigured => {
                AppError::new(ErrorKind::InvalidState, "API endpoint is not configured")
            }
            _ => AppError::from_http_status(e.status()),
        }
    }
}

/// Errors raised locally, before anything reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Search query must be at least {min} characters")]
    QueryTooShort { min: usize },
    #[error("Meals per day must be between 1 and 6, got {0}")]
    MealsPerDayOutOfRange(u8),
    #[error("No price selected")]
    MissingPriceId,
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[default]
    Success,
    Error,
}

/// A transient message. The expiry clock starts on the first tick the
/// notification sees, since the core has no clock of its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub duration_ms: u64,
    pub shown_at_ms: Option<u64>,
    #[serde(default)]
    pub retryable: bool,
}

impl Notification {
    #[must_use]
    pub fn new(message: impl Into<String>, kind: NotificationKind, duration_ms: u64) -> Self {
        Self {
            message: message.into(),
            kind,
            duration_ms,
            shown_at_ms: None,
            retryable: false,
        }
    }

    /// Returns true once the notification should be dismissed.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        match self.shown_at_ms {
            None => {
                self.shown_at_ms = Some(now_ms);
                false
            }
            Some(shown) => now_ms.saturating_sub(shown) >= self.duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod error_tests {
        use super::*;

        #[test]
        fn test_status_classes() {
            assert_eq!(AppError::from_http_status(0).kind, ErrorKind::Network);
            assert_eq!(AppError::from_http_status(401).kind, ErrorKind::Authentication);
            assert_eq!(AppError::from_http_status(404).kind, ErrorKind::NotFound);
            assert_eq!(AppError::from_http_status(503).kind, ErrorKind::Server);
            assert_eq!(AppError::from_http_status(418).kind, ErrorKind::Unknown);
        }

        #[test]
        fn test_retryable() {
            assert!(AppError::from_http_status(502).is_retryable());
            assert!(!AppError::from_http_status(401).is_retryable());
            assert!(!AppError::from(ApiError::Decode("bad".into())).is_retryable());
        }

        #[test]
        fn test_display_includes_internal() {
            let e = AppError::new(ErrorKind::Network, "Network error").with_internal("dns");
            assert_eq!(e.to_string(), "[NETWORK_ERROR] Network error (internal: dns)");
        }

        #[test]
        fn test_from_api_error() {
            let e: AppError = ApiError::Unauthorized.into();
            assert_eq!(e.kind, ErrorKind::Authentication);
            assert_eq!(e.context.get("http_status").map(String::as_str), Some("401"));

            let e: AppError = ApiError::Network("offline".into()).into();
            assert_eq!(e.kind, ErrorKind::Network);
            assert_eq!(e.user_facing_message(), "Unable to connect to server");
        }

        #[test]
        fn test_validation_message_passthrough() {
            let e: AppError = ValidationError::QueryTooShort { min: 2 }.into();
            assert_eq!(e.user_facing_message(), "Search query must be at least 2 characters");
        }
    }

    mod notification_tests {
        use super::*;

        #[test]
        fn test_expires_after_duration_from_first_tick() {
            let mut n = Notification::new("Saved", NotificationKind::Success, 3000);
            assert!(!n.tick(10_000));
            assert!(!n.tick(12_999));
            assert!(n.tick(13_000));
        }
    }
}
