//! Shared core for the UniFind campus lost-and-found client.
//!
//! The core is a Crux app: shells forward user input as [`Event`]s, execute
//! the HTTP / key-value / render effects it emits, and draw the
//! [`ViewModel`] it projects.

pub mod app;
pub mod auth;
pub mod capabilities;
pub mod config;
pub mod detail;
pub mod event;
pub mod listing;
pub mod model;
pub mod my_items;
pub mod search;
pub mod session;
pub mod view;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::{ApiConfig, ConfigError};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use model::{AppState, Item, ItemId, ItemType, Model, SearchFilters};
pub use view::ViewModel;

pub const API_URL_ENV: &str = "UNIFIND_API_URL";
pub const TOKEN_STORAGE_KEY: &str = "token";
pub const IMAGE_UPLOAD_PREFIX: &str = "uploads/items";
pub const QUICK_SEARCH_DEBOUNCE_MS: u64 = 300;
pub const MAX_IMAGES_PER_ITEM: usize = 5;
pub const HOME_PAGE_SIZE: usize = 4;
pub const DESCRIPTION_PREVIEW_LENGTH: usize = 120;
pub const DEFAULT_TOAST_DURATION_MS: u64 = 4000;
pub const ERROR_TOAST_DURATION_MS: u64 = 6000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

/// Failure classes surfaced to views.
///
/// The first six map one-to-one onto the backend contract: transport
/// failure, 401, 403, 404, 400 and a 2xx reply whose `status` flag is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Authentication,
    Authorization,
    NotFound,
    Validation,
    ServerLogic,
    Server,
    Deserialization,
    Configuration,
    Storage,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Authentication => "AUTH_ERROR",
            Self::Authorization => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION_ERROR",
            Self::ServerLogic => "SERVER_LOGIC_ERROR",
            Self::Server => "SERVER_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Storage => "STORAGE_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::Server | Self::Storage => ErrorSeverity::Transient,

            Self::Configuration | Self::Internal => ErrorSeverity::Fatal,

            Self::Authentication
            | Self::Authorization
            | Self::NotFound
            | Self::Validation
            | Self::ServerLogic
            | Self::Deserialization => ErrorSeverity::Permanent,
        }
    }

    /// Whether offering the user a manual retry makes sense. Nothing in the
    /// core retries on its own.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Server | Self::Storage | Self::Deserialization
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

    /// The session signal is absent for an operation that needs it.
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(
            ErrorKind::Authentication,
            "Please sign in to view item details and contact information.",
        )
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
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
    pub fn http_status(&self) -> Option<u16> {
        self.context
            .get("http_status")
            .and_then(|s| s.parse().ok())
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => {
                "Network error: Please check your connection and try again.".into()
            }
            ErrorKind::Server => "The server ran into a problem. Please try again.".into(),
            ErrorKind::Deserialization => {
                "The server sent an unexpected response. Please try again.".into()
            }
            ErrorKind::Storage => "Unable to access local storage on this device.".into(),
            ErrorKind::Internal => "An unexpected error occurred. Please try again.".into(),
            ErrorKind::Authentication
            | ErrorKind::Authorization
            | ErrorKind::NotFound
            | ErrorKind::Validation
            | ErrorKind::ServerLogic
            | ErrorKind::Configuration => self.message.clone(),
        }
    }

    /// Classify a non-2xx reply. The server's `message` field is lifted from
    /// the body when present.
    #[must_use]
    pub fn from_http_status(status: u16, body: Option<&[u8]>) -> Self {
        let kind = match status {
            400 => ErrorKind::Validation,
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Authorization,
            404 => ErrorKind::NotFound,
            _ => ErrorKind::Server,
        };

        let message = body
            .and_then(server_message)
            .unwrap_or_else(|| format!("HTTP error: {status}"));

        Self::new(kind, message).with_context("http_status", status.to_string())
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

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

/// The human-readable `message` of a JSON error body, if any.
pub(crate) fn server_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ApiErrorResponse>(body)
        .ok()
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
}

pub type AppResult<T> = Result<T, AppError>;

/// Local form validation failures. Nothing is sent while one is present.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormError {
    #[error("{0} is required")]
    Missing(String),

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Please enter a valid age")]
    InvalidAge,

    #[error("{0} is not one of the offered options")]
    UnknownOption(String),

    #[error("You can upload maximum {max} images per item.")]
    TooManyImages { max: usize },
}

impl From<FormError> for AppError {
    fn from(err: FormError) -> Self {
        AppError::new(ErrorKind::Validation, err.to_string())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

impl ToastKind {
    #[must_use]
    pub const fn default_duration_ms(self) -> u64 {
        match self {
            Self::Error => ERROR_TOAST_DURATION_MS,
            Self::Success | Self::Info => DEFAULT_TOAST_DURATION_MS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToastMessage {
    pub title: String,
    pub message: String,
    pub kind: ToastKind,
    pub duration_ms: u64,
}

impl ToastMessage {
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
            duration_ms: kind.default_duration_ms(),
        }
    }

    #[must_use]
    pub fn from_error(error: &AppError) -> Self {
        let title = match error.kind {
            ErrorKind::Authentication => "Authentication Required",
            _ => "Error",
        };
        Self::new(title, error.user_facing_message(), ToastKind::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_onto_the_taxonomy() {
        assert_eq!(AppError::from_http_status(400, None).kind, ErrorKind::Validation);
        assert_eq!(AppError::from_http_status(401, None).kind, ErrorKind::Authentication);
        assert_eq!(AppError::from_http_status(403, None).kind, ErrorKind::Authorization);
        assert_eq!(AppError::from_http_status(404, None).kind, ErrorKind::NotFound);
        assert_eq!(AppError::from_http_status(502, None).kind, ErrorKind::Server);
    }

    #[test]
    fn server_message_is_lifted_from_body() {
        let err = AppError::from_http_status(403, Some(br#"{"status":false,"message":"not yours"}"#));
        assert_eq!(err.message, "not yours");
        assert_eq!(err.http_status(), Some(403));
    }

    #[test]
    fn blank_server_message_falls_back() {
        let err = AppError::from_http_status(500, Some(br#"{"message":"  "}"#));
        assert_eq!(err.message, "HTTP error: 500");
    }

    #[test]
    fn fatal_errors_are_never_retryable() {
        let err = AppError::new(ErrorKind::Network, "x").with_severity(ErrorSeverity::Fatal);
        assert!(!err.is_retryable());
        assert!(AppError::new(ErrorKind::Network, "x").is_retryable());
        assert!(!AppError::new(ErrorKind::Authorization, "x").is_retryable());
    }

    #[test]
    fn auth_errors_get_an_authentication_toast() {
        let toast = ToastMessage::from_error(&AppError::auth_required());
        assert_eq!(toast.title, "Authentication Required");
        assert_eq!(toast.kind, ToastKind::Error);
    }

    #[test]
    fn transport_failures_hide_internal_detail() {
        let err = AppError::new(ErrorKind::Network, "connection reset by peer");
        assert!(!err.user_facing_message().contains("reset"));
    }
}
