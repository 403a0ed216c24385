// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// Error types for the Guacamole REST client

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rejected before any request was sent
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("TOTP error: {0}")]
    Totp(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid name pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The remote error, if this failure came from a non-2xx response
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) => Some(e),
            _ => None,
        }
    }

    /// HTTP status of the remote failure
    pub fn status(&self) -> Option<u16> {
        self.api().map(|e| e.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.api().is_some_and(|e| e.kind == ApiErrorKind::NotFound)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.api().is_some_and(|e| e.kind == ApiErrorKind::Unauthorized)
    }
}

/// Classification of a non-2xx response, strictly by HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// 400: malformed payload, or the object already exists
    InvalidPayload,
    /// 401
    Unauthorized,
    /// 403: authenticated but lacking permission
    Forbidden,
    /// 404
    NotFound,
    /// 500: server-side defect
    Internal,
    Other,
}

impl ApiErrorKind {
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => ApiErrorKind::InvalidPayload,
            StatusCode::UNAUTHORIZED => ApiErrorKind::Unauthorized,
            StatusCode::FORBIDDEN => ApiErrorKind::Forbidden,
            StatusCode::NOT_FOUND => ApiErrorKind::NotFound,
            StatusCode::INTERNAL_SERVER_ERROR => ApiErrorKind::Internal,
            _ => ApiErrorKind::Other,
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ApiErrorKind::InvalidPayload => "invalid payload",
            ApiErrorKind::Unauthorized => "unauthorized",
            ApiErrorKind::Forbidden => "permission denied",
            ApiErrorKind::NotFound => "not found",
            ApiErrorKind::Internal => "internal server error",
            ApiErrorKind::Other => "unexpected status",
        };
        f.write_str(label)
    }
}

/// Failure reported by the Guacamole server
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: u16,
    pub kind: ApiErrorKind,
    /// Raw response body
    pub body: String,
    /// `message` field of the Guacamole error document, when present
    pub message: Option<String>,
    /// `type` field of the Guacamole error document (e.g. `NOT_FOUND`)
    pub error_type: Option<String>,
}

/// JSON error document returned by the REST API
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

impl ApiError {
    pub fn from_response(status: StatusCode, body: String) -> Self {
        let parsed = serde_json::from_str::<ErrorBody>(&body).ok();
        let (message, error_type) = match parsed {
            Some(b) => (b.message, b.error_type),
            None => (None, None),
        };

        Self {
            status: status.as_u16(),
            kind: ApiErrorKind::from_status(status),
            body,
            message,
            error_type,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guacamole API error {} ({})", self.status, self.kind)?;
        match (&self.message, self.body.is_empty()) {
            (Some(message), _) => write!(f, ": {}", message),
            (None, false) => write!(f, ": {}", self.body),
            (None, true) => Ok(()),
        }
    }
}

impl std::error::Error for ApiError {}
