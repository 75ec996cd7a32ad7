// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Error handling for the authorization core
//!
//! Every failure is an HTTP-shaped signal: a status, a stable code and a
//! human-readable message. Route handlers return the converted response
//! immediately.

use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes, header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub const AUTH_MISSING_BEARER: &str = "AUTH_MISSING_BEARER";
pub const AUTH_INVALID_TOKEN: &str = "AUTH_INVALID_TOKEN";
pub const AUTH_FORBIDDEN: &str = "AUTH_FORBIDDEN";
pub const INVALID_RULES: &str = "INVALID_RULES";
pub const SCOPE_UNSUPPORTED_RESOURCE: &str = "SCOPE_UNSUPPORTED_RESOURCE";
pub const INVALID_JSON: &str = "INVALID_JSON";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Authorization error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing credential: {message}")]
    MissingCredential { message: String },

    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Invalid permission rules: {message}")]
    InvalidRules { message: String },

    #[error("Unsupported scope resource: {message}")]
    ScopeUnsupported { message: String },

    #[error("Internal server error: {message}")]
    InternalServerError { message: String },

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Router error: {0}")]
    RouterError(String),
}

impl ApiError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden { message: message.into() }
    }

    pub fn invalid_rules(message: impl Into<String>) -> Self {
        ApiError::InvalidRules { message: message.into() }
    }

    pub fn scope_unsupported(message: impl Into<String>) -> Self {
        ApiError::ScopeUnsupported { message: message.into() }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingCredential { .. } | ApiError::InvalidToken { .. } | ApiError::JwtError(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::InvalidRules { .. } | ApiError::SerdeJsonError(_) => StatusCode::BAD_REQUEST,
            ApiError::ScopeUnsupported { .. } | ApiError::InternalServerError { .. } | ApiError::IoError(_) | ApiError::RouterError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingCredential { .. } => AUTH_MISSING_BEARER,
            ApiError::InvalidToken { .. } | ApiError::JwtError(_) => AUTH_INVALID_TOKEN,
            ApiError::Forbidden { .. } => AUTH_FORBIDDEN,
            ApiError::InvalidRules { .. } => INVALID_RULES,
            ApiError::ScopeUnsupported { .. } => SCOPE_UNSUPPORTED_RESOURCE,
            ApiError::SerdeJsonError(_) => INVALID_JSON,
            ApiError::InternalServerError { .. } | ApiError::IoError(_) | ApiError::RouterError(_) => INTERNAL_ERROR,
        }
    }

    /// True when a caller was rightly turned away, as opposed to the
    /// authorization core itself failing.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            ApiError::MissingCredential { .. } | ApiError::InvalidToken { .. } | ApiError::JwtError(_) | ApiError::Forbidden { .. }
        )
    }

    /// Human-readable message without the variant prefix
    pub fn message(&self) -> String {
        match self {
            ApiError::MissingCredential { message }
            | ApiError::InvalidToken { message }
            | ApiError::Forbidden { message }
            | ApiError::InvalidRules { message }
            | ApiError::ScopeUnsupported { message }
            | ApiError::InternalServerError { message } => message.clone(),
            ApiError::RouterError(message) => message.clone(),
            ApiError::JwtError(e) => e.to_string(),
            ApiError::SerdeJsonError(e) => e.to_string(),
            ApiError::IoError(e) => e.to_string(),
        }
    }
}

/// Short-circuit payload returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub http_status: u16,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&ApiError> for ErrorBody {
    fn from(error: &ApiError) -> Self {
        let message = error.message();
        Self {
            http_status: error.status_code().as_u16(),
            code: error.code().to_string(),
            message: (!message.is_empty()).then_some(message),
        }
    }
}

/// Convert ApiError to HTTP response
impl From<ApiError> for Response<Full<Bytes>> {
    fn from(error: ApiError) -> Self {
        let status_code = error.status_code();
        let body = ErrorBody::from(&error);

        if error.is_denial() {
            warn!(status = %status_code, code = body.code.as_str(), "Request denied: {}", error);
        } else {
            error!(status = %status_code, code = body.code.as_str(), "Authorization core error: {}", error);
        }

        let json = match serde_json::to_string(&body) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize error response: {}", e);
                format!(r#"{{"httpStatus":500,"code":"{}"}}"#, INTERNAL_ERROR)
            }
        };

        let mut response = Response::new(Full::new(Bytes::from(json)));
        *response.status_mut() = status_code;
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        headers.insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-store"));
        response
    }
}

/// Result type for authorization operations
pub type ApiResult<T> = Result<T, ApiError>;

impl From<matchit::InsertError> for ApiError {
    fn from(err: matchit::InsertError) -> Self {
        ApiError::RouterError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_status_and_codes() {
        let missing = ApiError::MissingCredential { message: "no token".to_string() };
        assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(missing.code(), AUTH_MISSING_BEARER);

        let invalid = ApiError::InvalidToken { message: "expired".to_string() };
        assert_eq!(invalid.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(invalid.code(), AUTH_INVALID_TOKEN);

        assert_eq!(ApiError::forbidden("nope").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::invalid_rules("dup").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::scope_unsupported("payroll").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::scope_unsupported("payroll").code(), SCOPE_UNSUPPORTED_RESOURCE);
    }

    #[test]
    fn test_denials_are_distinguished_from_internal_errors() {
        assert!(ApiError::forbidden("x").is_denial());
        assert!(ApiError::MissingCredential { message: "x".to_string() }.is_denial());
        assert!(!ApiError::invalid_rules("x").is_denial());
        assert!(!ApiError::scope_unsupported("x").is_denial());
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = Response::from(ApiError::forbidden("Admin role required"));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "application/json");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            ErrorBody {
                http_status: 403,
                code: AUTH_FORBIDDEN.to_string(),
                message: Some("Admin role required".to_string()),
            }
        );
    }
}
