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

//! Authentication utilities: token verification, credential extraction and
//! the per-request principal

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::rbac::catalog::Role;
use chrono::{Duration, Utc};
use hyper::HeaderMap;
use hyper::header::{AUTHORIZATION, COOKIE};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Coarse role, validated when the principal is built
    pub role: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl Claims {
    /// Create new claims for a user
    pub fn new(user_id: String, role: Role, issuer: &str, audience: &str, expires_in: Duration) -> Self {
        let now = Utc::now();
        let exp = (now + expires_in).timestamp();

        Self {
            sub: user_id,
            role: role.to_string(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
            exp,
            iat: now.timestamp(),
            nbf: now.timestamp(),
        }
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
}

impl JwtManager {
    /// Create a new JWT manager with a secret key
    pub fn new(secret: &str, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
            issuer: issuer.to_string(),
            audience: audience.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.jwt_secret, &config.jwt_issuer, &config.jwt_audience)
    }

    /// Claims for this manager's issuer and audience
    pub fn claims_for(&self, user_id: &str, role: Role, expires_in: Duration) -> Claims {
        Claims::new(user_id.to_string(), role, &self.issuer, &self.audience, expires_in)
    }

    /// Create a JWT token
    pub fn create_token(&self, claims: &Claims) -> ApiResult<String> {
        let header = Header::new(Algorithm::HS256);
        encode(&header, claims, &self.encoding_key).map_err(ApiError::JwtError)
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> ApiResult<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => ApiError::InvalidToken {
                message: "Token has expired".to_string(),
            },
            _ => ApiError::InvalidToken {
                message: format!("Token rejected: {}", e),
            },
        })?;

        let claims = token_data.claims;

        // Additional validation
        if claims.is_expired() {
            return Err(ApiError::InvalidToken {
                message: "Token has expired".to_string(),
            });
        }

        Ok(claims)
    }
}

/// Authenticated identity for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub sub: String,
    pub role: Role,
}

impl Principal {
    pub fn new(sub: impl Into<String>, role: Role) -> Self {
        Self { sub: sub.into(), role }
    }
}

impl TryFrom<Claims> for Principal {
    type Error = ApiError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        if claims.sub.trim().is_empty() {
            return Err(ApiError::InvalidToken {
                message: "Token has no subject".to_string(),
            });
        }

        let role = claims.role.parse::<Role>().map_err(|e| ApiError::InvalidToken {
            message: format!("Token carries an {}", e),
        })?;

        Ok(Self { sub: claims.sub, role })
    }
}

/// Where a request's token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential<'a> {
    Bearer(&'a str),
    Session(&'a str),
}

impl<'a> Credential<'a> {
    pub fn token(&self) -> &'a str {
        match self {
            Credential::Bearer(token) | Credential::Session(token) => *token,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            Credential::Bearer(_) => "bearer",
            Credential::Session(_) => "session_cookie",
        }
    }
}

/// Extract JWT token from Authorization header
pub fn extract_token_from_header(auth_header: &str) -> ApiResult<&str> {
    match auth_header.trim().split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(ApiError::InvalidToken {
            message: "Invalid authorization header format".to_string(),
        }),
    }
}

/// Bearer header first, then the session cookie.
///
/// A present but malformed header is an invalid credential; it does not fall
/// through to the cookie.
pub fn extract_credential<'a>(headers: &'a HeaderMap, session_cookie: &str) -> ApiResult<Credential<'a>> {
    if let Some(auth_header) = headers.get(AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|_| ApiError::InvalidToken {
            message: "Invalid authorization header encoding".to_string(),
        })?;
        return extract_token_from_header(auth_str).map(Credential::Bearer);
    }

    if let Some(token) = find_cookie(headers, session_cookie) {
        return Ok(Credential::Session(token));
    }

    Err(ApiError::MissingCredential {
        message: "No bearer token or session cookie presented".to_string(),
    })
}

fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AUTH_INVALID_TOKEN, AUTH_MISSING_BEARER};
    use hyper::header::HeaderValue;

    fn manager() -> JwtManager {
        JwtManager::new("test-secret", "drivecrm", "drivecrm-web")
    }

    #[test]
    fn test_token_round_trip_builds_principal() {
        let jwt = manager();
        let token = jwt.create_token(&jwt.claims_for("u-42", Role::Telesales, Duration::hours(1))).unwrap();

        let claims = jwt.validate_token(&token).unwrap();
        let principal = Principal::try_from(claims).unwrap();
        assert_eq!(principal, Principal::new("u-42", Role::Telesales));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let jwt = manager();
        let mut claims = jwt.claims_for("u-42", Role::Admin, Duration::hours(1));
        claims.exp = (Utc::now() - Duration::hours(2)).timestamp();
        let token = jwt.create_token(&claims).unwrap();

        let err = jwt.validate_token(&token).unwrap_err();
        assert_eq!(err.code(), AUTH_INVALID_TOKEN);
        assert_eq!(err.message(), "Token has expired");
    }

    #[test]
    fn test_foreign_signature_and_audience_are_rejected() {
        let other = JwtManager::new("other-secret", "drivecrm", "drivecrm-web");
        let token = other.create_token(&other.claims_for("u-1", Role::Admin, Duration::hours(1))).unwrap();
        assert_eq!(manager().validate_token(&token).unwrap_err().code(), AUTH_INVALID_TOKEN);

        let wrong_audience = JwtManager::new("test-secret", "drivecrm", "mobile");
        let token = wrong_audience.create_token(&wrong_audience.claims_for("u-1", Role::Admin, Duration::hours(1))).unwrap();
        assert_eq!(manager().validate_token(&token).unwrap_err().code(), AUTH_INVALID_TOKEN);
    }

    #[test]
    fn test_unknown_role_claim_is_invalid() {
        let jwt = manager();
        let mut claims = jwt.claims_for("u-1", Role::Admin, Duration::hours(1));
        claims.role = "superuser".to_string();

        let err = Principal::try_from(claims).unwrap_err();
        assert_eq!(err.code(), AUTH_INVALID_TOKEN);
    }

    #[test]
    fn test_role_claim_is_case_insensitive() {
        let jwt = manager();
        let mut claims = jwt.claims_for("u-1", Role::Admin, Duration::hours(1));
        claims.role = "Admin".to_string();

        assert_eq!(Principal::try_from(claims).unwrap().role, Role::Admin);
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(extract_token_from_header("Bearer abc.def").unwrap(), "abc.def");
        assert_eq!(extract_token_from_header("bearer abc.def").unwrap(), "abc.def");
        assert!(extract_token_from_header("Basic dXNlcjpwYXNz").is_err());
        assert!(extract_token_from_header("Bearer ").is_err());
        assert!(extract_token_from_header("abc.def").is_err());
    }

    #[test]
    fn test_credential_precedence() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_credential(&headers, "drivecrm_session").unwrap_err().code(), AUTH_MISSING_BEARER);

        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; drivecrm_session=cookie-token"));
        assert_eq!(extract_credential(&headers, "drivecrm_session").unwrap(), Credential::Session("cookie-token"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        let credential = extract_credential(&headers, "drivecrm_session").unwrap();
        assert_eq!(credential, Credential::Bearer("header-token"));
        assert_eq!(credential.source(), "bearer");

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Token header-token"));
        assert_eq!(extract_credential(&headers, "drivecrm_session").unwrap_err().code(), AUTH_INVALID_TOKEN);
    }

    #[test]
    fn test_empty_session_cookie_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("drivecrm_session="));
        assert_eq!(extract_credential(&headers, "drivecrm_session").unwrap_err().code(), AUTH_MISSING_BEARER);
    }
}
