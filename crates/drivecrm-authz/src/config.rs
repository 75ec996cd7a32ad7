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

//! Configuration management for the authorization core

use std::env;

const DEFAULT_JWT_SECRET: &str = "default-secret-change-in-production";
const DEFAULT_ISSUER: &str = "drivecrm";
const DEFAULT_AUDIENCE: &str = "drivecrm-web";
const DEFAULT_SESSION_COOKIE: &str = "drivecrm_session";
const DEFAULT_TOKEN_TTL_HOURS: i64 = 12;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration for token verification and logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HS256 secret shared with the token issuer
    pub jwt_secret: String,

    /// Expected `iss` claim
    pub jwt_issuer: String,

    /// Expected `aud` claim
    pub jwt_audience: String,

    /// Cookie consulted when no bearer token is sent
    pub session_cookie: String,

    /// Lifetime of tokens minted by the CLI
    pub token_ttl_hours: i64,

    /// Log level for the binary
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_issuer: DEFAULT_ISSUER.to_string(),
            jwt_audience: DEFAULT_AUDIENCE.to_string(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            jwt_secret: lookup("DRIVECRM_JWT_SECRET").unwrap_or(defaults.jwt_secret),

            jwt_issuer: lookup("DRIVECRM_JWT_ISSUER").unwrap_or(defaults.jwt_issuer),

            jwt_audience: lookup("DRIVECRM_JWT_AUDIENCE").unwrap_or(defaults.jwt_audience),

            session_cookie: lookup("DRIVECRM_SESSION_COOKIE").unwrap_or(defaults.session_cookie),

            token_ttl_hours: lookup("DRIVECRM_TOKEN_TTL_HOURS").and_then(|v| v.parse().ok()).unwrap_or(defaults.token_ttl_hours),

            log_level: lookup("DRIVECRM_LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.session_cookie, "drivecrm_session");
    }

    #[test]
    fn test_overrides_and_bad_numbers() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DRIVECRM_JWT_SECRET", "s3cret"),
            ("DRIVECRM_SESSION_COOKIE", "crm_sid"),
            ("DRIVECRM_TOKEN_TTL_HOURS", "not-a-number"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.session_cookie, "crm_sid");
        assert_eq!(config.token_ttl_hours, 12);
        assert_eq!(config.jwt_issuer, "drivecrm");
    }
}
