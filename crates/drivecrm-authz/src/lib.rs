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

//! Driving-school CRM authorization core
//!
//! This crate resolves who may do what in the CRM: a coarse role gate, an
//! effective permission set built from role defaults and per-user overrides,
//! row scoping for list endpoints, and the entry points route handlers call
//! before touching data.

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod rbac;
pub mod route_auth;
pub mod routes;

pub use error::{ApiError, ApiResult, ErrorBody};
pub use route_auth::{AuthContext, PermissionAuthContext, RouteAuthenticator};
