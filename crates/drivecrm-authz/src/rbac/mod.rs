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

//! Role-Based Access Control (RBAC) core
//!
//! This module provides:
//! - Closed role, module and action catalogs
//! - The coarse role gate and static role defaults
//! - Effective permission resolution with per-user overrides
//! - Row scoping for list and aggregate queries

pub mod catalog;
pub mod permissions;
pub mod roles;
pub mod scope;
pub mod store;

pub use catalog::*;
pub use permissions::*;
pub use roles::*;
pub use scope::*;
pub use store::*;
