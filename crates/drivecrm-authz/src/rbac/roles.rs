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

//! Role gate and role default permissions
//!
//! The gate is the cheap coarse check run before fine-grained resolution.
//! The default table is compiled in and never mutated at runtime.

use crate::error::{ApiError, ApiResult};
use crate::rbac::catalog::{Action, Module, Role};
use tracing::debug;

pub const ADMIN_ROLE: &str = "admin";
pub const TELESALES_ROLE: &str = "telesales";

/// True iff the role string names the admin role, ignoring case
pub fn is_admin_role(role: &str) -> bool {
    role.eq_ignore_ascii_case(ADMIN_ROLE)
}

/// Admin-only gate
pub fn require_admin_role(role: &str) -> ApiResult<()> {
    if is_admin_role(role) {
        return Ok(());
    }

    debug!(role = %role, "Admin role gate rejected request");
    Err(ApiError::forbidden("Admin role required"))
}

/// Leads are open to admins and telesales
pub fn can_access_leads(role: &str) -> bool {
    is_admin_role(role) || role.eq_ignore_ascii_case(TELESALES_ROLE)
}

pub fn require_lead_role(role: &str) -> ApiResult<()> {
    if can_access_leads(role) {
        return Ok(());
    }

    debug!(role = %role, "Lead role gate rejected request");
    Err(ApiError::forbidden("Admin or telesales role required"))
}

/// Permissions a role holds before any per-subject override
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultGrants {
    /// Every pair in the catalog
    Everything,
    /// Exactly the listed pairs
    Listed(&'static [(Module, Action)]),
}

impl DefaultGrants {
    pub fn allows(&self, module: Module, action: Action) -> bool {
        match self {
            DefaultGrants::Everything => true,
            DefaultGrants::Listed(pairs) => pairs.contains(&(module, action)),
        }
    }
}

const TELESALES_DEFAULTS: &[(Module, Action)] = &[
    (Module::Leads, Action::View),
    (Module::Leads, Action::Create),
    (Module::Leads, Action::Edit),
    (Module::Students, Action::View),
    (Module::Students, Action::Create),
    (Module::Schedule, Action::View),
    (Module::Commissions, Action::View),
    (Module::Notifications, Action::View),
];

const INSTRUCTOR_DEFAULTS: &[(Module, Action)] = &[
    (Module::Students, Action::View),
    (Module::Schedule, Action::View),
    (Module::Schedule, Action::Edit),
    (Module::Notifications, Action::View),
];

/// Static role -> default permission table
pub const fn default_grants(role: Role) -> DefaultGrants {
    match role {
        Role::Admin => DefaultGrants::Everything,
        Role::Telesales => DefaultGrants::Listed(TELESALES_DEFAULTS),
        Role::Instructor => DefaultGrants::Listed(INSTRUCTOR_DEFAULTS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AUTH_FORBIDDEN;
    use hyper::StatusCode;

    #[test]
    fn test_admin_gate_is_case_insensitive() {
        assert!(is_admin_role("admin"));
        assert!(is_admin_role("Admin"));
        assert!(is_admin_role("ADMIN"));
        assert!(!is_admin_role("administrator"));
        assert!(require_admin_role("Admin").is_ok());
    }

    #[test]
    fn test_admin_gate_rejects_telesales() {
        let err = require_admin_role("telesales").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), AUTH_FORBIDDEN);
        assert!(!err.message().is_empty());
    }

    #[test]
    fn test_lead_gate() {
        assert!(can_access_leads("admin"));
        assert!(can_access_leads("Telesales"));
        assert!(!can_access_leads("instructor"));
        assert!(!can_access_leads(""));

        assert!(require_lead_role("TELESALES").is_ok());
        assert_eq!(require_lead_role("instructor").unwrap_err().code(), AUTH_FORBIDDEN);
    }

    #[test]
    fn test_default_table() {
        assert!(default_grants(Role::Admin).allows(Module::HrTotalPayroll, Action::Run));

        let telesales = default_grants(Role::Telesales);
        assert!(telesales.allows(Module::Leads, Action::View));
        assert!(!telesales.allows(Module::Leads, Action::Delete));
        assert!(!telesales.allows(Module::HrPayroll, Action::View));

        let instructor = default_grants(Role::Instructor);
        assert!(instructor.allows(Module::Schedule, Action::Edit));
        assert!(!instructor.allows(Module::Leads, Action::View));
    }
}
