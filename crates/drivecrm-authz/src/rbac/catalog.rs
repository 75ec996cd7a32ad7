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

//! Closed key sets shared by the resolver and every call site
//!
//! Roles, modules and actions are fixed at build time. Adding one is a
//! deploy-time change; strings are parsed into these enums at the boundary
//! and never compared ad hoc afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A string that does not name any member of a closed key set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} key '{value}'")]
pub struct UnknownKey {
    pub kind: &'static str,
    pub value: String,
}

/// Coarse principal role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Telesales,
    Instructor,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Telesales, Role::Instructor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Telesales => "telesales",
            Role::Instructor => "instructor",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownKey;

    /// Case-insensitive, surrounding whitespace ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim();
        Role::ALL.into_iter().find(|role| role.as_str().eq_ignore_ascii_case(normalized)).ok_or_else(|| UnknownKey {
            kind: "role",
            value: s.to_string(),
        })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Functional area subject to permission checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Leads,
    Students,
    Schedule,
    HrPayroll,
    HrTotalPayroll,
    Commissions,
    MarketingMetrics,
    Notifications,
    Users,
}

impl Module {
    pub const ALL: [Module; 9] = [
        Module::Leads,
        Module::Students,
        Module::Schedule,
        Module::HrPayroll,
        Module::HrTotalPayroll,
        Module::Commissions,
        Module::MarketingMetrics,
        Module::Notifications,
        Module::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Leads => "leads",
            Module::Students => "students",
            Module::Schedule => "schedule",
            Module::HrPayroll => "hr_payroll",
            Module::HrTotalPayroll => "hr_total_payroll",
            Module::Commissions => "commissions",
            Module::MarketingMetrics => "marketing_metrics",
            Module::Notifications => "notifications",
            Module::Users => "users",
        }
    }
}

impl FromStr for Module {
    type Err = UnknownKey;

    /// Module keys are snake_case; input is trimmed and lowercased first
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Module::ALL.into_iter().find(|module| module.as_str() == normalized).ok_or_else(|| UnknownKey {
            kind: "module",
            value: s.to_string(),
        })
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation class within a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Run,
    Export,
}

impl Action {
    pub const ALL: [Action; 6] = [Action::View, Action::Create, Action::Edit, Action::Delete, Action::Run, Action::Export];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "VIEW",
            Action::Create => "CREATE",
            Action::Edit => "EDIT",
            Action::Delete => "DELETE",
            Action::Run => "RUN",
            Action::Export => "EXPORT",
        }
    }
}

impl FromStr for Action {
    type Err = UnknownKey;

    /// Action keys are UPPERCASE; input is trimmed and uppercased first
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Action::ALL.into_iter().find(|action| action.as_str() == normalized).ok_or_else(|| UnknownKey {
            kind: "action",
            value: s.to_string(),
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every (module, action) pair, in catalog order
pub fn all_pairs() -> impl Iterator<Item = (Module, Action)> {
    Module::ALL.into_iter().flat_map(|module| Action::ALL.into_iter().map(move |action| (module, action)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_is_case_insensitive() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" TELESALES ".parse::<Role>().unwrap(), Role::Telesales);
        assert_eq!("instructor".parse::<Role>().unwrap(), Role::Instructor);

        let err = "manager".parse::<Role>().unwrap_err();
        assert_eq!(err.kind, "role");
        assert_eq!(err.value, "manager");
    }

    #[test]
    fn test_module_and_action_normalization() {
        assert_eq!("HR_TOTAL_PAYROLL".parse::<Module>().unwrap(), Module::HrTotalPayroll);
        assert_eq!(" leads".parse::<Module>().unwrap(), Module::Leads);
        assert_eq!("view".parse::<Action>().unwrap(), Action::View);
        assert_eq!("Run ".parse::<Action>().unwrap(), Action::Run);

        assert!("payroll".parse::<Module>().is_err());
        assert!("APPROVE".parse::<Action>().is_err());
    }

    #[test]
    fn test_serde_keys_match_display() {
        for module in Module::ALL {
            let json = serde_json::to_string(&module).unwrap();
            assert_eq!(json, format!("\"{}\"", module));
        }
        for action in Action::ALL {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action));
        }
        for role in Role::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role));
        }
    }

    #[test]
    fn test_all_pairs_covers_catalog() {
        assert_eq!(all_pairs().count(), Module::ALL.len() * Action::ALL.len());
    }
}
