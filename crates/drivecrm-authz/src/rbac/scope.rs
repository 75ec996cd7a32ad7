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

//! Row scoping for list and aggregate queries
//!
//! A [`Scope`] is derived from the principal per request. Merging it into a
//! caller's [`Filter`] is conjunctive, so the result never matches a row the
//! caller's filter alone would exclude. Any (role, resource) pair without a
//! rule fails closed.

use crate::auth::Principal;
use crate::error::{ApiError, ApiResult};
use crate::rbac::catalog::Role;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Resource kinds list endpoints can ask to scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Lead,
    Student,
    Commission,
    Payroll,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [ResourceKind::Lead, ResourceKind::Student, ResourceKind::Commission, ResourceKind::Payroll];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Lead => "lead",
            ResourceKind::Student => "student",
            ResourceKind::Commission => "commission",
            ResourceKind::Payroll => "payroll",
        }
    }

    /// Ownership columns this resource can be narrowed on
    pub fn owner_columns(&self) -> &'static [OwnerColumn] {
        match self {
            ResourceKind::Lead => &[OwnerColumn::Owner],
            ResourceKind::Student => &[OwnerColumn::Owner, OwnerColumn::Instructor],
            ResourceKind::Commission => &[OwnerColumn::Payee],
            ResourceKind::Payroll => &[],
        }
    }
}

impl FromStr for ResourceKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ApiError::scope_unsupported(format!("no scope rule for resource kind '{}'", s)))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column identifying who a row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerColumn {
    Owner,
    Instructor,
    Payee,
}

impl OwnerColumn {
    pub fn field(&self) -> &'static str {
        match self {
            OwnerColumn::Owner => "ownerId",
            OwnerColumn::Instructor => "instructorId",
            OwnerColumn::Payee => "userId",
        }
    }
}

/// Query restriction derived from a principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Scope {
    /// No narrowing
    All,
    /// Rows whose owner column equals the principal, optionally plus
    /// rows nobody owns yet
    Owned {
        column: OwnerColumn,
        owner_id: String,
        include_unassigned: bool,
    },
}

impl Scope {
    fn owned(column: OwnerColumn, principal: &Principal, include_unassigned: bool) -> Self {
        Scope::Owned {
            column,
            owner_id: principal.sub.clone(),
            include_unassigned,
        }
    }
}

/// Where-clause tree handed to query builders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Matches every row
    All,
    Eq { field: String, value: Value },
    /// Field absent or null
    IsNull { field: String },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Filter::IsNull { field: field.into() }
    }

    /// Evaluate against a JSON row
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => row.get(field) == Some(value),
            Filter::IsNull { field } => row.get(field).is_none_or(Value::is_null),
            Filter::And(filters) => filters.iter().all(|filter| filter.matches(row)),
            Filter::Or(filters) => filters.iter().any(|filter| filter.matches(row)),
            Filter::Not(filter) => !filter.matches(row),
        }
    }
}

/// Derive the scope a principal gets for a resource kind
pub fn scope_for(principal: &Principal, kind: ResourceKind) -> ApiResult<Scope> {
    let scope = match (principal.role, kind) {
        (Role::Admin, _) => Some(Scope::All),
        (Role::Telesales, ResourceKind::Lead) => Some(Scope::owned(OwnerColumn::Owner, principal, true)),
        (Role::Telesales, ResourceKind::Student) => Some(Scope::owned(OwnerColumn::Owner, principal, false)),
        (Role::Telesales, ResourceKind::Commission) => Some(Scope::owned(OwnerColumn::Payee, principal, false)),
        (Role::Instructor, ResourceKind::Student) => Some(Scope::owned(OwnerColumn::Instructor, principal, false)),
        _ => None,
    };

    scope.ok_or_else(|| {
        warn!(user_id = %principal.sub, role = %principal.role, resource = %kind, "No scope rule for resource");
        ApiError::scope_unsupported(format!("no scope rule for role '{}' on resource kind '{}'", principal.role, kind))
    })
}

/// Narrow `base` by `scope`, conjunctively.
///
/// Caller constraints are always kept. A scope whose owner column is not
/// defined for `kind` is rejected instead of being dropped.
pub fn apply_scope_to_where(base: Filter, scope: &Scope, kind: ResourceKind) -> ApiResult<Filter> {
    let restriction = match scope {
        Scope::All => return Ok(base),
        Scope::Owned {
            column,
            owner_id,
            include_unassigned,
        } => {
            if !kind.owner_columns().contains(column) {
                return Err(ApiError::scope_unsupported(format!("column '{}' cannot scope resource kind '{}'", column.field(), kind)));
            }

            let owned = Filter::eq(column.field(), owner_id.as_str());
            if *include_unassigned { Filter::Or(vec![owned, Filter::is_null(column.field())]) } else { owned }
        }
    };

    Ok(match base {
        Filter::All => restriction,
        Filter::And(mut filters) => {
            filters.push(restriction);
            Filter::And(filters)
        }
        other => Filter::And(vec![other, restriction]),
    })
}
