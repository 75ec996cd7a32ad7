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

//! Static route -> permission table

use crate::error::ApiResult;
use crate::rbac::catalog::{Action, Module};
use crate::rbac::permissions::RequiredPermission;
use hyper::Method;

/// Permission rule attached to one path pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRule {
    pub module: Module,
    /// Fixed action; `None` derives it from the HTTP method
    pub action: Option<Action>,
}

impl RouteRule {
    pub const fn by_method(module: Module) -> Self {
        Self { module, action: None }
    }

    pub const fn fixed(module: Module, action: Action) -> Self {
        Self { module, action: Some(action) }
    }

    pub fn required_for(&self, method: &Method) -> Option<RequiredPermission> {
        let action = match self.action {
            Some(action) => action,
            None => action_for_method(method)?,
        };
        Some(RequiredPermission::new(self.module, action))
    }
}

/// Default action for a method on a by-method route
pub fn action_for_method(method: &Method) -> Option<Action> {
    match *method {
        Method::GET | Method::HEAD => Some(Action::View),
        Method::POST => Some(Action::Create),
        Method::PUT | Method::PATCH => Some(Action::Edit),
        Method::DELETE => Some(Action::Delete),
        _ => None,
    }
}

/// Path patterns of the CRM API and the permission each needs
pub const ROUTE_PERMISSIONS: &[(&str, RouteRule)] = &[
    ("/api/leads", RouteRule::by_method(Module::Leads)),
    ("/api/leads/export", RouteRule::fixed(Module::Leads, Action::Export)),
    ("/api/leads/{id}", RouteRule::by_method(Module::Leads)),
    ("/api/leads/{id}/assign", RouteRule::fixed(Module::Leads, Action::Edit)),
    ("/api/students", RouteRule::by_method(Module::Students)),
    ("/api/students/{id}", RouteRule::by_method(Module::Students)),
    ("/api/schedule", RouteRule::by_method(Module::Schedule)),
    ("/api/schedule/{id}", RouteRule::by_method(Module::Schedule)),
    ("/api/hr/payroll", RouteRule::by_method(Module::HrPayroll)),
    ("/api/hr/payroll/run", RouteRule::fixed(Module::HrPayroll, Action::Run)),
    ("/api/hr/payroll/{id}", RouteRule::by_method(Module::HrPayroll)),
    ("/api/hr/total-payroll", RouteRule::fixed(Module::HrTotalPayroll, Action::View)),
    ("/api/hr/total-payroll/export", RouteRule::fixed(Module::HrTotalPayroll, Action::Export)),
    ("/api/commissions", RouteRule::by_method(Module::Commissions)),
    ("/api/commissions/generate", RouteRule::fixed(Module::Commissions, Action::Run)),
    ("/api/commissions/{id}", RouteRule::by_method(Module::Commissions)),
    ("/api/marketing/metrics", RouteRule::by_method(Module::MarketingMetrics)),
    ("/api/marketing/metrics/export", RouteRule::fixed(Module::MarketingMetrics, Action::Export)),
    ("/api/notifications", RouteRule::by_method(Module::Notifications)),
    ("/api/notifications/{id}", RouteRule::by_method(Module::Notifications)),
    ("/api/users", RouteRule::by_method(Module::Users)),
    ("/api/users/{id}", RouteRule::by_method(Module::Users)),
    ("/api/users/{id}/permissions", RouteRule::by_method(Module::Users)),
];

/// Matcher over [`ROUTE_PERMISSIONS`], built once at startup
pub struct RoutePermissionTable {
    router: matchit::Router<RouteRule>,
}

impl RoutePermissionTable {
    pub fn standard() -> ApiResult<Self> {
        Self::from_rules(ROUTE_PERMISSIONS)
    }

    pub fn from_rules(rules: &[(&str, RouteRule)]) -> ApiResult<Self> {
        let mut router = matchit::Router::new();
        for (pattern, rule) in rules {
            router.insert(*pattern, *rule)?;
        }
        Ok(Self { router })
    }

    /// Permission needed for `method path`, or `None` when nothing maps it
    pub fn required_permission(&self, method: &Method, path: &str) -> Option<RequiredPermission> {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        self.router.at(path).ok().and_then(|matched| matched.value.required_for(method))
    }
}
