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

//! Permission entries, overrides and effective permission resolution

use crate::auth::Principal;
use crate::error::{ApiError, ApiResult};
use crate::rbac::catalog::{Action, Module, Role, all_pairs};
use crate::rbac::roles::default_grants;
use crate::rbac::store::OverrideStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Override row as persisted, before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPermissionEntry {
    pub module: String,
    pub action: String,
    pub allowed: bool,
}

impl RawPermissionEntry {
    pub fn new(module: impl Into<String>, action: impl Into<String>, allowed: bool) -> Self {
        Self {
            module: module.into(),
            action: action.into(),
            allowed,
        }
    }
}

/// Validated (module, action, allowed) triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub module: Module,
    pub action: Action,
    pub allowed: bool,
}

/// A (module, action) pair a route or caller requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequiredPermission {
    pub module: Module,
    pub action: Action,
}

impl RequiredPermission {
    pub fn new(module: Module, action: Action) -> Self {
        Self { module, action }
    }
}

impl fmt::Display for RequiredPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.action)
    }
}

/// Per-subject overrides keyed by (module, action)
///
/// Only constructible through validation, so holding one proves there is at
/// most one entry per pair and every key is in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionOverrides {
    entries: BTreeMap<(Module, Action), bool>,
}

impl PermissionOverrides {
    /// Normalize and validate persisted rows.
    ///
    /// Unknown keys and duplicate pairs fail with `INVALID_RULES`; all
    /// problems are reported together and nothing is merged.
    pub fn parse(rows: &[RawPermissionEntry]) -> ApiResult<Self> {
        let mut entries = BTreeMap::new();
        let mut problems = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            let module = row.module.parse::<Module>();
            let action = row.action.parse::<Action>();

            match (module, action) {
                (Ok(module), Ok(action)) => {
                    if entries.insert((module, action), row.allowed).is_some() {
                        problems.push(format!("entry {}: duplicate rule for {}:{}", index, module, action));
                    }
                }
                (module, action) => {
                    if let Err(e) = module {
                        problems.push(format!("entry {}: {}", index, e));
                    }
                    if let Err(e) = action {
                        problems.push(format!("entry {}: {}", index, e));
                    }
                }
            }
        }

        if !problems.is_empty() {
            return Err(ApiError::invalid_rules(problems.join("; ")));
        }

        Ok(Self { entries })
    }

    /// Build from already typed entries, still rejecting duplicates
    pub fn from_entries(entries: impl IntoIterator<Item = PermissionEntry>) -> ApiResult<Self> {
        let mut map = BTreeMap::new();
        for entry in entries {
            if map.insert((entry.module, entry.action), entry.allowed).is_some() {
                return Err(ApiError::invalid_rules(format!("duplicate rule for {}:{}", entry.module, entry.action)));
            }
        }
        Ok(Self { entries: map })
    }

    pub fn get(&self, module: Module, action: Action) -> Option<bool> {
        self.entries.get(&(module, action)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = PermissionEntry> + '_ {
        self.entries.iter().map(|(&(module, action), &allowed)| PermissionEntry { module, action, allowed })
    }
}

/// Merged permission mapping for one principal
///
/// Serializes as `{"leads": ["VIEW", "EDIT"], ...}`. Denied pairs are never
/// listed; absence means deny.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectivePermissionSet {
    grants: BTreeMap<Module, BTreeSet<Action>>,
}

impl EffectivePermissionSet {
    /// Overlay overrides onto the role defaults
    pub fn resolve(role: Role, overrides: &PermissionOverrides) -> Self {
        let defaults = default_grants(role);
        let mut grants: BTreeMap<Module, BTreeSet<Action>> = BTreeMap::new();

        for (module, action) in all_pairs() {
            let allowed = overrides.get(module, action).unwrap_or_else(|| defaults.allows(module, action));
            if allowed {
                grants.entry(module).or_default().insert(action);
            }
        }

        Self { grants }
    }

    pub fn allows(&self, module: Module, action: Action) -> bool {
        self.grants.get(&module).is_some_and(|actions| actions.contains(&action))
    }

    /// Fail with `AUTH_FORBIDDEN` unless the pair is granted
    pub fn require(&self, required: RequiredPermission) -> ApiResult<()> {
        if self.allows(required.module, required.action) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!("Missing required permission: {}", required)))
        }
    }

    pub fn actions(&self, module: Module) -> impl Iterator<Item = Action> + '_ {
        self.grants.get(&module).into_iter().flat_map(|actions| actions.iter().copied())
    }

    /// Flat list of allowed pairs
    pub fn allowed_pairs(&self) -> Vec<RequiredPermission> {
        self.grants
            .iter()
            .flat_map(|(&module, actions)| actions.iter().map(move |&action| RequiredPermission::new(module, action)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

/// Computes effective permissions from role defaults plus stored overrides
#[derive(Clone)]
pub struct PermissionResolver {
    store: Arc<dyn OverrideStore>,
}

impl PermissionResolver {
    pub fn new(store: Arc<dyn OverrideStore>) -> Self {
        Self { store }
    }

    /// Fetch the subject's overrides once and merge them with the defaults
    pub async fn resolve(&self, principal: &Principal) -> ApiResult<EffectivePermissionSet> {
        let start_time = Instant::now();

        let rows = self.store.fetch_overrides(&principal.sub).await?;
        let overrides = PermissionOverrides::parse(&rows).inspect_err(|e| {
            warn!(user_id = %principal.sub, error = %e, "Stored permission overrides rejected");
        })?;

        let permissions = EffectivePermissionSet::resolve(principal.role, &overrides);

        debug!(
            user_id = %principal.sub,
            role = %principal.role,
            overrides = overrides.len(),
            allowed = permissions.allowed_pairs().len(),
            duration_us = %start_time.elapsed().as_micros(),
            "Permissions resolved"
        );

        Ok(permissions)
    }

    /// Check a single pair for a principal
    pub async fn check(&self, principal: &Principal, required: RequiredPermission) -> ApiResult<bool> {
        let permissions = self.resolve(principal).await?;
        Ok(permissions.allows(required.module, required.action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::INVALID_RULES;
    use crate::rbac::store::InMemoryOverrideStore;

    fn no_overrides() -> PermissionOverrides {
        PermissionOverrides::default()
    }

    #[test]
    fn test_defaults_without_overrides() {
        for role in Role::ALL {
            let permissions = EffectivePermissionSet::resolve(role, &no_overrides());
            for (module, action) in all_pairs() {
                assert_eq!(permissions.allows(module, action), default_grants(role).allows(module, action), "{role} {module}:{action}");
            }
        }
    }

    #[test]
    fn test_telesales_leads_example() {
        let permissions = EffectivePermissionSet::resolve(Role::Telesales, &no_overrides());
        assert!(permissions.allows(Module::Leads, Action::View));
        assert!(!permissions.allows(Module::Leads, Action::Delete));
    }

    #[test]
    fn test_override_grants_and_revokes() {
        let overrides = PermissionOverrides::parse(&[
            RawPermissionEntry::new("leads", "DELETE", true),
            RawPermissionEntry::new("leads", "VIEW", false),
        ])
        .unwrap();

        let permissions = EffectivePermissionSet::resolve(Role::Telesales, &overrides);
        assert!(permissions.allows(Module::Leads, Action::Delete));
        assert!(!permissions.allows(Module::Leads, Action::View));
        assert!(permissions.allows(Module::Leads, Action::Edit));
    }

    #[test]
    fn test_admin_overrides_can_deny() {
        let overrides = PermissionOverrides::parse(&[RawPermissionEntry::new("hr_total_payroll", "run", false)]).unwrap();
        let permissions = EffectivePermissionSet::resolve(Role::Admin, &overrides);
        assert!(!permissions.allows(Module::HrTotalPayroll, Action::Run));
        assert!(permissions.allows(Module::HrTotalPayroll, Action::View));
    }

    #[test]
    fn test_normalization_before_duplicate_check() {
        let err = PermissionOverrides::parse(&[
            RawPermissionEntry::new("leads", "view", true),
            RawPermissionEntry::new(" LEADS ", "VIEW", true),
        ])
        .unwrap_err();

        assert_eq!(err.code(), INVALID_RULES);
        assert!(err.message().contains("duplicate rule for leads:VIEW"));
    }

    #[test]
    fn test_unknown_keys_are_rejected_together() {
        let err = PermissionOverrides::parse(&[
            RawPermissionEntry::new("payroll", "VIEW", true),
            RawPermissionEntry::new("leads", "APPROVE", false),
        ])
        .unwrap_err();

        let message = err.message();
        assert_eq!(err.code(), INVALID_RULES);
        assert!(message.contains("entry 0: unknown module key 'payroll'"));
        assert!(message.contains("entry 1: unknown action key 'APPROVE'"));
    }

    #[test]
    fn test_from_entries_rejects_duplicates() {
        let entry = PermissionEntry {
            module: Module::Students,
            action: Action::Edit,
            allowed: true,
        };
        assert!(PermissionOverrides::from_entries([entry]).is_ok());
        assert_eq!(PermissionOverrides::from_entries([entry, entry]).unwrap_err().code(), INVALID_RULES);
    }

    #[test]
    fn test_serialized_shape_omits_denied_pairs() {
        let permissions = EffectivePermissionSet::resolve(Role::Instructor, &no_overrides());
        let json = serde_json::to_value(&permissions).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "students": ["VIEW"],
                "schedule": ["VIEW", "EDIT"],
                "notifications": ["VIEW"],
            })
        );
    }

    #[test]
    fn test_require_reports_missing_pair() {
        let permissions = EffectivePermissionSet::resolve(Role::Instructor, &no_overrides());
        assert!(permissions.require(RequiredPermission::new(Module::Schedule, Action::View)).is_ok());

        let err = permissions.require(RequiredPermission::new(Module::Leads, Action::View)).unwrap_err();
        assert_eq!(err.message(), "Missing required permission: leads:VIEW");
    }

    #[tokio::test]
    async fn test_resolver_is_idempotent() {
        let store = Arc::new(InMemoryOverrideStore::new());
        store.replace_overrides("u-1", vec![RawPermissionEntry::new("marketing_metrics", "VIEW", true)]).await.unwrap();

        let resolver = PermissionResolver::new(store);
        let principal = Principal::new("u-1", Role::Telesales);

        let first = resolver.resolve(&principal).await.unwrap();
        let second = resolver.resolve(&principal).await.unwrap();
        assert_eq!(first, second);
        assert!(first.allows(Module::MarketingMetrics, Action::View));
        assert!(resolver.check(&principal, RequiredPermission::new(Module::MarketingMetrics, Action::View)).await.unwrap());
    }
}
