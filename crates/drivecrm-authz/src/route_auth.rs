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

//! Route authorization entry points
//!
//! Handlers call one of these first and return the error response on `Err`.
//! Nothing here mutates state; a denial means the handler's data operation
//! never starts.

use crate::auth::{JwtManager, Principal, extract_credential};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::rbac::permissions::{EffectivePermissionSet, PermissionResolver, RequiredPermission};
use crate::rbac::roles::{require_admin_role, require_lead_role};
use crate::rbac::store::OverrideStore;
use crate::routes::RoutePermissionTable;
use hyper::Request;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of plain authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    pub auth: Principal,
}

/// Result of a permission-checked authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionAuthContext {
    pub auth: Principal,
    pub permissions: EffectivePermissionSet,
}

/// Authenticates requests and checks route permissions
pub struct RouteAuthenticator {
    jwt_manager: JwtManager,
    session_cookie: String,
    resolver: PermissionResolver,
    routes: RoutePermissionTable,
}

impl RouteAuthenticator {
    pub fn new(config: &Config, store: Arc<dyn OverrideStore>) -> ApiResult<Self> {
        Ok(Self::with_routes(config, store, RoutePermissionTable::standard()?))
    }

    pub fn with_routes(config: &Config, store: Arc<dyn OverrideStore>, routes: RoutePermissionTable) -> Self {
        Self {
            jwt_manager: JwtManager::from_config(config),
            session_cookie: config.session_cookie.clone(),
            resolver: PermissionResolver::new(store),
            routes,
        }
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// "Is someone logged in": bearer token or session cookie
    pub fn require_route_auth<B>(&self, req: &Request<B>) -> ApiResult<AuthContext> {
        let path = req.uri().path();

        let credential = extract_credential(req.headers(), &self.session_cookie).inspect_err(|e| {
            warn!(path = %path, code = e.code(), "Authentication failed");
        })?;

        let principal = self
            .jwt_manager
            .validate_token(credential.token())
            .and_then(Principal::try_from)
            .inspect_err(|e| {
                warn!(path = %path, source = credential.source(), code = e.code(), "Authentication failed: {}", e);
            })?;

        debug!(user_id = %principal.sub, role = %principal.role, source = credential.source(), "Request authenticated");

        Ok(AuthContext { auth: principal })
    }

    /// Coarse admin-only gate, no permission resolution
    pub fn require_admin_route_auth<B>(&self, req: &Request<B>) -> ApiResult<AuthContext> {
        let context = self.require_route_auth(req)?;
        require_admin_role(context.auth.role.as_str())?;
        Ok(context)
    }

    /// Coarse gate for lead endpoints: admin or telesales
    pub fn require_lead_route_auth<B>(&self, req: &Request<B>) -> ApiResult<AuthContext> {
        let context = self.require_route_auth(req)?;
        require_lead_role(context.auth.role.as_str())?;
        Ok(context)
    }

    /// Authenticate, then require an explicit (module, action) pair
    pub async fn require_permission_route_auth<B>(&self, req: &Request<B>, required: RequiredPermission) -> ApiResult<PermissionAuthContext> {
        let AuthContext { auth } = self.require_route_auth(req)?;
        self.authorize(auth, required, req.uri().path()).await
    }

    /// Authenticate, then require the pair the route table maps this
    /// request's method and path to. Unmapped routes are denied.
    pub async fn require_mapped_route_permission_auth<B>(&self, req: &Request<B>) -> ApiResult<PermissionAuthContext> {
        let AuthContext { auth } = self.require_route_auth(req)?;
        let path = req.uri().path();

        let Some(required) = self.routes.required_permission(req.method(), path) else {
            warn!(user_id = %auth.sub, method = %req.method(), path = %path, "No permission mapping for route");
            return Err(ApiError::forbidden(format!("No permission mapping for {} {}", req.method(), path)));
        };

        self.authorize(auth, required, path).await
    }

    async fn authorize(&self, auth: Principal, required: RequiredPermission, path: &str) -> ApiResult<PermissionAuthContext> {
        let permissions = self.resolver.resolve(&auth).await?;

        if let Err(e) = permissions.require(required) {
            warn!(
                user_id = %auth.sub,
                role = %auth.role,
                module = %required.module,
                action = %required.action,
                path = %path,
                "Permission denied"
            );
            return Err(e);
        }

        debug!(
            user_id = %auth.sub,
            module = %required.module,
            action = %required.action,
            "Permission granted"
        );

        Ok(PermissionAuthContext { auth, permissions })
    }
}
