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

use anyhow::{Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use drivecrm_authz::auth::{JwtManager, Principal};
use drivecrm_authz::config::Config;
use drivecrm_authz::logging::setup_logging;
use drivecrm_authz::rbac::{EffectivePermissionSet, Filter, PermissionOverrides, ResourceKind, Role, apply_scope_to_where, load_overrides_file, scope_for};
use drivecrm_authz::routes::RoutePermissionTable;
use hyper::Method;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

/// Inspect CRM roles, permissions and scopes
#[derive(Parser, Debug)]
#[command(name = "drivecrm-authz", about = "Driving-school CRM authorization tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the effective permission set for a role
    Resolve {
        #[arg(long)]
        role: String,
        /// JSON array of {module, action, allowed} override rows
        #[arg(long)]
        overrides: Option<PathBuf>,
    },

    /// Print the permission a route requires and whether a role holds it
    Route {
        method: String,
        path: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        overrides: Option<PathBuf>,
    },

    /// Print the row filter a principal gets for a resource kind
    Scope {
        #[arg(long)]
        role: String,
        #[arg(long)]
        sub: String,
        #[arg(long)]
        resource: String,
    },

    /// Mint a development token signed with the configured secret
    IssueToken {
        #[arg(long)]
        sub: String,
        #[arg(long)]
        role: String,
        /// Lifetime in hours (defaults to DRIVECRM_TOKEN_TTL_HOURS)
        #[arg(long)]
        ttl_hours: Option<i64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    setup_logging(&config.log_level);

    match cli.command {
        Commands::Resolve { role, overrides } => {
            let permissions = resolve(&role, overrides.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&permissions)?);
        }
        Commands::Route { method, path, role, overrides } => {
            let method: Method = method.to_ascii_uppercase().parse().context("invalid HTTP method")?;
            let table = RoutePermissionTable::standard()?;
            let required = table.required_permission(&method, &path);

            let allowed = match (&role, required) {
                (Some(role), Some(required)) => Some(resolve(role, overrides.as_deref())?.allows(required.module, required.action)),
                (Some(_), None) => Some(false),
                (None, _) => None,
            };

            let output = json!({
                "method": method.as_str(),
                "path": path,
                "required": required.map(|r| r.to_string()),
                "allowed": allowed,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Scope { role, sub, resource } => {
            let principal = Principal::new(sub, parse_role(&role)?);
            let kind: ResourceKind = resource.parse()?;
            let scope = scope_for(&principal, kind)?;
            let filter = apply_scope_to_where(Filter::All, &scope, kind)?;

            let output = json!({ "scope": scope, "where": filter });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::IssueToken { sub, role, ttl_hours } => {
            let role = parse_role(&role)?;
            let jwt_manager = JwtManager::from_config(&config);
            let claims = jwt_manager.claims_for(&sub, role, Duration::hours(ttl_hours.unwrap_or(config.token_ttl_hours)));
            let token = jwt_manager.create_token(&claims)?;

            info!(user_id = %sub, role = %role, exp = claims.exp, "Issued development token");
            println!("{}", token);
        }
    }

    Ok(())
}

fn parse_role(role: &str) -> Result<Role> {
    Ok(role.parse::<Role>()?)
}

fn resolve(role: &str, overrides: Option<&Path>) -> Result<EffectivePermissionSet> {
    let role = parse_role(role)?;
    let rows = match overrides {
        Some(path) => load_overrides_file(path).with_context(|| format!("failed to read overrides from {}", path.display()))?,
        None => Vec::new(),
    };
    let overrides = PermissionOverrides::parse(&rows)?;
    Ok(EffectivePermissionSet::resolve(role, &overrides))
}
