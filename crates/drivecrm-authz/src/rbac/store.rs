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

//! Access to persisted per-subject permission overrides

use crate::error::ApiResult;
use crate::rbac::permissions::{PermissionOverrides, RawPermissionEntry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::info;

/// Data-access seam for override rows
#[async_trait]
pub trait OverrideStore: Send + Sync {
    /// Rows stored for a subject, unvalidated. Unknown subjects have none.
    async fn fetch_overrides(&self, subject: &str) -> ApiResult<Vec<RawPermissionEntry>>;
}

/// In-process override store
#[derive(Debug, Default)]
pub struct InMemoryOverrideStore {
    rows: RwLock<HashMap<String, Vec<RawPermissionEntry>>>,
}

impl InMemoryOverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all overrides for a subject.
    ///
    /// Rows are validated first; malformed rules never reach the store.
    pub async fn replace_overrides(&self, subject: &str, rows: Vec<RawPermissionEntry>) -> ApiResult<()> {
        let overrides = PermissionOverrides::parse(&rows)?;

        let mut store = self.rows.write().await;
        if rows.is_empty() {
            store.remove(subject);
        } else {
            store.insert(subject.to_string(), rows);
        }

        info!(user_id = %subject, overrides = overrides.len(), "Permission overrides replaced");
        Ok(())
    }

    /// Remove every override for a subject
    pub async fn clear(&self, subject: &str) {
        self.rows.write().await.remove(subject);
    }
}

#[async_trait]
impl OverrideStore for InMemoryOverrideStore {
    async fn fetch_overrides(&self, subject: &str) -> ApiResult<Vec<RawPermissionEntry>> {
        Ok(self.rows.read().await.get(subject).cloned().unwrap_or_default())
    }
}

/// Read a JSON array of override rows from disk
pub fn load_overrides_file(path: &Path) -> ApiResult<Vec<RawPermissionEntry>> {
    let contents = std::fs::read_to_string(path)?;
    let rows: Vec<RawPermissionEntry> = serde_json::from_str(&contents)?;
    Ok(rows)
}
