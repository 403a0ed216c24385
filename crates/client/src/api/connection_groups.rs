// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// Connection groups: `/api/session/data/{ds}/connectionGroups`

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::Scope;
use crate::error::Result;
use crate::search::{find_connections, find_groups, NameMatch};
use crate::types::{Connection, ConnectionGroup, ROOT_CONNECTION_GROUP};

#[derive(Debug, Clone, Copy)]
pub struct ConnectionGroups<'a> {
    scope: Scope<'a>,
}

impl<'a> ConnectionGroups<'a> {
    pub(crate) fn new(scope: Scope<'a>) -> Self {
        Self { scope }
    }

    /// All groups keyed by identifier; `ROOT` is normally not listed
    pub async fn list(self) -> Result<BTreeMap<String, ConnectionGroup>> {
        self.scope.get(&["connectionGroups"]).await
    }

    pub async fn get(self, identifier: &str) -> Result<ConnectionGroup> {
        self.scope.get(&["connectionGroups", identifier]).await
    }

    pub async fn root(self) -> Result<ConnectionGroup> {
        self.get(ROOT_CONNECTION_GROUP).await
    }

    /// The group with all descendant groups and connections
    pub async fn tree(self, identifier: &str) -> Result<ConnectionGroup> {
        self.scope.get(&["connectionGroups", identifier, "tree"]).await
    }

    pub async fn create(self, group: &ConnectionGroup) -> Result<ConnectionGroup> {
        let created: ConnectionGroup = self.scope.post(&["connectionGroups"], group).await?;
        info!(
            "Created {} connection group '{}'",
            created.group_type, created.name
        );
        Ok(created)
    }

    pub async fn update(self, identifier: &str, group: &ConnectionGroup) -> Result<()> {
        self.scope.put(&["connectionGroups", identifier], group).await
    }

    pub async fn delete(self, identifier: &str) -> Result<()> {
        self.scope.delete(&["connectionGroups", identifier]).await?;
        info!("Deleted connection group {}", identifier);
        Ok(())
    }

    /// Connections anywhere below `identifier` whose name matches
    pub async fn find_connection(self, identifier: &str, matcher: &NameMatch) -> Result<Vec<Connection>> {
        let tree = self.tree(identifier).await?;
        let found: Vec<Connection> = find_connections(&tree, matcher).into_iter().cloned().collect();
        debug!("{} connection(s) matched below group {}", found.len(), identifier);
        Ok(found)
    }

    /// Groups anywhere below `identifier` whose name matches
    pub async fn find_group(self, identifier: &str, matcher: &NameMatch) -> Result<Vec<ConnectionGroup>> {
        let tree = self.tree(identifier).await?;
        Ok(find_groups(&tree, matcher).into_iter().cloned().collect())
    }
}
