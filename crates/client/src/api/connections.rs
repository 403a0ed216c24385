// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// Connections: `/api/session/data/{ds}/connections`

use std::collections::BTreeMap;

use tracing::info;

use super::Scope;
use crate::error::Result;
use crate::types::{Connection, HistoryEntry, Parameters, SharingProfile};

#[derive(Debug, Clone, Copy)]
pub struct Connections<'a> {
    scope: Scope<'a>,
}

impl<'a> Connections<'a> {
    pub(crate) fn new(scope: Scope<'a>) -> Self {
        Self { scope }
    }

    /// All connections, keyed by identifier; parameters are not included
    pub async fn list(self) -> Result<BTreeMap<String, Connection>> {
        self.scope.get(&["connections"]).await
    }

    pub async fn get(self, identifier: &str) -> Result<Connection> {
        self.scope.get(&["connections", identifier]).await
    }

    /// Protocol parameters (hostname, port, credentials, ...)
    pub async fn parameters(self, identifier: &str) -> Result<Parameters> {
        self.scope.get(&["connections", identifier, "parameters"]).await
    }

    pub async fn history(self, identifier: &str) -> Result<Vec<HistoryEntry>> {
        self.scope.get(&["connections", identifier, "history"]).await
    }

    /// Sharing profiles whose primary connection is this one
    pub async fn sharing_profiles(self, identifier: &str) -> Result<BTreeMap<String, SharingProfile>> {
        self.scope.get(&["connections", identifier, "sharingProfiles"]).await
    }

    pub async fn create(self, connection: &Connection) -> Result<Connection> {
        let created: Connection = self.scope.post(&["connections"], connection).await?;
        info!(
            "Created {} connection '{}' ({})",
            created.protocol,
            created.name,
            created.identifier.as_deref().unwrap_or("?")
        );
        Ok(created)
    }

    /// Replace a connection; parameters omitted from `connection` are cleared
    pub async fn update(self, identifier: &str, connection: &Connection) -> Result<()> {
        self.scope.put(&["connections", identifier], connection).await
    }

    pub async fn delete(self, identifier: &str) -> Result<()> {
        self.scope.delete(&["connections", identifier]).await?;
        info!("Deleted connection {}", identifier);
        Ok(())
    }
}
