// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// Active connections: `/api/session/data/{ds}/activeConnections`

use std::collections::BTreeMap;

use tracing::info;

use super::Scope;
use crate::error::Result;
use crate::patch::Patch;
use crate::types::{ActiveConnection, SharingCredentials};

#[derive(Debug, Clone, Copy)]
pub struct ActiveConnections<'a> {
    scope: Scope<'a>,
}

impl<'a> ActiveConnections<'a> {
    pub(crate) fn new(scope: Scope<'a>) -> Self {
        Self { scope }
    }

    pub async fn list(self) -> Result<BTreeMap<String, ActiveConnection>> {
        self.scope.get(&["activeConnections"]).await
    }

    /// A session that has already ended is NOT_FOUND
    pub async fn get(self, identifier: &str) -> Result<ActiveConnection> {
        self.scope.get(&["activeConnections", identifier]).await
    }

    /// Disconnect a session
    pub async fn kill(self, identifier: &str) -> Result<()> {
        self.scope.delete(&["activeConnections", identifier]).await?;
        info!("Killed active connection {}", identifier);
        Ok(())
    }

    /// Disconnect several sessions with one PATCH
    pub async fn kill_many<S: AsRef<str>>(self, identifiers: &[S]) -> Result<()> {
        let operations: Vec<Patch> = identifiers
            .iter()
            .map(|id| Patch::remove_path(format!("/{}", id.as_ref())))
            .collect();
        if operations.is_empty() {
            return Ok(());
        }
        self.scope.patch(&["activeConnections"], &operations).await?;
        info!("Killed {} active connection(s)", operations.len());
        Ok(())
    }

    /// Credentials letting others join `identifier` through a sharing profile
    pub async fn sharing_credentials(self, identifier: &str, sharing_profile: &str) -> Result<SharingCredentials> {
        self.scope
            .get(&["activeConnections", identifier, "sharingCredentials", sharing_profile])
            .await
    }
}
