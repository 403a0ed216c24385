// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// Sharing profiles: `/api/session/data/{ds}/sharingProfiles`

use std::collections::BTreeMap;

use tracing::info;

use super::Scope;
use crate::error::Result;
use crate::types::{Parameters, SharingProfile};

#[derive(Debug, Clone, Copy)]
pub struct SharingProfiles<'a> {
    scope: Scope<'a>,
}

impl<'a> SharingProfiles<'a> {
    pub(crate) fn new(scope: Scope<'a>) -> Self {
        Self { scope }
    }

    pub async fn list(self) -> Result<BTreeMap<String, SharingProfile>> {
        self.scope.get(&["sharingProfiles"]).await
    }

    pub async fn get(self, identifier: &str) -> Result<SharingProfile> {
        self.scope.get(&["sharingProfiles", identifier]).await
    }

    pub async fn parameters(self, identifier: &str) -> Result<Parameters> {
        self.scope.get(&["sharingProfiles", identifier, "parameters"]).await
    }

    /// Create a profile; a missing name or primary connection is rejected locally
    pub async fn create(self, profile: &SharingProfile) -> Result<SharingProfile> {
        profile.validate()?;
        let created: SharingProfile = self.scope.post(&["sharingProfiles"], profile).await?;
        info!(
            "Created sharing profile '{}' for connection {}",
            created.name, created.primary_connection_identifier
        );
        Ok(created)
    }

    pub async fn update(self, identifier: &str, profile: &SharingProfile) -> Result<()> {
        self.scope.put(&["sharingProfiles", identifier], profile).await
    }

    pub async fn delete(self, identifier: &str) -> Result<()> {
        self.scope.delete(&["sharingProfiles", identifier]).await?;
        info!("Deleted sharing profile {}", identifier);
        Ok(())
    }
}
