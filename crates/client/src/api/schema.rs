// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// Schema: `/api/session/data/{ds}/schema`

use std::collections::BTreeMap;

use super::Scope;
use crate::error::Result;
use crate::types::{Form, ProtocolInfo};

#[derive(Debug, Clone, Copy)]
pub struct Schema<'a> {
    scope: Scope<'a>,
}

impl<'a> Schema<'a> {
    pub(crate) fn new(scope: Scope<'a>) -> Self {
        Self { scope }
    }

    /// Protocols supported by the server, keyed by name
    pub async fn protocols(self) -> Result<BTreeMap<String, ProtocolInfo>> {
        self.scope.get(&["schema", "protocols"]).await
    }

    pub async fn user_attributes(self) -> Result<Vec<Form>> {
        self.attributes("userAttributes").await
    }

    pub async fn user_group_attributes(self) -> Result<Vec<Form>> {
        self.attributes("userGroupAttributes").await
    }

    pub async fn connection_attributes(self) -> Result<Vec<Form>> {
        self.attributes("connectionAttributes").await
    }

    pub async fn connection_group_attributes(self) -> Result<Vec<Form>> {
        self.attributes("connectionGroupAttributes").await
    }

    pub async fn sharing_profile_attributes(self) -> Result<Vec<Form>> {
        self.attributes("sharingProfileAttributes").await
    }

    async fn attributes(self, kind: &str) -> Result<Vec<Form>> {
        self.scope.get(&["schema", kind]).await
    }
}
