// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// User groups: `/api/session/data/{ds}/userGroups`

use std::collections::BTreeMap;

use tracing::{info, warn};

use super::Scope;
use crate::error::Result;
use crate::patch::{Patch, PatchOperation};
use crate::types::{PermissionSet, UserGroup};

#[derive(Debug, Clone, Copy)]
pub struct UserGroups<'a> {
    scope: Scope<'a>,
}

impl<'a> UserGroups<'a> {
    pub(crate) fn new(scope: Scope<'a>) -> Self {
        Self { scope }
    }

    /// All groups, keyed by identifier
    ///
    /// The server answers with an object keyed by identifier, not the array
    /// its documentation describes.
    pub async fn list(self) -> Result<BTreeMap<String, UserGroup>> {
        self.scope.get(&["userGroups"]).await
    }

    pub async fn get(self, identifier: &str) -> Result<UserGroup> {
        self.scope.get(&["userGroups", identifier]).await
    }

    pub async fn create(self, group: &UserGroup) -> Result<UserGroup> {
        let created: UserGroup = self.scope.post(&["userGroups"], group).await?;
        info!("Created user group {}", created.identifier);
        Ok(created)
    }

    pub async fn update(self, identifier: &str, group: &UserGroup) -> Result<()> {
        self.scope.put(&["userGroups", identifier], group).await
    }

    /// Delete a group
    ///
    /// MySQL-backed servers before 1.6.1 answer 500 here. The error is
    /// returned unchanged; check with [`get`](Self::get) whether the group
    /// is actually gone.
    pub async fn delete(self, identifier: &str) -> Result<()> {
        match self.scope.delete(&["userGroups", identifier]).await {
            Ok(()) => {
                info!("Deleted user group {}", identifier);
                Ok(())
            }
            Err(err) if err.status() == Some(500) => {
                warn!(
                    "Deleting user group '{}' failed with 500; MySQL JDBC auth before Guacamole 1.6.1 has this defect",
                    identifier
                );
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn member_users(self, identifier: &str) -> Result<Vec<String>> {
        self.scope.get(&["userGroups", identifier, "memberUsers"]).await
    }

    pub async fn add_member_user(self, identifier: &str, username: &str) -> Result<()> {
        self.patch_relation(identifier, "memberUsers", PatchOperation::Add, username)
            .await
    }

    pub async fn remove_member_user(self, identifier: &str, username: &str) -> Result<()> {
        self.patch_relation(identifier, "memberUsers", PatchOperation::Remove, username)
            .await
    }

    pub async fn member_user_groups(self, identifier: &str) -> Result<Vec<String>> {
        self.scope.get(&["userGroups", identifier, "memberUserGroups"]).await
    }

    pub async fn add_member_user_group(self, identifier: &str, member: &str) -> Result<()> {
        self.patch_relation(identifier, "memberUserGroups", PatchOperation::Add, member)
            .await
    }

    pub async fn remove_member_user_group(self, identifier: &str, member: &str) -> Result<()> {
        self.patch_relation(identifier, "memberUserGroups", PatchOperation::Remove, member)
            .await
    }

    /// Groups this group is itself a member of
    pub async fn parent_groups(self, identifier: &str) -> Result<Vec<String>> {
        self.scope.get(&["userGroups", identifier, "userGroups"]).await
    }

    pub async fn add_to_group(self, identifier: &str, parent: &str) -> Result<()> {
        self.patch_relation(identifier, "userGroups", PatchOperation::Add, parent)
            .await
    }

    pub async fn remove_from_group(self, identifier: &str, parent: &str) -> Result<()> {
        self.patch_relation(identifier, "userGroups", PatchOperation::Remove, parent)
            .await
    }

    pub async fn permissions(self, identifier: &str) -> Result<PermissionSet> {
        self.scope.get(&["userGroups", identifier, "permissions"]).await
    }

    async fn patch_relation(
        self,
        identifier: &str,
        relation: &str,
        op: PatchOperation,
        member: &str,
    ) -> Result<()> {
        self.scope
            .patch(&["userGroups", identifier, relation], &[Patch::member(op, member)])
            .await
    }
}
