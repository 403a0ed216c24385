// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// Users: `/api/session/data/{ds}/users`

use std::collections::BTreeMap;

use tracing::info;

use super::Scope;
use crate::error::Result;
use crate::patch::{Patch, PatchOperation};
use crate::types::{HistoryEntry, ObjectKind, ObjectPermission, PasswordChange, PermissionSet, User};

#[derive(Debug, Clone, Copy)]
pub struct Users<'a> {
    scope: Scope<'a>,
}

impl<'a> Users<'a> {
    pub(crate) fn new(scope: Scope<'a>) -> Self {
        Self { scope }
    }

    /// All users, keyed by username
    pub async fn list(self) -> Result<BTreeMap<String, User>> {
        self.scope.get(&["users"]).await
    }

    pub async fn get(self, username: &str) -> Result<User> {
        self.scope.get(&["users", username]).await
    }

    pub async fn create(self, user: &User) -> Result<User> {
        let created: User = self.scope.post(&["users"], user).await?;
        info!("Created user {}", created.username);
        Ok(created)
    }

    /// Replace the user's attributes; a `password` of None leaves it unchanged
    pub async fn update(self, username: &str, user: &User) -> Result<()> {
        self.scope.put(&["users", username], user).await
    }

    pub async fn delete(self, username: &str) -> Result<()> {
        self.scope.delete(&["users", username]).await?;
        info!("Deleted user {}", username);
        Ok(())
    }

    pub async fn permissions(self, username: &str) -> Result<PermissionSet> {
        self.scope.get(&["users", username, "permissions"]).await
    }

    pub async fn effective_permissions(self, username: &str) -> Result<PermissionSet> {
        self.scope.get(&["users", username, "effectivePermissions"]).await
    }

    /// Identifiers of the groups the user is a direct member of
    pub async fn user_groups(self, username: &str) -> Result<Vec<String>> {
        self.scope.get(&["users", username, "userGroups"]).await
    }

    pub async fn history(self, username: &str) -> Result<Vec<HistoryEntry>> {
        self.scope.get(&["users", username, "history"]).await
    }

    pub async fn add_to_group(self, username: &str, group: &str) -> Result<()> {
        self.scope
            .patch(
                &["users", username, "userGroups"],
                &[Patch::member(PatchOperation::Add, group)],
            )
            .await
    }

    pub async fn remove_from_group(self, username: &str, group: &str) -> Result<()> {
        self.scope
            .patch(
                &["users", username, "userGroups"],
                &[Patch::member(PatchOperation::Remove, group)],
            )
            .await
    }

    /// Grant READ on a connection
    pub async fn grant_connection(self, username: &str, connection: &str) -> Result<()> {
        self.scope
            .user_permissions(username)
            .grant_object(ObjectKind::Connection, connection, ObjectPermission::Read)
            .await
    }

    pub async fn revoke_connection(self, username: &str, connection: &str) -> Result<()> {
        self.scope
            .user_permissions(username)
            .revoke_object(ObjectKind::Connection, connection, ObjectPermission::Read)
            .await
    }

    /// Grant READ on a connection group
    pub async fn grant_connection_group(self, username: &str, group: &str) -> Result<()> {
        self.scope
            .user_permissions(username)
            .grant_object(ObjectKind::ConnectionGroup, group, ObjectPermission::Read)
            .await
    }

    pub async fn revoke_connection_group(self, username: &str, group: &str) -> Result<()> {
        self.scope
            .user_permissions(username)
            .revoke_object(ObjectKind::ConnectionGroup, group, ObjectPermission::Read)
            .await
    }

    /// Change a password; the server checks `old_password`
    pub async fn update_password(self, username: &str, old_password: &str, new_password: &str) -> Result<()> {
        let change = PasswordChange {
            old_password,
            new_password,
        };
        self.scope.put(&["users", username, "password"], &change).await
    }

    /// The authenticated user
    pub async fn current(self) -> Result<User> {
        self.scope.get(&["self"]).await
    }

    pub async fn current_effective_permissions(self) -> Result<PermissionSet> {
        self.scope.get(&["self", "effectivePermissions"]).await
    }
}
