// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// Permission sets of users and user groups

use tracing::debug;

use super::Scope;
use crate::error::{Error, Result};
use crate::patch::{Patch, PatchOperation};
use crate::types::{ObjectKind, ObjectPermission, PermissionSet, SystemPermission};

/// Holder of a permission set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject<'a> {
    User(&'a str),
    UserGroup(&'a str),
}

impl<'a> Subject<'a> {
    fn collection(&self) -> &'static str {
        match self {
            Subject::User(_) => "users",
            Subject::UserGroup(_) => "userGroups",
        }
    }

    fn identifier(&self) -> &'a str {
        match self {
            Subject::User(id) | Subject::UserGroup(id) => id,
        }
    }
}

/// `/{users|userGroups}/{id}/permissions`
#[derive(Debug, Clone, Copy)]
pub struct Permissions<'a> {
    scope: Scope<'a>,
    subject: Subject<'a>,
}

impl<'a> Permissions<'a> {
    pub(crate) fn new(scope: Scope<'a>, subject: Subject<'a>) -> Self {
        Self { scope, subject }
    }

    pub fn subject(&self) -> Subject<'a> {
        self.subject
    }

    /// Directly granted permissions
    pub async fn get(self) -> Result<PermissionSet> {
        self.scope
            .get(&[self.subject.collection(), self.subject.identifier(), "permissions"])
            .await
    }

    /// Permissions including those inherited through group membership (users only)
    pub async fn effective(self) -> Result<PermissionSet> {
        match self.subject {
            Subject::User(username) => {
                self.scope
                    .get(&["users", username, "effectivePermissions"])
                    .await
            }
            Subject::UserGroup(identifier) => Err(Error::InvalidPayload(format!(
                "effective permissions are only defined for users, not group '{}'",
                identifier
            ))),
        }
    }

    /// Apply raw patch operations to the permission set
    pub async fn patch(self, operations: &[Patch]) -> Result<()> {
        if operations.is_empty() {
            return Ok(());
        }
        debug!(
            "Patching {} permission entries of {} '{}'",
            operations.len(),
            self.subject.collection(),
            self.subject.identifier()
        );
        self.scope
            .patch(
                &[self.subject.collection(), self.subject.identifier(), "permissions"],
                operations,
            )
            .await
    }

    pub async fn grant_system(self, permission: SystemPermission) -> Result<()> {
        self.patch(&[system_patch(PatchOperation::Add, permission)?]).await
    }

    pub async fn revoke_system(self, permission: SystemPermission) -> Result<()> {
        self.patch(&[system_patch(PatchOperation::Remove, permission)?]).await
    }

    pub async fn grant_object(
        self,
        kind: ObjectKind,
        identifier: &str,
        permission: ObjectPermission,
    ) -> Result<()> {
        self.patch(&[object_patch(PatchOperation::Add, kind, identifier, permission)?])
            .await
    }

    pub async fn revoke_object(
        self,
        kind: ObjectKind,
        identifier: &str,
        permission: ObjectPermission,
    ) -> Result<()> {
        self.patch(&[object_patch(PatchOperation::Remove, kind, identifier, permission)?])
            .await
    }
}

fn system_patch(op: PatchOperation, permission: SystemPermission) -> Result<Patch> {
    if permission == SystemPermission::Unknown {
        return Err(Error::InvalidPayload(
            "cannot change an unrecognized system permission".to_string(),
        ));
    }
    Ok(Patch {
        op,
        path: "/systemPermissions".to_string(),
        value: Some(permission.as_str().to_string()),
    })
}

pub(crate) fn object_patch(
    op: PatchOperation,
    kind: ObjectKind,
    identifier: &str,
    permission: ObjectPermission,
) -> Result<Patch> {
    if permission == ObjectPermission::Unknown {
        return Err(Error::InvalidPayload(
            "cannot change an unrecognized object permission".to_string(),
        ));
    }
    if identifier.is_empty() {
        return Err(Error::InvalidPayload("object identifier cannot be empty".to_string()));
    }
    Ok(Patch {
        op,
        path: format!("{}/{}", kind.permissions_path(), identifier),
        value: Some(permission.as_str().to_string()),
    })
}
