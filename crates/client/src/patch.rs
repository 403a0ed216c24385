// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// JSON-patch style operations accepted by Guacamole relationship endpoints
// (permissions, userGroups, memberUsers, memberUserGroups, activeConnections)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PatchOperation {
    Add,
    Remove,
}

/// One `{op, path, value}` entry of a PATCH body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patch {
    pub op: PatchOperation,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Patch {
    pub fn add(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: PatchOperation::Add,
            path: path.into(),
            value: Some(value.into()),
        }
    }

    pub fn remove(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: PatchOperation::Remove,
            path: path.into(),
            value: Some(value.into()),
        }
    }

    /// Removal addressed purely by path (e.g. `/{identifier}` on activeConnections)
    pub fn remove_path(path: impl Into<String>) -> Self {
        Self {
            op: PatchOperation::Remove,
            path: path.into(),
            value: None,
        }
    }

    /// Membership change on a `userGroups` / `memberUsers` / `memberUserGroups` list
    pub fn member(op: PatchOperation, identifier: impl Into<String>) -> Self {
        Self {
            op,
            path: "/".to_string(),
            value: Some(identifier.into()),
        }
    }
}
