// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// guacapy - Apache Guacamole REST API client
// Typed resources, an authenticated session and per-collection sub-clients

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod network;
pub mod patch;
pub mod search;
pub mod tls;
pub mod totp;
pub mod types;

#[cfg(test)]
mod testing;

pub use api::{
    ActiveConnections, ConnectionGroups, Connections, Permissions, Schema, Scope, SharingProfiles,
    Subject, UserGroups, Users,
};
pub use client::{add_auth_token, create_http_client, GuacamoleClient};
pub use config::{ClientConfig, Scheme, TokenTransport};
pub use error::{ApiError, ApiErrorKind, Error, Result};
pub use network::{format_host_port, is_loopback_address};
pub use patch::{Patch, PatchOperation};
pub use search::NameMatch;
pub use types::{
    ActiveConnection, Attributes, AuthToken, Connection, ConnectionGroup, ConnectionGroupType, Field,
    Form, HistoryEntry, ObjectKind, ObjectPermission, Parameters, PermissionSet, ProtocolInfo,
    SharingCredentials, SharingProfile, SystemPermission, User, UserAttributes, UserGroup,
    ROOT_CONNECTION_GROUP,
};

// Re-export commonly used external types
pub use chrono::{DateTime, Utc};
