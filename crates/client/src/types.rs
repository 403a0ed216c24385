// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// Resource types exchanged with the Guacamole REST API

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Free-form attribute map; Guacamole reports unset attributes as `null`
pub type Attributes = BTreeMap<String, Option<String>>;

/// Protocol/profile parameter map
pub type Parameters = BTreeMap<String, String>;

/// Identifier of the implicit root connection group
pub const ROOT_CONNECTION_GROUP: &str = "ROOT";

fn root_identifier() -> String {
    ROOT_CONNECTION_GROUP.to_string()
}

// ============================================================================
// Session
// ============================================================================

/// Response of `POST /api/tokens`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    pub auth_token: String,
    #[serde(default)]
    pub username: String,
    /// Primary data source of the authenticated user
    pub data_source: String,
    pub available_data_sources: Vec<String>,
}

// ============================================================================
// Users and groups
// ============================================================================

/// Well-known user attributes; anything else lands in `extra`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserAttributes {
    /// "true" when the account is disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<String>,
    /// "true" when the password must be changed at next login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired: Option<String>,
    /// Daily access window, "HH:MM:SS"
    #[serde(rename = "access-window-start", default, skip_serializing_if = "Option::is_none")]
    pub access_window_start: Option<String>,
    #[serde(rename = "access-window-end", default, skip_serializing_if = "Option::is_none")]
    pub access_window_end: Option<String>,
    /// Account validity, "YYYY-MM-DD"
    #[serde(rename = "valid-from", default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<String>,
    #[serde(rename = "valid-until", default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(rename = "guac-full-name", default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(rename = "guac-organization", default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(rename = "guac-organizational-role", default, skip_serializing_if = "Option::is_none")]
    pub organizational_role: Option<String>,
    #[serde(rename = "guac-email-address", default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(flatten)]
    pub extra: Attributes,
}

impl UserAttributes {
    pub fn is_disabled(&self) -> bool {
        self.disabled.as_deref() == Some("true")
    }

    pub fn is_expired(&self) -> bool {
        self.expired.as_deref() == Some("true")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    /// Only sent on create/update; the server never returns it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub attributes: UserAttributes,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub last_active: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.attributes.email_address = Some(email.into());
        self
    }

    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.attributes.full_name = Some(name.into());
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.attributes.organization = Some(organization.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.attributes.organizational_role = Some(role.into());
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.attributes.timezone = Some(timezone.into());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.attributes.disabled = Some(if disabled { "true" } else { "" }.to_string());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.extra.insert(name.into(), Some(value.into()));
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserGroup {
    pub identifier: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub attributes: Attributes,
}

impl UserGroup {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Self::default()
        }
    }
}

/// Body of `PUT /users/{username}/password`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PasswordChange<'a> {
    pub old_password: &'a str,
    pub new_password: &'a str,
}

// ============================================================================
// Connections
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Assigned by the server on creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub name: String,
    #[serde(default = "root_identifier")]
    pub parent_identifier: String,
    /// Protocol name as known to guacd (ssh, rdp, vnc, telnet, kubernetes, ...)
    pub protocol: String,
    /// Only populated when read via the `parameters` endpoint or set for create/update
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: Parameters,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_connections: Option<u32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub last_active: Option<DateTime<Utc>>,
    /// Present in connection group trees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharing_profiles: Option<Vec<SharingProfile>>,
}

impl Connection {
    pub fn new(name: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            identifier: None,
            name: name.into(),
            parent_identifier: root_identifier(),
            protocol: protocol.into(),
            parameters: Parameters::new(),
            attributes: Attributes::new(),
            active_connections: None,
            last_active: None,
            sharing_profiles: None,
        }
    }

    /// RDP connection with the stock security mode and port
    pub fn rdp(name: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self::new(name, "rdp")
            .with_hostname(hostname)
            .with_port(3389)
            .with_parameter("security", "rdp")
    }

    pub fn ssh(name: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self::new(name, "ssh").with_hostname(hostname).with_port(22)
    }

    pub fn vnc(name: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self::new(name, "vnc").with_hostname(hostname).with_port(5900)
    }

    pub fn in_group(mut self, parent_identifier: impl Into<String>) -> Self {
        self.parent_identifier = parent_identifier.into();
        self
    }

    pub fn with_hostname(self, hostname: impl Into<String>) -> Self {
        self.with_parameter("hostname", hostname)
    }

    pub fn with_port(self, port: u16) -> Self {
        self.with_parameter("port", port.to_string())
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), Some(value.into()));
        self
    }

    pub fn hostname(&self) -> Option<&str> {
        self.parameters.get("hostname").map(String::as_str)
    }

    pub fn port(&self) -> Option<u16> {
        self.parameters.get("port").and_then(|p| p.parse().ok())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionGroupType {
    Organizational,
    Balancing,
}

impl Default for ConnectionGroupType {
    fn default() -> Self {
        ConnectionGroupType::Organizational
    }
}

impl fmt::Display for ConnectionGroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionGroupType::Organizational => f.write_str("ORGANIZATIONAL"),
            ConnectionGroupType::Balancing => f.write_str("BALANCING"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub name: String,
    /// None only for the root group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_identifier: Option<String>,
    #[serde(rename = "type", default)]
    pub group_type: ConnectionGroupType,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_connections: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_connections: Option<Vec<Connection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_connection_groups: Option<Vec<ConnectionGroup>>,
}

impl ConnectionGroup {
    pub fn organizational(name: impl Into<String>, parent_identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_identifier: Some(parent_identifier.into()),
            group_type: ConnectionGroupType::Organizational,
            ..Self::default()
        }
    }

    pub fn balancing(name: impl Into<String>, parent_identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_identifier: Some(parent_identifier.into()),
            group_type: ConnectionGroupType::Balancing,
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), Some(value.into()));
        self
    }

    pub fn is_root(&self) -> bool {
        self.identifier.as_deref() == Some(ROOT_CONNECTION_GROUP)
    }

    pub fn connections(&self) -> &[Connection] {
        self.child_connections.as_deref().unwrap_or_default()
    }

    pub fn groups(&self) -> &[ConnectionGroup] {
        self.child_connection_groups.as_deref().unwrap_or_default()
    }
}

// ============================================================================
// Sharing profiles and active connections
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SharingProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub name: String,
    pub primary_connection_identifier: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: Parameters,
    #[serde(default)]
    pub attributes: Attributes,
}

impl SharingProfile {
    pub fn new(name: impl Into<String>, primary_connection_identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_connection_identifier: primary_connection_identifier.into(),
            ..Self::default()
        }
    }

    /// Joining users may watch but not interact
    pub fn read_only(self) -> Self {
        self.with_parameter("read-only", "true")
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Local sanity check; the server still has the final word
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidPayload(
                "sharing profile name cannot be empty".to_string(),
            ));
        }
        if self.primary_connection_identifier.trim().is_empty() {
            return Err(Error::InvalidPayload(
                "sharing profile needs a primaryConnectionIdentifier".to_string(),
            ));
        }
        Ok(())
    }
}

/// A live session; created by the server on connect, gone on disconnect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveConnection {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_identifier: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub connectable: bool,
}

/// Credentials for joining an active connection through a sharing profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharingCredentials {
    #[serde(default)]
    pub expected: Vec<Field>,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl SharingCredentials {
    /// The share key to hand to joining users
    pub fn share_key(&self) -> Option<&str> {
        self.values.get("key").map(String::as_str)
    }
}

/// One row of `users/{u}/history` or `connections/{c}/history`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharing_profile_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharing_profile_name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub active: bool,
}

// ============================================================================
// Permissions
// ============================================================================

/// Account-level capability
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemPermission {
    CreateUser,
    CreateUserGroup,
    CreateConnection,
    CreateConnectionGroup,
    CreateSharingProfile,
    Administer,
    /// Reported by a newer server than this client knows about
    #[serde(other)]
    Unknown,
}

impl SystemPermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemPermission::CreateUser => "CREATE_USER",
            SystemPermission::CreateUserGroup => "CREATE_USER_GROUP",
            SystemPermission::CreateConnection => "CREATE_CONNECTION",
            SystemPermission::CreateConnectionGroup => "CREATE_CONNECTION_GROUP",
            SystemPermission::CreateSharingProfile => "CREATE_SHARING_PROFILE",
            SystemPermission::Administer => "ADMINISTER",
            SystemPermission::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SystemPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemPermission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_constant(s).as_str() {
            "CREATE_USER" => Ok(SystemPermission::CreateUser),
            "CREATE_USER_GROUP" => Ok(SystemPermission::CreateUserGroup),
            "CREATE_CONNECTION" => Ok(SystemPermission::CreateConnection),
            "CREATE_CONNECTION_GROUP" => Ok(SystemPermission::CreateConnectionGroup),
            "CREATE_SHARING_PROFILE" => Ok(SystemPermission::CreateSharingProfile),
            "ADMINISTER" => Ok(SystemPermission::Administer),
            _ => Err(Error::InvalidPayload(format!("unknown system permission '{}'", s))),
        }
    }
}

/// Capability on a single object
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectPermission {
    Read,
    Update,
    Delete,
    Administer,
    #[serde(other)]
    Unknown,
}

impl ObjectPermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectPermission::Read => "READ",
            ObjectPermission::Update => "UPDATE",
            ObjectPermission::Delete => "DELETE",
            ObjectPermission::Administer => "ADMINISTER",
            ObjectPermission::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ObjectPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectPermission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_constant(s).as_str() {
            "READ" => Ok(ObjectPermission::Read),
            "UPDATE" => Ok(ObjectPermission::Update),
            "DELETE" => Ok(ObjectPermission::Delete),
            "ADMINISTER" => Ok(ObjectPermission::Administer),
            _ => Err(Error::InvalidPayload(format!("unknown object permission '{}'", s))),
        }
    }
}

fn normalize_constant(s: &str) -> String {
    s.trim().replace('-', "_").to_ascii_uppercase()
}

/// Kind of object an object permission is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Connection,
    ConnectionGroup,
    SharingProfile,
    ActiveConnection,
    User,
    UserGroup,
}

impl ObjectKind {
    /// Patch path prefix inside a permission set
    pub fn permissions_path(&self) -> &'static str {
        match self {
            ObjectKind::Connection => "/connectionPermissions",
            ObjectKind::ConnectionGroup => "/connectionGroupPermissions",
            ObjectKind::SharingProfile => "/sharingProfilePermissions",
            ObjectKind::ActiveConnection => "/activeConnectionPermissions",
            ObjectKind::User => "/userPermissions",
            ObjectKind::UserGroup => "/userGroupPermissions",
        }
    }
}

/// Permissions granted directly to (or, for effective sets, inherited by) a user or group
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    #[serde(default)]
    pub connection_permissions: BTreeMap<String, Vec<ObjectPermission>>,
    #[serde(default)]
    pub connection_group_permissions: BTreeMap<String, Vec<ObjectPermission>>,
    #[serde(default)]
    pub sharing_profile_permissions: BTreeMap<String, Vec<ObjectPermission>>,
    #[serde(default)]
    pub active_connection_permissions: BTreeMap<String, Vec<ObjectPermission>>,
    #[serde(default)]
    pub user_permissions: BTreeMap<String, Vec<ObjectPermission>>,
    #[serde(default)]
    pub user_group_permissions: BTreeMap<String, Vec<ObjectPermission>>,
    #[serde(default)]
    pub system_permissions: Vec<SystemPermission>,
}

impl PermissionSet {
    pub fn has_system(&self, permission: SystemPermission) -> bool {
        self.system_permissions.contains(&permission)
    }

    pub fn objects(&self, kind: ObjectKind) -> &BTreeMap<String, Vec<ObjectPermission>> {
        match kind {
            ObjectKind::Connection => &self.connection_permissions,
            ObjectKind::ConnectionGroup => &self.connection_group_permissions,
            ObjectKind::SharingProfile => &self.sharing_profile_permissions,
            ObjectKind::ActiveConnection => &self.active_connection_permissions,
            ObjectKind::User => &self.user_permissions,
            ObjectKind::UserGroup => &self.user_group_permissions,
        }
    }

    pub fn has_object(&self, kind: ObjectKind, identifier: &str, permission: ObjectPermission) -> bool {
        self.objects(kind)
            .get(identifier)
            .is_some_and(|granted| granted.contains(&permission))
    }
}

// ============================================================================
// Schema
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    /// TEXT, NUMERIC, BOOLEAN, ENUM, PASSWORD, TIMEZONE, ...
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Form {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolInfo {
    pub name: String,
    #[serde(default)]
    pub connection_forms: Vec<Form>,
    #[serde(default)]
    pub sharing_profile_forms: Vec<Form>,
}

/// Response of the quickconnect extension
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QuickConnectResponse {
    pub identifier: String,
}
