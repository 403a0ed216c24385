// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// Guacamole REST Client - Resource Sub-clients
// One module per `/api/session/data/{ds}/...` collection

mod active_connections;
mod connection_groups;
mod connections;
mod permissions;
mod schema;
mod sharing_profiles;
mod user_groups;
mod users;

pub use active_connections::ActiveConnections;
pub use connection_groups::ConnectionGroups;
pub use connections::Connections;
pub use permissions::{Permissions, Subject};
pub use schema::Schema;
pub use sharing_profiles::SharingProfiles;
pub use user_groups::UserGroups;
pub use users::Users;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::GuacamoleClient;
use crate::error::Result;
use crate::patch::Patch;

/// A client bound to one data source
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    client: &'a GuacamoleClient,
    data_source: &'a str,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(client: &'a GuacamoleClient, data_source: &'a str) -> Self {
        Self { client, data_source }
    }

    pub fn data_source(&self) -> &'a str {
        self.data_source
    }

    pub fn users(&self) -> Users<'a> {
        Users::new(*self)
    }

    pub fn user_groups(&self) -> UserGroups<'a> {
        UserGroups::new(*self)
    }

    pub fn connections(&self) -> Connections<'a> {
        Connections::new(*self)
    }

    pub fn connection_groups(&self) -> ConnectionGroups<'a> {
        ConnectionGroups::new(*self)
    }

    pub fn sharing_profiles(&self) -> SharingProfiles<'a> {
        SharingProfiles::new(*self)
    }

    pub fn active_connections(&self) -> ActiveConnections<'a> {
        ActiveConnections::new(*self)
    }

    pub fn schema(&self) -> Schema<'a> {
        Schema::new(*self)
    }

    /// Permissions granted directly to a user
    pub fn user_permissions(&self, username: &'a str) -> Permissions<'a> {
        Permissions::new(*self, Subject::User(username))
    }

    /// Permissions granted to a user group
    pub fn user_group_permissions(&self, identifier: &'a str) -> Permissions<'a> {
        Permissions::new(*self, Subject::UserGroup(identifier))
    }

    fn segments<'p>(&self, path: &[&'p str]) -> Vec<&'p str>
    where
        'a: 'p,
    {
        let mut segments = Vec::with_capacity(path.len() + 3);
        segments.extend(["session", "data", self.data_source]);
        segments.extend_from_slice(path);
        segments
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &[&str]) -> Result<T> {
        self.client.get_json(&self.segments(path)).await
    }

    pub(crate) async fn post<B, T>(&self, path: &[&str], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.client.post_json(&self.segments(path), body).await
    }

    pub(crate) async fn put<B: Serialize + ?Sized>(&self, path: &[&str], body: &B) -> Result<()> {
        self.client.put_json(&self.segments(path), body).await
    }

    pub(crate) async fn patch(&self, path: &[&str], operations: &[Patch]) -> Result<()> {
        self.client.patch(&self.segments(path), operations).await
    }

    pub(crate) async fn delete(&self, path: &[&str]) -> Result<()> {
        self.client.delete(&self.segments(path)).await
    }
}

/// Shorthands for the selected data source
impl GuacamoleClient {
    pub fn users(&self) -> Users<'_> {
        self.default_scope().users()
    }

    pub fn user_groups(&self) -> UserGroups<'_> {
        self.default_scope().user_groups()
    }

    pub fn connections(&self) -> Connections<'_> {
        self.default_scope().connections()
    }

    pub fn connection_groups(&self) -> ConnectionGroups<'_> {
        self.default_scope().connection_groups()
    }

    pub fn sharing_profiles(&self) -> SharingProfiles<'_> {
        self.default_scope().sharing_profiles()
    }

    pub fn active_connections(&self) -> ActiveConnections<'_> {
        self.default_scope().active_connections()
    }

    pub fn schema(&self) -> Schema<'_> {
        self.default_scope().schema()
    }

    pub fn user_permissions<'a>(&'a self, username: &'a str) -> Permissions<'a> {
        self.default_scope().user_permissions(username)
    }

    pub fn user_group_permissions<'a>(&'a self, identifier: &'a str) -> Permissions<'a> {
        self.default_scope().user_group_permissions(identifier)
    }
}
