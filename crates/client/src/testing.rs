// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// In-process fake Guacamole server for tests
//
// Speaks just enough of the REST API to exercise the client: token
// issuing and expiry, one set of resource collections per data source with
// their relationship endpoints, and the known server quirks (userGroups
// listed as a map, ROOT missing from connectionGroups, 500 on group deletion
// with old MySQL auth).

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Path, Request, State};
use axum::http::{StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Extension, Form, Json, Router};
use chrono::Utc;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::client::{TOKEN_HEADER, TOKEN_PARAM};
use crate::config::{ClientConfig, Scheme};
use crate::patch::{Patch, PatchOperation};
use crate::totp::totp_at;
use crate::types::{
    ActiveConnection, Connection, ConnectionGroup, ConnectionGroupType, HistoryEntry, ObjectKind,
    ObjectPermission, Parameters, PermissionSet, SharingProfile, SystemPermission, User, UserGroup,
    ROOT_CONNECTION_GROUP,
};

pub(crate) const ADMIN: &str = "guacadmin";
pub(crate) const TOTP_SECRET: &str = "JBSWY3DPEHPK3PXP";
pub(crate) const PRIMARY_SOURCE: &str = "mysql";
pub(crate) const SHARED_SOURCE: &str = "mysql-shared";

/// Resources of one data source
type Shared = Arc<Mutex<FakeState>>;
type Params = HashMap<String, String>;

#[derive(Clone)]
struct Caller(String);

/// Tokens and login behaviour, shared by all data sources
#[derive(Default)]
struct Sessions {
    require_totp: bool,
    /// token -> username
    tokens: HashMap<String, String>,
    issued: u64,
    logins: usize,
    fail_logout: bool,
    next_quick_connect: u64,
    quick_connect_uris: Vec<String>,
}

impl Sessions {
    fn issue_token(&mut self, username: &str) -> String {
        self.issued += 1;
        let token = format!(
            "{:016X}{:016X}",
            self.issued,
            self.issued.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        );
        self.tokens.insert(token.clone(), username.to_string());
        token
    }
}

#[derive(Clone)]
struct AppState {
    sessions: Arc<Mutex<Sessions>>,
    sources: Arc<BTreeMap<String, Shared>>,
}

impl AppState {
    fn source(&self, name: &str) -> Option<Shared> {
        self.sources.get(name).cloned()
    }

    fn primary(&self) -> Shared {
        self.sources[PRIMARY_SOURCE].clone()
    }
}

#[derive(Default)]
struct FakeState {
    passwords: BTreeMap<String, String>,
    next_id: u64,
    users: BTreeMap<String, User>,
    user_groups: BTreeMap<String, UserGroup>,
    /// (group, member user)
    group_members: BTreeSet<(String, String)>,
    /// (child group, parent group)
    group_parents: BTreeSet<(String, String)>,
    /// ("users" | "userGroups", identifier)
    permissions: BTreeMap<(String, String), PermissionSet>,
    connections: BTreeMap<String, Connection>,
    connection_params: BTreeMap<String, Parameters>,
    connection_groups: BTreeMap<String, ConnectionGroup>,
    sharing_profiles: BTreeMap<String, SharingProfile>,
    profile_params: BTreeMap<String, Parameters>,
    active: BTreeMap<String, ActiveConnection>,
    buggy_group_delete: bool,
}

impl FakeState {
    fn seeded() -> Self {
        let mut state = Self {
            next_id: 1,
            ..Self::default()
        };
        state.passwords.insert(ADMIN.to_string(), ADMIN.to_string());
        state.users.insert(
            ADMIN.to_string(),
            User {
                username: ADMIN.to_string(),
                ..User::default()
            },
        );
        state.permissions.insert(
            ("users".to_string(), ADMIN.to_string()),
            PermissionSet {
                system_permissions: vec![SystemPermission::Administer],
                ..PermissionSet::default()
            },
        );
        state
    }

    fn next_identifier(&mut self) -> String {
        let id = self.next_id;
        self.next_id += 1;
        id.to_string()
    }

    fn permission_set(&mut self, collection: &str, identifier: &str) -> &mut PermissionSet {
        self.permissions
            .entry((collection.to_string(), identifier.to_string()))
            .or_default()
    }

    fn effective_permissions(&self, username: &str) -> PermissionSet {
        let key = ("users".to_string(), username.to_string());
        let mut effective = self.permissions.get(&key).cloned().unwrap_or_default();
        for (group, member) in &self.group_members {
            if member != username {
                continue;
            }
            let key = ("userGroups".to_string(), group.clone());
            if let Some(inherited) = self.permissions.get(&key) {
                merge_permissions(&mut effective, inherited);
            }
        }
        effective
    }

    fn root_group() -> ConnectionGroup {
        ConnectionGroup {
            identifier: Some(ROOT_CONNECTION_GROUP.to_string()),
            name: ROOT_CONNECTION_GROUP.to_string(),
            group_type: ConnectionGroupType::Organizational,
            ..ConnectionGroup::default()
        }
    }

    fn tree(&self, identifier: &str) -> Option<ConnectionGroup> {
        let mut group = if identifier == ROOT_CONNECTION_GROUP {
            Self::root_group()
        } else {
            self.connection_groups.get(identifier)?.clone()
        };

        let connections: Vec<Connection> = self
            .connections
            .values()
            .filter(|c| c.parent_identifier == identifier)
            .cloned()
            .collect();
        let groups: Vec<ConnectionGroup> = self
            .connection_groups
            .iter()
            .filter(|(_, g)| g.parent_identifier.as_deref() == Some(identifier))
            .filter_map(|(id, _)| self.tree(id))
            .collect();

        group.child_connections = (!connections.is_empty()).then_some(connections);
        group.child_connection_groups = (!groups.is_empty()).then_some(groups);
        Some(group)
    }
}

/// Handle to a running fake server; stops it on drop
pub(crate) struct FakeGuacamole {
    addr: SocketAddr,
    state: AppState,
    task: JoinHandle<()>,
}

impl Drop for FakeGuacamole {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl FakeGuacamole {
    pub(crate) async fn start() -> Self {
        let sources = [PRIMARY_SOURCE, SHARED_SOURCE]
            .into_iter()
            .map(|name| (name.to_string(), Arc::new(Mutex::new(FakeState::seeded()))))
            .collect();
        let state = AppState {
            sessions: Arc::new(Mutex::new(Sessions::default())),
            sources: Arc::new(sources),
        };
        let app = create_router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state, task }
    }

    /// Client configuration logging in as the seeded administrator
    pub(crate) fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new("127.0.0.1", ADMIN, ADMIN);
        config.protocol = Scheme::Http;
        config.port = self.addr.port();
        config.timeout_secs = 5;
        config
    }

    pub(crate) async fn require_totp(&self, required: bool) {
        self.state.sessions.lock().await.require_totp = required;
    }

    pub(crate) async fn login_count(&self) -> usize {
        self.state.sessions.lock().await.logins
    }

    /// Invalidate every issued token, as a session timeout would
    pub(crate) async fn expire_tokens(&self) {
        self.state.sessions.lock().await.tokens.clear();
    }

    /// Answer token deletion with 500
    pub(crate) async fn fail_logout(&self, fail: bool) {
        self.state.sessions.lock().await.fail_logout = fail;
    }

    /// Answer group deletion with 500, like MySQL auth before 1.6.1
    pub(crate) async fn buggy_group_delete(&self, buggy: bool) {
        self.state.primary().lock().await.buggy_group_delete = buggy;
    }

    pub(crate) async fn add_active_connection(&self, identifier: &str, connection: &str, username: &str) {
        self.state.primary().lock().await.active.insert(
            identifier.to_string(),
            ActiveConnection {
                identifier: identifier.to_string(),
                connection_identifier: Some(connection.to_string()),
                start_date: Some(Utc::now()),
                remote_host: Some("172.19.0.5".to_string()),
                username: Some(username.to_string()),
                connectable: true,
            },
        );
    }

    pub(crate) async fn quick_connect_uris(&self) -> Vec<String> {
        self.state.sessions.lock().await.quick_connect_uris.clone()
    }
}

fn create_router(state: AppState) -> Router {
    let session = Router::new()
        .route("/api/session/data/:ds/self", get(current_user))
        .route("/api/session/data/:ds/self/effectivePermissions", get(current_effective_permissions))
        .route("/api/session/data/:ds/users", get(list_users).post(create_user))
        .route(
            "/api/session/data/:ds/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route(
            "/api/session/data/:ds/users/:id/permissions",
            get(get_permissions).patch(patch_permissions),
        )
        .route("/api/session/data/:ds/users/:id/effectivePermissions", get(user_effective_permissions))
        .route(
            "/api/session/data/:ds/users/:id/userGroups",
            get(user_memberships).patch(patch_user_memberships),
        )
        .route("/api/session/data/:ds/users/:id/history", get(user_history))
        .route("/api/session/data/:ds/users/:id/password", put(change_password))
        .route("/api/session/data/:ds/userGroups", get(list_groups).post(create_group))
        .route(
            "/api/session/data/:ds/userGroups/:id",
            get(get_group).put(update_group).delete(delete_group),
        )
        .route(
            "/api/session/data/:ds/userGroups/:id/memberUsers",
            get(group_member_users).patch(patch_group_member_users),
        )
        .route(
            "/api/session/data/:ds/userGroups/:id/memberUserGroups",
            get(group_member_groups).patch(patch_group_member_groups),
        )
        .route(
            "/api/session/data/:ds/userGroups/:id/userGroups",
            get(group_parents).patch(patch_group_parents),
        )
        .route(
            "/api/session/data/:ds/userGroups/:id/permissions",
            get(get_permissions).patch(patch_permissions),
        )
        .route("/api/session/data/:ds/connections", get(list_connections).post(create_connection))
        .route(
            "/api/session/data/:ds/connections/:id",
            get(get_connection).put(update_connection).delete(delete_connection),
        )
        .route("/api/session/data/:ds/connections/:id/parameters", get(connection_parameters))
        .route("/api/session/data/:ds/connections/:id/history", get(connection_history))
        .route("/api/session/data/:ds/connections/:id/sharingProfiles", get(connection_profiles))
        .route(
            "/api/session/data/:ds/connectionGroups",
            get(list_connection_groups).post(create_connection_group),
        )
        .route(
            "/api/session/data/:ds/connectionGroups/:id",
            get(get_connection_group)
                .put(update_connection_group)
                .delete(delete_connection_group),
        )
        .route("/api/session/data/:ds/connectionGroups/:id/tree", get(connection_group_tree))
        .route("/api/session/data/:ds/sharingProfiles", get(list_profiles).post(create_profile))
        .route(
            "/api/session/data/:ds/sharingProfiles/:id",
            get(get_profile).put(update_profile).delete(delete_profile),
        )
        .route("/api/session/data/:ds/sharingProfiles/:id/parameters", get(profile_parameters))
        .route(
            "/api/session/data/:ds/activeConnections",
            get(list_active).patch(patch_active),
        )
        .route(
            "/api/session/data/:ds/activeConnections/:id",
            get(get_active).delete(delete_active),
        )
        .route(
            "/api/session/data/:ds/activeConnections/:id/sharingCredentials/:profile",
            get(sharing_credentials),
        )
        .route("/api/session/data/:ds/schema/:kind", get(schema))
        .route("/api/session/ext/quickconnect/create", post(quick_connect))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/api/tokens", post(create_token))
        .route("/api/tokens/:token", delete(delete_token))
        .merge(session)
        .with_state(state)
}

// ============================================================================
// Helpers
// ============================================================================

fn error(status: StatusCode, message: &str, kind: &str) -> Response {
    (status, Json(json!({ "message": message, "type": kind }))).into_response()
}

fn not_found(what: &str, identifier: &str) -> Response {
    error(
        StatusCode::NOT_FOUND,
        &format!("No such {} \"{}\"", what, identifier),
        "NOT_FOUND",
    )
}

fn bad_request(message: &str) -> Response {
    error(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
}

fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

fn param<'p>(params: &'p Params, name: &str) -> &'p str {
    params.get(name).map(String::as_str).unwrap_or_default()
}

/// Permission endpoints are shared by users and groups; tell them apart by path
fn permission_subject(uri: &Uri) -> &'static str {
    if uri.path().contains("/userGroups/") {
        "userGroups"
    } else {
        "users"
    }
}

fn merge_permissions(into: &mut PermissionSet, from: &PermissionSet) {
    for permission in &from.system_permissions {
        if !into.system_permissions.contains(permission) {
            into.system_permissions.push(*permission);
        }
    }
    for kind in OBJECT_KINDS {
        for (id, granted) in from.objects(kind) {
            let entry = objects_mut(into, kind).entry(id.clone()).or_default();
            for permission in granted {
                if !entry.contains(permission) {
                    entry.push(*permission);
                }
            }
        }
    }
}

const OBJECT_KINDS: [ObjectKind; 6] = [
    ObjectKind::Connection,
    ObjectKind::ConnectionGroup,
    ObjectKind::SharingProfile,
    ObjectKind::ActiveConnection,
    ObjectKind::User,
    ObjectKind::UserGroup,
];

fn objects_mut(set: &mut PermissionSet, kind: ObjectKind) -> &mut BTreeMap<String, Vec<ObjectPermission>> {
    match kind {
        ObjectKind::Connection => &mut set.connection_permissions,
        ObjectKind::ConnectionGroup => &mut set.connection_group_permissions,
        ObjectKind::SharingProfile => &mut set.sharing_profile_permissions,
        ObjectKind::ActiveConnection => &mut set.active_connection_permissions,
        ObjectKind::User => &mut set.user_permissions,
        ObjectKind::UserGroup => &mut set.user_group_permissions,
    }
}

fn apply_permission_patches(set: &mut PermissionSet, patches: &[Patch]) -> Result<(), Response> {
    for patch in patches {
        let value = patch.value.as_deref().unwrap_or_default();

        if patch.path == "/systemPermissions" {
            let permission: SystemPermission = value
                .parse()
                .map_err(|_| bad_request("Unknown system permission"))?;
            match patch.op {
                PatchOperation::Add if !set.system_permissions.contains(&permission) => {
                    set.system_permissions.push(permission)
                }
                PatchOperation::Add => {}
                PatchOperation::Remove => set.system_permissions.retain(|p| *p != permission),
            }
            continue;
        }

        let (prefix, identifier) = patch
            .path
            .rsplit_once('/')
            .ok_or_else(|| bad_request("Unsupported patch path"))?;
        let kind = OBJECT_KINDS
            .into_iter()
            .find(|k| k.permissions_path() == prefix)
            .ok_or_else(|| bad_request("Unsupported patch path"))?;
        let permission: ObjectPermission = value
            .parse()
            .map_err(|_| bad_request("Unknown object permission"))?;

        let objects = objects_mut(set, kind);
        match patch.op {
            PatchOperation::Add => {
                let granted = objects.entry(identifier.to_string()).or_default();
                if !granted.contains(&permission) {
                    granted.push(permission);
                }
            }
            PatchOperation::Remove => {
                if let Some(granted) = objects.get_mut(identifier) {
                    granted.retain(|p| *p != permission);
                    if granted.is_empty() {
                        objects.remove(identifier);
                    }
                }
            }
        }
    }
    Ok(())
}

/// Apply `/` membership patches; `pair` builds the stored tuple from a patch value
fn apply_member_patches(
    relation: &mut BTreeSet<(String, String)>,
    patches: &[Patch],
    pair: impl Fn(String) -> (String, String),
) -> Result<(), Response> {
    for patch in patches {
        if patch.path != "/" {
            return Err(bad_request("Membership patches must target \"/\""));
        }
        let Some(value) = patch.value.clone() else {
            return Err(bad_request("Membership patch without value"));
        };
        match patch.op {
            PatchOperation::Add => {
                relation.insert(pair(value));
            }
            PatchOperation::Remove => {
                relation.remove(&pair(value));
            }
        }
    }
    Ok(())
}

fn current_totp_codes(secret: &str) -> Vec<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    [now.saturating_sub(30), now, now + 30]
        .into_iter()
        .filter_map(|t| totp_at(secret, t).ok())
        .collect()
}

// ============================================================================
// Tokens
// ============================================================================

async fn require_token(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let from_header = request
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);
    let from_query = request.uri().query().and_then(|query| {
        query.split('&').find_map(|pair| {
            pair.strip_prefix(TOKEN_PARAM)
                .and_then(|rest| rest.strip_prefix('='))
                .map(str::to_string)
        })
    });

    let Some(token) = from_header.or(from_query) else {
        return error(StatusCode::UNAUTHORIZED, "Permission Denied.", "INVALID_CREDENTIALS");
    };
    let Some(username) = state.sessions.lock().await.tokens.get(&token).cloned() else {
        return error(StatusCode::UNAUTHORIZED, "Permission Denied.", "INVALID_CREDENTIALS");
    };

    if let Some(name) = data_source_of(request.uri()) {
        let Some(source) = state.source(&name) else {
            return not_found("data source", &name);
        };
        request.extensions_mut().insert(source);
    }

    request.extensions_mut().insert(Caller(username));
    next.run(request).await
}

/// `{ds}` of `/api/session/data/{ds}/...`
fn data_source_of(uri: &Uri) -> Option<String> {
    uri.path()
        .strip_prefix("/api/session/data/")?
        .split('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

async fn create_token(State(state): State<AppState>, Form(form): Form<Params>) -> Response {
    let mut s = state.sessions.lock().await;

    if let Some(data) = form.get("data") {
        if data.is_empty() {
            return error(StatusCode::FORBIDDEN, "Invalid login.", "INVALID_CREDENTIALS");
        }
        let token = s.issue_token("json-user");
        return Json(json!({
            "authToken": token,
            "username": "json-user",
            "dataSource": "json",
            "availableDataSources": ["json"],
        }))
        .into_response();
    }

    let username = param(&form, "username").to_string();
    let password = param(&form, "password");
    let known = state.primary().lock().await.passwords.get(&username).cloned();
    if known.as_deref() != Some(password) {
        return error(StatusCode::FORBIDDEN, "Invalid login.", "INVALID_CREDENTIALS");
    }

    if s.require_totp {
        let code = param(&form, "guac-totp");
        if !current_totp_codes(TOTP_SECRET).iter().any(|c| c == code) {
            return error(
                StatusCode::FORBIDDEN,
                "Verification code required.",
                "INSUFFICIENT_CREDENTIALS",
            );
        }
    }

    s.logins += 1;
    let token = s.issue_token(&username);
    Json(json!({
        "authToken": token,
        "username": username,
        "dataSource": PRIMARY_SOURCE,
        "availableDataSources": [PRIMARY_SOURCE, SHARED_SOURCE],
    }))
    .into_response()
}

async fn delete_token(State(state): State<AppState>, Path(token): Path<String>) -> Response {
    let mut s = state.sessions.lock().await;
    if s.fail_logout {
        return error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unexpected internal error.",
            "INTERNAL_ERROR",
        );
    }
    match s.tokens.remove(&token) {
        Some(_) => no_content(),
        None => not_found("token", "(redacted)"),
    }
}

// ============================================================================
// Users
// ============================================================================

async fn current_user(Extension(state): Extension<Shared>, Extension(caller): Extension<Caller>) -> Response {
    match state.lock().await.users.get(&caller.0) {
        Some(user) => Json(user.clone()).into_response(),
        None => not_found("user", &caller.0),
    }
}

async fn current_effective_permissions(
    Extension(state): Extension<Shared>,
    Extension(caller): Extension<Caller>,
) -> Response {
    Json(state.lock().await.effective_permissions(&caller.0)).into_response()
}

async fn list_users(Extension(state): Extension<Shared>) -> Response {
    Json(state.lock().await.users.clone()).into_response()
}

async fn create_user(Extension(state): Extension<Shared>, Json(mut user): Json<User>) -> Response {
    let mut s = state.lock().await;
    if user.username.is_empty() {
        return bad_request("The username must not be blank.");
    }
    if s.users.contains_key(&user.username) {
        return bad_request(&format!("User \"{}\" already exists.", user.username));
    }

    let password = user.password.take().unwrap_or_default();
    s.passwords.insert(user.username.clone(), password);
    s.users.insert(user.username.clone(), user.clone());
    Json(user).into_response()
}

async fn get_user(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    match state.lock().await.users.get(id) {
        Some(user) => Json(user.clone()).into_response(),
        None => not_found("user", id),
    }
}

async fn update_user(
    Extension(state): Extension<Shared>,
    Path(params): Path<Params>,
    Json(mut user): Json<User>,
) -> Response {
    let id = param(&params, "id");
    let mut s = state.lock().await;
    if !s.users.contains_key(id) {
        return not_found("user", id);
    }

    if let Some(password) = user.password.take() {
        s.passwords.insert(id.to_string(), password);
    }
    user.username = id.to_string();
    s.users.insert(id.to_string(), user);
    no_content()
}

async fn delete_user(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    let mut s = state.lock().await;
    if s.users.remove(id).is_none() {
        return not_found("user", id);
    }
    s.passwords.remove(id);
    s.group_members.retain(|(_, member)| member != id);
    s.permissions.remove(&("users".to_string(), id.to_string()));
    no_content()
}

async fn get_permissions(
    Extension(state): Extension<Shared>,
    Path(params): Path<Params>,
    uri: Uri,
) -> Response {
    let id = param(&params, "id");
    let collection = permission_subject(&uri);
    let is_group = collection == "userGroups";
    let mut s = state.lock().await;

    let exists = if is_group {
        s.user_groups.contains_key(id)
    } else {
        s.users.contains_key(id)
    };
    if !exists {
        return not_found(collection, id);
    }
    Json(s.permission_set(collection, id).clone()).into_response()
}

async fn patch_permissions(
    Extension(state): Extension<Shared>,
    Path(params): Path<Params>,
    uri: Uri,
    Json(patches): Json<Vec<Patch>>,
) -> Response {
    let id = param(&params, "id");
    let collection = permission_subject(&uri);
    let is_group = collection == "userGroups";
    let mut s = state.lock().await;

    let exists = if is_group {
        s.user_groups.contains_key(id)
    } else {
        s.users.contains_key(id)
    };
    if !exists {
        return not_found(collection, id);
    }
    match apply_permission_patches(s.permission_set(collection, id), &patches) {
        Ok(()) => no_content(),
        Err(response) => response,
    }
}

async fn user_effective_permissions(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    let s = state.lock().await;
    if !s.users.contains_key(id) {
        return not_found("user", id);
    }
    Json(s.effective_permissions(id)).into_response()
}

async fn user_memberships(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    let s = state.lock().await;
    if !s.users.contains_key(id) {
        return not_found("user", id);
    }
    let groups: Vec<&String> = s
        .group_members
        .iter()
        .filter(|(_, member)| member == id)
        .map(|(group, _)| group)
        .collect();
    Json(groups).into_response()
}

async fn patch_user_memberships(
    Extension(state): Extension<Shared>,
    Path(params): Path<Params>,
    Json(patches): Json<Vec<Patch>>,
) -> Response {
    let id = param(&params, "id").to_string();
    let mut s = state.lock().await;
    if !s.users.contains_key(&id) {
        return not_found("user", &id);
    }
    match apply_member_patches(&mut s.group_members, &patches, |group| (group, id.clone())) {
        Ok(()) => no_content(),
        Err(response) => response,
    }
}

async fn user_history(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    if !state.lock().await.users.contains_key(id) {
        return not_found("user", id);
    }
    Json(Vec::<HistoryEntry>::new()).into_response()
}

async fn change_password(
    Extension(state): Extension<Shared>,
    Path(params): Path<Params>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let id = param(&params, "id");
    let old = body["oldPassword"].as_str().unwrap_or_default();
    let new = body["newPassword"].as_str().unwrap_or_default();

    let mut s = state.lock().await;
    match s.passwords.get(id) {
        None => not_found("user", id),
        Some(current) if current != old => error(
            StatusCode::FORBIDDEN,
            "Permission denied.",
            "PERMISSION_DENIED",
        ),
        Some(_) => {
            s.passwords.insert(id.to_string(), new.to_string());
            no_content()
        }
    }
}

// ============================================================================
// User groups
// ============================================================================

async fn list_groups(Extension(state): Extension<Shared>) -> Response {
    // A map keyed by identifier, as the real server answers
    Json(state.lock().await.user_groups.clone()).into_response()
}

async fn create_group(Extension(state): Extension<Shared>, Json(group): Json<UserGroup>) -> Response {
    let mut s = state.lock().await;
    if group.identifier.is_empty() {
        return bad_request("The group identifier must not be blank.");
    }
    if s.user_groups.contains_key(&group.identifier) {
        return bad_request(&format!("Group \"{}\" already exists.", group.identifier));
    }
    s.user_groups.insert(group.identifier.clone(), group.clone());
    Json(group).into_response()
}

async fn get_group(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    match state.lock().await.user_groups.get(id) {
        Some(group) => Json(group.clone()).into_response(),
        None => not_found("user group", id),
    }
}

async fn update_group(
    Extension(state): Extension<Shared>,
    Path(params): Path<Params>,
    Json(mut group): Json<UserGroup>,
) -> Response {
    let id = param(&params, "id");
    let mut s = state.lock().await;
    if !s.user_groups.contains_key(id) {
        return not_found("user group", id);
    }
    group.identifier = id.to_string();
    s.user_groups.insert(id.to_string(), group);
    no_content()
}

async fn delete_group(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    let mut s = state.lock().await;
    if s.user_groups.remove(id).is_none() {
        return not_found("user group", id);
    }
    s.group_members.retain(|(group, _)| group != id);
    s.group_parents.retain(|(child, parent)| child != id && parent != id);

    if s.buggy_group_delete {
        return error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unexpected internal error.",
            "INTERNAL_ERROR",
        );
    }
    no_content()
}

async fn group_member_users(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    let s = state.lock().await;
    if !s.user_groups.contains_key(id) {
        return not_found("user group", id);
    }
    let members: Vec<&String> = s
        .group_members
        .iter()
        .filter(|(group, _)| group == id)
        .map(|(_, member)| member)
        .collect();
    Json(members).into_response()
}

async fn patch_group_member_users(
    Extension(state): Extension<Shared>,
    Path(params): Path<Params>,
    Json(patches): Json<Vec<Patch>>,
) -> Response {
    let id = param(&params, "id").to_string();
    let mut s = state.lock().await;
    if !s.user_groups.contains_key(&id) {
        return not_found("user group", &id);
    }
    match apply_member_patches(&mut s.group_members, &patches, |user| (id.clone(), user)) {
        Ok(()) => no_content(),
        Err(response) => response,
    }
}

async fn group_member_groups(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    let s = state.lock().await;
    if !s.user_groups.contains_key(id) {
        return not_found("user group", id);
    }
    let children: Vec<&String> = s
        .group_parents
        .iter()
        .filter(|(_, parent)| parent == id)
        .map(|(child, _)| child)
        .collect();
    Json(children).into_response()
}

async fn patch_group_member_groups(
    Extension(state): Extension<Shared>,
    Path(params): Path<Params>,
    Json(patches): Json<Vec<Patch>>,
) -> Response {
    let id = param(&params, "id").to_string();
    let mut s = state.lock().await;
    if !s.user_groups.contains_key(&id) {
        return not_found("user group", &id);
    }
    match apply_member_patches(&mut s.group_parents, &patches, |child| (child, id.clone())) {
        Ok(()) => no_content(),
        Err(response) => response,
    }
}

async fn group_parents(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    let s = state.lock().await;
    if !s.user_groups.contains_key(id) {
        return not_found("user group", id);
    }
    let parents: Vec<&String> = s
        .group_parents
        .iter()
        .filter(|(child, _)| child == id)
        .map(|(_, parent)| parent)
        .collect();
    Json(parents).into_response()
}

async fn patch_group_parents(
    Extension(state): Extension<Shared>,
    Path(params): Path<Params>,
    Json(patches): Json<Vec<Patch>>,
) -> Response {
    let id = param(&params, "id").to_string();
    let mut s = state.lock().await;
    if !s.user_groups.contains_key(&id) {
        return not_found("user group", &id);
    }
    match apply_member_patches(&mut s.group_parents, &patches, |parent| (id.clone(), parent)) {
        Ok(()) => no_content(),
        Err(response) => response,
    }
}

// ============================================================================
// Connections and connection groups
// ============================================================================

async fn list_connections(Extension(state): Extension<Shared>) -> Response {
    Json(state.lock().await.connections.clone()).into_response()
}

async fn create_connection(Extension(state): Extension<Shared>, Json(mut connection): Json<Connection>) -> Response {
    let mut s = state.lock().await;
    if connection.name.is_empty() {
        return bad_request("Connection names must not be blank.");
    }
    let id = s.next_identifier();
    connection.identifier = Some(id.clone());
    let parameters = std::mem::take(&mut connection.parameters);
    s.connection_params.insert(id.clone(), parameters);
    s.connections.insert(id, connection.clone());
    Json(connection).into_response()
}

async fn get_connection(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    match state.lock().await.connections.get(id) {
        Some(connection) => Json(connection.clone()).into_response(),
        None => not_found("connection", id),
    }
}

async fn update_connection(
    Extension(state): Extension<Shared>,
    Path(params): Path<Params>,
    Json(mut connection): Json<Connection>,
) -> Response {
    let id = param(&params, "id");
    let mut s = state.lock().await;
    if !s.connections.contains_key(id) {
        return not_found("connection", id);
    }
    connection.identifier = Some(id.to_string());
    let parameters = std::mem::take(&mut connection.parameters);
    s.connection_params.insert(id.to_string(), parameters);
    s.connections.insert(id.to_string(), connection);
    no_content()
}

async fn delete_connection(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    let mut s = state.lock().await;
    if s.connections.remove(id).is_none() {
        return not_found("connection", id);
    }
    s.connection_params.remove(id);
    no_content()
}

async fn connection_parameters(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    match state.lock().await.connection_params.get(id) {
        Some(parameters) => Json(parameters.clone()).into_response(),
        None => not_found("connection", id),
    }
}

async fn connection_history(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    if !state.lock().await.connections.contains_key(id) {
        return not_found("connection", id);
    }
    Json(Vec::<HistoryEntry>::new()).into_response()
}

async fn connection_profiles(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    let s = state.lock().await;
    if !s.connections.contains_key(id) {
        return not_found("connection", id);
    }
    let profiles: BTreeMap<&String, &SharingProfile> = s
        .sharing_profiles
        .iter()
        .filter(|(_, p)| p.primary_connection_identifier == id)
        .collect();
    Json(profiles).into_response()
}

async fn list_connection_groups(Extension(state): Extension<Shared>) -> Response {
    // ROOT is never part of the listing
    Json(state.lock().await.connection_groups.clone()).into_response()
}

async fn create_connection_group(Extension(state): Extension<Shared>, Json(mut group): Json<ConnectionGroup>) -> Response {
    let mut s = state.lock().await;
    if group.name.is_empty() {
        return bad_request("Connection group names must not be blank.");
    }
    let id = s.next_identifier();
    group.identifier = Some(id.clone());
    s.connection_groups.insert(id, group.clone());
    Json(group).into_response()
}

async fn get_connection_group(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    if id == ROOT_CONNECTION_GROUP {
        return Json(FakeState::root_group()).into_response();
    }
    match state.lock().await.connection_groups.get(id) {
        Some(group) => Json(group.clone()).into_response(),
        None => not_found("connection group", id),
    }
}

async fn update_connection_group(
    Extension(state): Extension<Shared>,
    Path(params): Path<Params>,
    Json(mut group): Json<ConnectionGroup>,
) -> Response {
    let id = param(&params, "id");
    let mut s = state.lock().await;
    if !s.connection_groups.contains_key(id) {
        return not_found("connection group", id);
    }
    group.identifier = Some(id.to_string());
    s.connection_groups.insert(id.to_string(), group);
    no_content()
}

async fn delete_connection_group(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    match state.lock().await.connection_groups.remove(id) {
        Some(_) => no_content(),
        None => not_found("connection group", id),
    }
}

async fn connection_group_tree(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    match state.lock().await.tree(id) {
        Some(tree) => Json(tree).into_response(),
        None => not_found("connection group", id),
    }
}

// ============================================================================
// Sharing profiles and active connections
// ============================================================================

async fn list_profiles(Extension(state): Extension<Shared>) -> Response {
    Json(state.lock().await.sharing_profiles.clone()).into_response()
}

async fn create_profile(Extension(state): Extension<Shared>, Json(mut profile): Json<SharingProfile>) -> Response {
    let mut s = state.lock().await;
    if !s.connections.contains_key(&profile.primary_connection_identifier) {
        return bad_request("The primary connection does not exist.");
    }
    let id = s.next_identifier();
    profile.identifier = Some(id.clone());
    let parameters = std::mem::take(&mut profile.parameters);
    s.profile_params.insert(id.clone(), parameters);
    s.sharing_profiles.insert(id, profile.clone());
    Json(profile).into_response()
}

async fn get_profile(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    match state.lock().await.sharing_profiles.get(id) {
        Some(profile) => Json(profile.clone()).into_response(),
        None => not_found("sharing profile", id),
    }
}

async fn update_profile(
    Extension(state): Extension<Shared>,
    Path(params): Path<Params>,
    Json(mut profile): Json<SharingProfile>,
) -> Response {
    let id = param(&params, "id");
    let mut s = state.lock().await;
    if !s.sharing_profiles.contains_key(id) {
        return not_found("sharing profile", id);
    }
    profile.identifier = Some(id.to_string());
    let parameters = std::mem::take(&mut profile.parameters);
    s.profile_params.insert(id.to_string(), parameters);
    s.sharing_profiles.insert(id.to_string(), profile);
    no_content()
}

async fn delete_profile(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    let mut s = state.lock().await;
    if s.sharing_profiles.remove(id).is_none() {
        return not_found("sharing profile", id);
    }
    s.profile_params.remove(id);
    no_content()
}

async fn profile_parameters(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    match state.lock().await.profile_params.get(id) {
        Some(parameters) => Json(parameters.clone()).into_response(),
        None => not_found("sharing profile", id),
    }
}

async fn list_active(Extension(state): Extension<Shared>) -> Response {
    Json(state.lock().await.active.clone()).into_response()
}

async fn patch_active(Extension(state): Extension<Shared>, Json(patches): Json<Vec<Patch>>) -> Response {
    let mut s = state.lock().await;
    for patch in &patches {
        match (patch.op, patch.path.strip_prefix('/')) {
            (PatchOperation::Remove, Some(id)) => {
                s.active.remove(id);
            }
            _ => return bad_request("Only removal of active connections is supported."),
        }
    }
    no_content()
}

async fn get_active(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    match state.lock().await.active.get(id) {
        Some(active) => Json(active.clone()).into_response(),
        None => not_found("active connection", id),
    }
}

async fn delete_active(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    match state.lock().await.active.remove(id) {
        Some(_) => no_content(),
        None => not_found("active connection", id),
    }
}

async fn sharing_credentials(Extension(state): Extension<Shared>, Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    let profile = param(&params, "profile");
    if !state.lock().await.active.contains_key(id) {
        return not_found("active connection", id);
    }
    Json(json!({
        "expected": [],
        "values": { "key": format!("share-{}-{}", id, profile) },
    }))
    .into_response()
}

// ============================================================================
// Schema and extensions
// ============================================================================

async fn schema(Path(params): Path<Params>) -> Response {
    let kind = param(&params, "kind");
    match kind {
        "protocols" => Json(json!({
            "ssh": {
                "name": "ssh",
                "connectionForms": [{"name": "network", "fields": [
                    {"name": "hostname", "type": "TEXT"},
                    {"name": "port", "type": "NUMERIC"}
                ]}],
                "sharingProfileForms": [{"name": "display", "fields": [
                    {"name": "read-only", "type": "BOOLEAN", "options": ["true"]}
                ]}]
            },
            "rdp": {
                "name": "rdp",
                "connectionForms": [{"name": "network", "fields": [
                    {"name": "hostname", "type": "TEXT"},
                    {"name": "port", "type": "NUMERIC"}
                ]}, {"name": "authentication", "fields": [
                    {"name": "security", "type": "ENUM", "options": ["", "any", "nla", "rdp", "tls", "vmconnect"]}
                ]}],
                "sharingProfileForms": []
            }
        }))
        .into_response(),
        "userAttributes" => Json(json!([{"name": "restrictions", "fields": [
            {"name": "disabled", "type": "BOOLEAN", "options": ["true"]},
            {"name": "expired", "type": "BOOLEAN", "options": ["true"]},
            {"name": "timezone", "type": "TIMEZONE"}
        ]}]))
        .into_response(),
        "userGroupAttributes" | "connectionAttributes" | "connectionGroupAttributes"
        | "sharingProfileAttributes" => Json(json!([{"name": "concurrency", "fields": [
            {"name": "max-connections", "type": "NUMERIC"}
        ]}]))
        .into_response(),
        other => not_found("schema", other),
    }
}

async fn quick_connect(State(state): State<AppState>, Form(form): Form<Params>) -> Response {
    let uri = param(&form, "uri");
    if !uri.contains("://") {
        return bad_request("Invalid URI.");
    }
    let mut s = state.sessions.lock().await;
    s.quick_connect_uris.push(uri.to_string());
    s.next_quick_connect += 1;
    Json(json!({ "identifier": format!("qc-{}", s.next_quick_connect) })).into_response()
}
