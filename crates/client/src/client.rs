// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// Guacamole REST Client - Session Module
// Authenticated session shared by every resource sub-client

use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

use crate::api::Scope;
use crate::config::{ClientConfig, Scheme, TokenTransport};
use crate::error::{ApiError, Error, Result};
use crate::patch::Patch;
use crate::tls::{create_pinned_tls_config, create_unverified_tls_config, create_verified_tls_config};
use crate::totp::totp_now;
use crate::types::{AuthToken, QuickConnectResponse};

/// Header carrying the session token
pub const TOKEN_HEADER: &str = "Guacamole-Token";

/// Query parameter carrying the session token
pub const TOKEN_PARAM: &str = "token";

/// Create an HTTP client configured for the Guacamole server
///
/// HTTPS certificate handling, in order of precedence:
/// 1. `tls_cert_fingerprint` set: only that certificate is trusted
/// 2. `ssl_verify = false`: any certificate is accepted
/// 3. otherwise: verified against the webpki root store
pub fn create_http_client(config: &ClientConfig) -> Result<Client> {
    let mut client_builder = Client::builder().timeout(config.timeout());

    if config.protocol == Scheme::Https {
        let tls_config = if !config.tls_cert_fingerprint.is_empty() {
            create_pinned_tls_config(&config.tls_cert_fingerprint)?
        } else if !config.ssl_verify {
            warn!("TLS certificate verification is disabled for {}", config.hostname);
            create_unverified_tls_config()?
        } else {
            create_verified_tls_config()?
        };
        client_builder = client_builder.use_preconfigured_tls(tls_config);
    }

    Ok(client_builder.build()?)
}

/// Attach the session token to a request
pub fn add_auth_token(request: RequestBuilder, transport: TokenTransport, token: &str) -> RequestBuilder {
    match transport {
        TokenTransport::Header => request.header(TOKEN_HEADER, token),
        TokenTransport::QueryParam => request.query(&[(TOKEN_PARAM, token)]),
    }
}

/// Request body, kept owned so a request can be replayed after re-login
#[derive(Debug)]
enum Payload {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

struct Inner {
    http: Client,
    config: ClientConfig,
    api_base: Url,
    username: String,
    data_source: String,
    available_data_sources: Vec<String>,
    /// None once logged out
    token: RwLock<Option<Zeroizing<String>>>,
    /// Serializes re-authentication
    refresh: Mutex<()>,
}

/// Authenticated Guacamole client
///
/// Cheap to clone; clones share one session token.
#[derive(Clone)]
pub struct GuacamoleClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for GuacamoleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuacamoleClient")
            .field("api_base", &self.inner.api_base.as_str())
            .field("username", &self.inner.username)
            .field("data_source", &self.inner.data_source)
            .finish_non_exhaustive()
    }
}

impl GuacamoleClient {
    /// Validate the configuration, log in and select the data source
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let http = create_http_client(&config)?;
        let api_base = Url::parse(&config.api_base_url())
            .map_err(|e| Error::Config(format!("invalid server address: {}", e)))?;

        let auth = login(&http, &api_base, &config).await?;

        let data_source = match &config.default_datasource {
            Some(wanted) if auth.available_data_sources.iter().any(|ds| ds == wanted) => wanted.clone(),
            Some(wanted) => {
                return Err(Error::Config(format!(
                    "data source '{}' is not available; valid values: {}",
                    wanted,
                    auth.available_data_sources.join(", ")
                )));
            }
            None => auth.data_source.clone(),
        };

        info!(
            "Logged in to {} as {} (data source {})",
            config.hostname, auth.username, data_source
        );

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                api_base,
                username: auth.username,
                data_source,
                available_data_sources: auth.available_data_sources,
                token: RwLock::new(Some(Zeroizing::new(auth.auth_token))),
                refresh: Mutex::new(()),
                config,
            }),
        })
    }

    /// Username reported by the server at login
    pub fn username(&self) -> &str {
        &self.inner.username
    }

    /// Data source the unscoped sub-clients operate on
    pub fn data_source(&self) -> &str {
        &self.inner.data_source
    }

    pub fn available_data_sources(&self) -> &[String] {
        &self.inner.available_data_sources
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub async fn is_logged_in(&self) -> bool {
        self.inner.token.read().await.is_some()
    }

    /// Sub-clients bound to another data source
    pub fn scope<'a>(&'a self, data_source: &'a str) -> Scope<'a> {
        Scope::new(self, data_source)
    }

    /// Sub-clients bound to the selected data source
    pub fn default_scope(&self) -> Scope<'_> {
        Scope::new(self, &self.inner.data_source)
    }

    /// Invalidate the session token on the server
    ///
    /// Further requests fail with an authentication error.
    ///
    /// The token is only forgotten once the server has deleted it; on
    /// failure the session stays usable and logout can be retried.
    pub async fn logout(&self) -> Result<()> {
        let _guard = self.inner.refresh.lock().await;

        let Some(token) = self.inner.token.read().await.clone() else {
            debug!("Logout requested but the session is already closed");
            return Ok(());
        };

        let url = self.url(&["tokens", token.as_str()])?;
        let request = add_auth_token(
            self.inner.http.delete(url),
            self.inner.config.token_transport,
            &token,
        );
        let response = request.send().await?;
        check_response(&Method::DELETE, "/tokens/{token}", response).await?;

        *self.inner.token.write().await = None;
        info!("Logged out {}", self.inner.username);
        Ok(())
    }

    /// Exchange a guacamole-auth-json `data` blob for a token
    ///
    /// The returned token belongs to the user described by the blob; this
    /// client's own session is untouched.
    pub async fn authenticate_json(&self, data: &str) -> Result<AuthToken> {
        let url = self.url(&["tokens"])?;
        request_token(&self.inner.http, url, &[("data", data)]).await
    }

    /// Create an ad-hoc connection from a URI such as `ssh://user@host:22`
    ///
    /// Returns the identifier of the connection created by the quickconnect
    /// extension.
    pub async fn quick_connect(&self, uri: &str) -> Result<String> {
        let response = self
            .execute(
                Method::POST,
                &["session", "ext", "quickconnect", "create"],
                Payload::Form(vec![("uri".to_string(), uri.to_string())]),
            )
            .await?;
        let created: QuickConnectResponse = response.json().await?;
        Ok(created.identifier)
    }

    // ------------------------------------------------------------------------
    // Request plumbing used by the sub-clients
    // ------------------------------------------------------------------------

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let response = self.execute(Method::GET, segments, Payload::Empty).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = Payload::Json(serde_json::to_value(body)?);
        let response = self.execute(Method::POST, segments, payload).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn put_json<B: Serialize + ?Sized>(&self, segments: &[&str], body: &B) -> Result<()> {
        let payload = Payload::Json(serde_json::to_value(body)?);
        self.execute(Method::PUT, segments, payload).await?;
        Ok(())
    }

    pub(crate) async fn patch(&self, segments: &[&str], operations: &[Patch]) -> Result<()> {
        let payload = Payload::Json(serde_json::to_value(operations)?);
        self.execute(Method::PATCH, segments, payload).await?;
        Ok(())
    }

    pub(crate) async fn delete(&self, segments: &[&str]) -> Result<()> {
        self.execute(Method::DELETE, segments, Payload::Empty).await?;
        Ok(())
    }

    /// API URL from path segments; each segment is percent-encoded
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.inner.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("'{}' cannot carry a path", self.inner.api_base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn current_token(&self) -> Result<Zeroizing<String>> {
        self.inner
            .token
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::Authentication("session has been logged out".to_string()))
    }

    /// Log in again unless another caller already replaced `stale`
    async fn refresh_token(&self, stale: &str) -> Result<()> {
        let _guard = self.inner.refresh.lock().await;

        match self.inner.token.read().await.as_ref() {
            None => return Err(Error::Authentication("session has been logged out".to_string())),
            Some(current) if current.as_str() != stale => {
                debug!("Session token already refreshed by another request");
                return Ok(());
            }
            Some(_) => {}
        }

        warn!("Session token rejected, re-authenticating as {}", self.inner.config.username);
        let auth = login(&self.inner.http, &self.inner.api_base, &self.inner.config).await?;
        *self.inner.token.write().await = Some(Zeroizing::new(auth.auth_token));
        Ok(())
    }

    fn build_request(&self, method: Method, url: Url, payload: &Payload, token: &str) -> RequestBuilder {
        let request = add_auth_token(
            self.inner.http.request(method, url),
            self.inner.config.token_transport,
            token,
        );
        match payload {
            Payload::Empty => request,
            Payload::Json(body) => request.json(body),
            Payload::Form(fields) => request.form(fields),
        }
    }

    /// Send a request; on 401 re-authenticate once and replay it
    async fn execute(&self, method: Method, segments: &[&str], payload: Payload) -> Result<Response> {
        let url = self.url(segments)?;
        let path = url.path().to_string();
        debug!("{} {}", method, path);

        let token = self.current_token().await?;
        let response = self
            .build_request(method.clone(), url.clone(), &payload, &token)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.inner.config.reauthenticate {
            self.refresh_token(&token).await?;
            let token = self.current_token().await?;
            debug!("{} {} (replay)", method, path);
            let response = self.build_request(method.clone(), url, &payload, &token).send().await?;
            return check_response(&method, &path, response).await;
        }

        check_response(&method, &path, response).await
    }
}

/// Turn a non-2xx response into a typed API error
async fn check_response(method: &Method, path: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let api_error = ApiError::from_response(status, body);
    if status == StatusCode::NOT_FOUND {
        debug!("{} {}: {}", method, path, api_error);
    } else {
        error!("{} {}: {}", method, path, api_error);
    }
    Err(api_error.into())
}

async fn login(http: &Client, api_base: &Url, config: &ClientConfig) -> Result<AuthToken> {
    let mut url = api_base.clone();
    url.path_segments_mut()
        .map_err(|_| Error::Config(format!("'{}' cannot carry a path", api_base)))?
        .pop_if_empty()
        .push("tokens");

    let totp = match &config.totp_secret {
        Some(secret) => Some(Zeroizing::new(totp_now(secret)?)),
        None => None,
    };

    let mut form = vec![
        ("username", config.username.as_str()),
        ("password", config.password.as_str()),
    ];
    if let Some(code) = &totp {
        form.push(("guac-totp", code.as_str()));
    }

    request_token(http, url, &form).await
}

async fn request_token(http: &Client, url: Url, form: &[(&str, &str)]) -> Result<AuthToken> {
    debug!("POST {}", url.path());
    let response = http.post(url).form(form).send().await?;
    let status = response.status();
    let body = Zeroizing::new(response.text().await?);

    if !status.is_success() {
        let api_error = ApiError::from_response(status, body.to_string());
        return match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Authentication(
                api_error.message.unwrap_or_else(|| status.to_string()),
            )),
            _ => Err(api_error.into()),
        };
    }

    let auth: AuthToken = serde_json::from_str(&body)
        .map_err(|e| Error::Authentication(format!("incomplete token response: {}", e)))?;
    if auth.auth_token.is_empty() {
        return Err(Error::Authentication("server returned an empty token".to_string()));
    }
    Ok(auth)
}
