// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// Configuration structures for the Guacamole REST client

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::network::{format_host_port, is_loopback_address};

/// URL scheme used to reach the Guacamole web application
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Default for Scheme {
    fn default() -> Self {
        Scheme::Https
    }
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// How the session token is attached to API requests
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TokenTransport {
    /// `Guacamole-Token` request header
    Header,
    /// `?token=` query parameter, for servers older than 1.4
    QueryParam,
}

impl Default for TokenTransport {
    fn default() -> Self {
        TokenTransport::Header
    }
}

/// Connection and credential settings for a Guacamole server
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Scheme (http or https)
    #[serde(default)]
    pub protocol: Scheme,

    /// Server hostname or IP (e.g., "guacamole.example.com")
    #[serde(default)]
    pub hostname: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Path the web application is deployed under (e.g., "/guacamole/")
    #[serde(default = "default_base_path")]
    pub base_path: String,

    #[serde(default)]
    pub username: String,

    /// Never written back out
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Base32 TOTP secret, for servers with the TOTP extension enabled
    #[serde(default, skip_serializing)]
    pub totp_secret: Option<String>,

    /// Data source to scope sub-clients to; the server's primary one if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_datasource: Option<String>,

    /// Verify the server certificate against the webpki roots
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,

    /// SHA-256 certificate fingerprint ("AA:BB:..."); pins the certificate when set
    #[serde(default)]
    pub tls_cert_fingerprint: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub token_transport: TokenTransport,

    /// Log in again once when a request comes back 401
    #[serde(default = "default_reauthenticate")]
    pub reauthenticate: bool,
}

fn default_port() -> u16 {
    443
}

fn default_base_path() -> String {
    "/".to_string()
}

fn default_ssl_verify() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_reauthenticate() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol: Scheme::default(),
            hostname: String::new(),
            port: default_port(),
            base_path: default_base_path(),
            username: String::new(),
            password: String::new(),
            totp_secret: None,
            default_datasource: None,
            ssl_verify: default_ssl_verify(),
            tls_cert_fingerprint: String::new(),
            timeout_secs: default_timeout_secs(),
            token_transport: TokenTransport::default(),
            reauthenticate: default_reauthenticate(),
        }
    }
}

impl Drop for ClientConfig {
    fn drop(&mut self) {
        self.password.zeroize();
        if let Some(secret) = self.totp_secret.as_mut() {
            secret.zeroize();
        }
    }
}

impl ClientConfig {
    pub fn new(hostname: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        // Drop impl rules out struct update syntax
        let mut config = Self::default();
        config.hostname = hostname.into();
        config.username = username.into();
        config.password = password.into();
        config
    }

    /// Load a configuration file (TOML)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Default location of the configuration file
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("guacapy").join("cli.toml"))
    }

    /// Root of the REST API, e.g. `https://guacamole.example.com:443/guacamole/api`
    pub fn api_base_url(&self) -> String {
        let mut base_path = self.base_path.trim().to_string();
        if !base_path.starts_with('/') {
            base_path.insert(0, '/');
        }
        if !base_path.ends_with('/') {
            base_path.push('/');
        }

        format!(
            "{}://{}{}api",
            self.protocol.as_str(),
            format_host_port(&self.hostname, self.port),
            base_path
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check the configuration is complete enough to log in
    pub fn validate(&self) -> Result<()> {
        if self.hostname.trim().is_empty() {
            return Err(Error::Config("hostname cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Config("port must be greater than 0".to_string()));
        }
        if self.username.is_empty() {
            return Err(Error::Config("username cannot be empty".to_string()));
        }
        if !self.base_path.trim().starts_with('/') {
            return Err(Error::Config(format!(
                "base_path must start with '/', got '{}'",
                self.base_path
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be greater than 0".to_string()));
        }

        if self.protocol == Scheme::Http && !is_loopback_address(&self.hostname) {
            warn!(
                "Credentials for {} will be sent over plain HTTP to a non-loopback host",
                self.hostname
            );
        }

        Ok(())
    }
}
