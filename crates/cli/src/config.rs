// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// guacapy CLI - Config Module
// Loads the server profile and resolves the password

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Password;
use serde::{Deserialize, Serialize};
use tracing::debug;

use guacapy::{ClientConfig, Scheme};

const KEYRING_SERVICE: &str = "guacapy";

/// CLI configuration (wrapper around ClientConfig with file I/O)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(flatten)]
    pub client: ClientConfig,
}

/// Values given on the command line or through the environment
#[derive(Debug, Default)]
pub struct Overrides {
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<Scheme>,
    pub base_path: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub totp_secret: Option<String>,
    pub data_source: Option<String>,
    pub insecure: bool,
    pub fingerprint: Option<String>,
}

impl CliConfig {
    /// Load CLI configuration from `path`, or the default location
    ///
    /// A missing default file yields the default configuration; a missing
    /// explicitly named file is an error.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(p) => (PathBuf::from(shellexpand::tilde(p).to_string()), true),
            None => (Self::config_path()?, false),
        };

        if !config_path.exists() {
            if explicit {
                anyhow::bail!("Configuration file {} does not exist", config_path.display());
            }
            debug!("No configuration at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(config)
    }

    /// Get the path to the CLI configuration file
    pub fn config_path() -> Result<PathBuf> {
        Ok(ClientConfig::default_path()?)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        let client = &mut self.client;
        if let Some(hostname) = overrides.hostname {
            client.hostname = hostname;
        }
        if let Some(port) = overrides.port {
            client.port = port;
        }
        if let Some(protocol) = overrides.protocol {
            client.protocol = protocol;
        }
        if let Some(base_path) = overrides.base_path {
            client.base_path = base_path;
        }
        if let Some(username) = overrides.username {
            client.username = username;
        }
        if let Some(password) = overrides.password {
            client.password = password;
        }
        if let Some(secret) = overrides.totp_secret {
            client.totp_secret = Some(secret);
        }
        if let Some(data_source) = overrides.data_source {
            client.default_datasource = Some(data_source);
        }
        if overrides.insecure {
            client.ssl_verify = false;
        }
        if let Some(fingerprint) = overrides.fingerprint {
            client.tls_cert_fingerprint = fingerprint;
        }
    }

    fn keyring_account(&self) -> String {
        format!("{}@{}", self.client.username, self.client.hostname)
    }

    /// Fill in the password from the keychain or an interactive prompt
    ///
    /// Returns true when the password was typed in by the user.
    pub fn resolve_password(&mut self) -> Result<bool> {
        if !self.client.password.is_empty() {
            return Ok(false);
        }

        if let Some(stored) = self.password_from_keychain() {
            debug!("Using password from system keychain for {}", self.keyring_account());
            self.client.password = stored;
            return Ok(false);
        }

        self.client.password = Password::new()
            .with_prompt(format!("Password for {}", self.keyring_account()))
            .interact()
            .context("Failed to read password")?;
        Ok(true)
    }

    fn password_from_keychain(&self) -> Option<String> {
        if self.client.username.is_empty() || self.client.hostname.is_empty() {
            return None;
        }
        keyring::Entry::new(KEYRING_SERVICE, &self.keyring_account())
            .and_then(|entry| entry.get_password())
            .ok()
    }

    pub fn store_password_in_keychain(&self) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, &self.keyring_account())
            .context("Failed to create keychain entry")?;
        entry
            .set_password(&self.client.password)
            .context("Failed to store password in keychain")?;
        eprintln!("{}", "  ✓ Password stored in system keychain".green());
        Ok(())
    }
}

pub fn parse_scheme(value: &str) -> Result<Scheme, String> {
    match value.to_ascii_lowercase().as_str() {
        "http" => Ok(Scheme::Http),
        "https" => Ok(Scheme::Https),
        other => Err(format!("expected 'http' or 'https', got '{}'", other)),
    }
}
